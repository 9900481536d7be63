//! Handles to open remote files.
use std::convert::TryFrom;
use std::fmt;
use std::io::{self, SeekFrom};
use std::sync::Arc;

use crate::error::{Error, FileOp, Result};
use crate::native::{transfer_len, NativeClient, Offset, OpenMode, RawFile};
use crate::span::{ReadableByteSpan, WritableByteSpan};

/// Turns a native result into a count, or into a `Failure` for `op` if it is negative.
pub(crate) fn check_result(
    code: i64,
    op: FileOp,
    path: &str,
    client: &dyn NativeClient,
) -> Result<u64> {
    if code < 0 {
        let detail = client
            .last_error()
            .unwrap_or_else(|| format!("native call returned {}", code));
        log::debug!("{} failed on {}: {}", op, path, detail);
        return Err(Error::Failure {
            op,
            path: path.to_owned(),
            detail,
        });
    }
    Ok(code as u64)
}

/// One open file session on a distributed filesystem.
///
/// Cursor-relative operations (`seek`, `tell`, `read`, `write`, ...) take `&mut self`.
/// Positional reads take `&self` and may run concurrently from several threads.
/// The session is released by [`close`](RemoteFileHandle::close) or, failing that, on drop.
pub struct RemoteFileHandle {
    fs: Arc<dyn NativeClient>,
    raw: RawFile,
    path: String,
    mode: OpenMode,
    is_open: bool,
}

impl RemoteFileHandle {
    pub(crate) fn new(
        fs: Arc<dyn NativeClient>,
        raw: RawFile,
        path: String,
        mode: OpenMode,
    ) -> Self {
        RemoteFileHandle {
            fs,
            raw,
            path,
            mode,
            is_open: true,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    fn raw(&self) -> Result<RawFile> {
        if self.is_open {
            Ok(self.raw)
        } else {
            Err(Error::Closed {
                path: self.path.clone(),
            })
        }
    }

    fn check(&self, code: i64, op: FileOp) -> Result<u64> {
        check_result(code, op, &self.path, self.fs.as_ref())
    }

    fn offset(&self, pos: u64, op: FileOp) -> Result<Offset> {
        Offset::try_from(pos).map_err(|_| Error::Failure {
            op,
            path: self.path.clone(),
            detail: format!("offset {} is out of range", pos),
        })
    }

    pub fn seek(&mut self, desired_pos: u64) -> Result<()> {
        let raw = self.raw()?;
        let pos = self.offset(desired_pos, FileOp::Seek)?;
        log::trace!("seek {} to {}", self.path, pos);
        self.check(self.fs.seek(raw, pos) as i64, FileOp::Seek)?;
        Ok(())
    }

    pub fn tell(&mut self) -> Result<u64> {
        let raw = self.raw()?;
        self.check(self.fs.tell(raw), FileOp::Tell)
    }

    /// Reads up to `length` bytes at the cursor. A short or empty result is not an error.
    pub fn read(&mut self, length: usize) -> Result<Vec<u8>> {
        let raw = self.raw()?;
        let mut buf = vec![0u8; transfer_len(length)];
        let n = self.check(self.fs.read(raw, &mut buf) as i64, FileOp::Read)?;
        buf.truncate(n as usize);
        Ok(buf)
    }

    /// Reads at the cursor straight into `buf`, returning how many bytes landed there.
    pub fn read_chunk<B>(&mut self, buf: &mut B) -> Result<usize>
    where
        B: WritableByteSpan + ?Sized,
    {
        let raw = self.raw()?;
        let bytes = writable(buf, FileOp::Read, &self.path)?;
        let n = self.check(self.fs.read(raw, bytes) as i64, FileOp::Read)?;
        Ok(n as usize)
    }

    /// Reads up to `length` bytes at `position` without touching the cursor.
    pub fn pread(&self, position: u64, length: usize) -> Result<Vec<u8>> {
        let raw = self.raw()?;
        let pos = self.offset(position, FileOp::Read)?;
        let mut buf = vec![0u8; transfer_len(length)];
        let n = self.check(self.fs.pread(raw, pos, &mut buf) as i64, FileOp::Read)?;
        buf.truncate(n as usize);
        Ok(buf)
    }

    pub fn pread_chunk<B>(&self, position: u64, buf: &mut B) -> Result<usize>
    where
        B: WritableByteSpan + ?Sized,
    {
        let raw = self.raw()?;
        let pos = self.offset(position, FileOp::Read)?;
        let bytes = writable(buf, FileOp::Read, &self.path)?;
        let n = self.check(self.fs.pread(raw, pos, bytes) as i64, FileOp::Read)?;
        Ok(n as usize)
    }

    /// Writes `data` at the cursor. May accept fewer bytes than given; callers loop if needed.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let raw = self.raw()?;
        let n = self.check(self.fs.write(raw, data) as i64, FileOp::Write)?;
        Ok(n as usize)
    }

    pub fn write_chunk<B>(&mut self, buf: &B) -> Result<usize>
    where
        B: ReadableByteSpan + ?Sized,
    {
        let raw = self.raw()?;
        let bytes = buf.readable_bytes().ok_or_else(|| Error::Buffer {
            op: FileOp::Write,
            path: self.path.clone(),
        })?;
        let n = self.check(self.fs.write(raw, bytes) as i64, FileOp::Write)?;
        Ok(n as usize)
    }

    /// Bytes that can be read without blocking.
    pub fn available(&mut self) -> Result<usize> {
        let raw = self.raw()?;
        let n = self.check(self.fs.available(raw) as i64, FileOp::Available)?;
        Ok(n as usize)
    }

    pub fn flush(&mut self) -> Result<()> {
        let raw = self.raw()?;
        self.check(self.fs.flush(raw) as i64, FileOp::Flush)?;
        Ok(())
    }

    /// Releases the session. Closing a closed handle does nothing.
    ///
    /// A failed close is reported once and still leaves the handle closed.
    pub fn close(&mut self) -> Result<()> {
        if !self.is_open {
            return Ok(());
        }
        self.is_open = false;
        log::debug!("closing {}", self.path);
        self.check(self.fs.close_file(self.raw) as i64, FileOp::Close)?;
        Ok(())
    }
}

fn writable<'a, B>(buf: &'a mut B, op: FileOp, path: &str) -> Result<&'a mut [u8]>
where
    B: WritableByteSpan + ?Sized,
{
    buf.writable_bytes().ok_or_else(|| Error::Buffer {
        op,
        path: path.to_owned(),
    })
}

impl Drop for RemoteFileHandle {
    fn drop(&mut self) {
        if self.is_open {
            if let Err(e) = self.close() {
                log::warn!("implicit close of {} failed: {}", self.path, e);
            }
        }
    }
}

impl fmt::Debug for RemoteFileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteFileHandle")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("is_open", &self.is_open)
            .finish()
    }
}

impl io::Read for RemoteFileHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_chunk(buf)?)
    }
}

impl io::Write for RemoteFileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(RemoteFileHandle::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(RemoteFileHandle::flush(self)?)
    }
}

impl io::Seek for RemoteFileHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::Current(delta) => {
                let current = self.tell()?;
                offset_by(current, delta)
            }
            // The end is the cursor plus whatever is still readable.
            SeekFrom::End(delta) => {
                let current = self.tell()?;
                let end = current + self.available()? as u64;
                offset_by(end, delta)
            }
        };
        let target = target.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid seek to a negative offset on {}", self.path),
            )
        })?;
        RemoteFileHandle::seek(self, target)?;
        Ok(target)
    }
}

fn offset_by(base: u64, delta: i64) -> Option<u64> {
    if delta >= 0 {
        base.checked_add(delta as u64)
    } else {
        base.checked_sub(delta.unsigned_abs())
    }
}
