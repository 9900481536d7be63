//! [`NativeClient`] backed by a real HDFS cluster through `hdrs`.
use std::io;

use hdrs::Client;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::native::{
    set_last_error, transfer_len, NativeClient, Offset, OpenFlags, OpenMode, RawFile, Size,
};
use crate::session::{SessionTable, TrackedStream};

struct HdfsSession {
    path: String,
    mode: OpenMode,
    // Output streams cannot seek, so the position is tracked rather than queried.
    stream: Mutex<TrackedStream<hdrs::File>>,
}

pub struct HdfsClient {
    nn: String,
    fs: Client,
    sessions: SessionTable<HdfsSession>,
}

fn fail(path: &str, err: io::Error) -> i64 {
    set_last_error(format!("{}: {}", path, err));
    -1
}

impl HdfsClient {
    pub fn connect(namenode: &str, port: u16) -> Result<Self> {
        let nn = format!("{}:{}", namenode, port);
        let fs = match Client::connect(nn.as_str()) {
            Ok(fs) => fs,
            Err(e) => {
                log::error!("failed to connect to {}: {}", nn, e);
                return Err(Error::Connect(nn));
            }
        };
        log::info!("connected to hdfs at {}", nn);
        Ok(HdfsClient {
            nn,
            fs,
            sessions: SessionTable::new(),
        })
    }

    pub fn namenode(&self) -> &str {
        &self.nn
    }

    /// Number of sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn open_hdfs(&self, path: &str, mode: OpenMode) -> io::Result<HdfsSession> {
        let mut oo = self.fs.open_file();
        let (file, pos) = match mode {
            OpenMode::Read => (oo.read(true).open(path)?, 0),
            OpenMode::Write => (oo.write(true).create(true).open(path)?, 0),
            OpenMode::Append => {
                let len = self.len_of(path)?;
                (oo.append(true).open(path)?, len)
            }
        };
        Ok(HdfsSession {
            path: path.to_owned(),
            mode,
            stream: Mutex::new(TrackedStream::new(file, pos)),
        })
    }

    fn len_of(&self, path: &str) -> io::Result<u64> {
        Ok(self.fs.metadata(path)?.len())
    }

    fn with_session<F>(&self, file: RawFile, f: F) -> i64
    where
        F: FnOnce(&HdfsSession) -> io::Result<i64>,
    {
        match self.sessions.get(file) {
            Some(session) => match f(&*session) {
                Ok(v) => v,
                Err(e) => fail(&session.path, e),
            },
            None => -1,
        }
    }
}

fn require(session: &HdfsSession, readable: bool) -> io::Result<()> {
    if session.mode.is_read() == readable {
        Ok(())
    } else {
        let what = if readable { "reading" } else { "writing" };
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("not open for {}", what),
        ))
    }
}

impl NativeClient for HdfsClient {
    fn open_file(&self, path: &str, flags: &OpenFlags) -> Option<RawFile> {
        if flags.buffer_size != 0 || flags.replication != 0 || flags.block_size != 0 {
            log::debug!(
                "hdfs open of {} uses cluster defaults for buffer size, replication and block size",
                path
            );
        }
        if flags.mode.is_write() && !self.sessions.acquire_lease(path) {
            return None;
        }
        match self.open_hdfs(path, flags.mode) {
            Ok(session) => Some(self.sessions.insert(session)),
            Err(e) => {
                if flags.mode.is_write() {
                    self.sessions.release_lease(path);
                }
                fail(path, e);
                None
            }
        }
    }

    // hdrs closes the stream in `Drop` and discards the hdfsCloseFile result, so only a
    // failed flush of a write session is reported here.
    fn close_file(&self, file: RawFile) -> i32 {
        let session = match self.sessions.remove(file) {
            Some(session) => session,
            None => return -1,
        };
        if !session.mode.is_write() {
            return 0;
        }
        self.sessions.release_lease(&session.path);
        let flushed = session.stream.lock().flush();
        match flushed {
            Ok(()) => 0,
            Err(e) => fail(&session.path, e) as i32,
        }
    }

    fn read(&self, file: RawFile, buf: &mut [u8]) -> Size {
        let n = transfer_len(buf.len());
        self.with_session(file, |s| {
            require(s, true)?;
            Ok(s.stream.lock().read(&mut buf[..n])? as i64)
        }) as Size
    }

    // Emulated with seek/read/seek-back under the session lock.
    fn pread(&self, file: RawFile, position: Offset, buf: &mut [u8]) -> Size {
        if position < 0 {
            set_last_error(format!("negative position {}", position));
            return -1;
        }
        let n = transfer_len(buf.len());
        self.with_session(file, |s| {
            require(s, true)?;
            if position as u64 >= self.len_of(&s.path)? {
                return Ok(0);
            }
            Ok(s.stream.lock().pread(position as u64, &mut buf[..n])? as i64)
        }) as Size
    }

    fn write(&self, file: RawFile, buf: &[u8]) -> Size {
        let n = transfer_len(buf.len());
        self.with_session(file, |s| {
            require(s, false)?;
            Ok(s.stream.lock().write(&buf[..n])? as i64)
        }) as Size
    }

    fn seek(&self, file: RawFile, position: Offset) -> i32 {
        self.with_session(file, |s| {
            require(s, true)?;
            s.stream.lock().seek(position as u64)?;
            Ok(0)
        }) as i32
    }

    fn tell(&self, file: RawFile) -> Offset {
        self.with_session(file, |s| Ok(s.stream.lock().position() as i64))
    }

    fn available(&self, file: RawFile) -> i32 {
        self.with_session(file, |s| {
            require(s, true)?;
            let len = self.len_of(&s.path)?;
            let remaining = s.stream.lock().remaining(len);
            Ok(remaining.min(i32::max_value() as u64) as i64)
        }) as i32
    }

    fn flush(&self, file: RawFile) -> i32 {
        self.with_session(file, |s| {
            s.stream.lock().flush()?;
            Ok(0)
        }) as i32
    }
}
