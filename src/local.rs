//! [`NativeClient`] over a directory of the local filesystem.
//!
//! Remote paths are resolved under `root`, so `/data/part-0` lives at `<root>/data/part-0`.
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::native::{
    set_last_error, transfer_len, NativeClient, Offset, OpenFlags, OpenMode, RawFile, Size,
};
use crate::session::{SessionTable, TrackedStream};

struct LocalSession {
    path: String,
    mode: OpenMode,
    stream: Mutex<TrackedStream<File>>,
    // Shares the open file but not the cursor lock, for positional reads.
    #[cfg(unix)]
    positional: File,
}

pub struct LocalClient {
    root: PathBuf,
    sessions: SessionTable<LocalSession>,
}

fn fail(path: &str, err: io::Error) -> i64 {
    set_last_error(format!("{}: {}", path, err));
    -1
}

fn not_open_for(path: &str, what: &str) -> i64 {
    set_last_error(format!("{} is not open for {}", path, what));
    -1
}

impl LocalSession {
    #[cfg(unix)]
    fn positional_read(&self, position: u64, buf: &mut [u8]) -> io::Result<usize> {
        use std::os::unix::fs::FileExt;
        self.positional.read_at(buf, position)
    }

    #[cfg(not(unix))]
    fn positional_read(&self, position: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.lock().pread(position, buf)
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.stream.lock().get_ref().metadata()?.len())
    }
}

impl LocalClient {
    pub fn new<P: Into<PathBuf>>(root: P) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        log::debug!("local filesystem rooted at {}", root.display());
        Ok(LocalClient {
            root,
            sessions: SessionTable::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn open_local(&self, path: &str, mode: OpenMode) -> io::Result<LocalSession> {
        let local = self.resolve(path);
        let mut file = match mode {
            OpenMode::Read => File::open(local)?,
            OpenMode::Write => {
                if let Some(parent) = local.parent() {
                    fs::create_dir_all(parent)?;
                }
                OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(local)?
            }
            OpenMode::Append => OpenOptions::new().append(true).open(local)?,
        };
        let pos = match mode {
            OpenMode::Append => file.seek(SeekFrom::End(0))?,
            _ => 0,
        };
        Ok(LocalSession {
            path: path.to_owned(),
            mode,
            #[cfg(unix)]
            positional: file.try_clone()?,
            stream: Mutex::new(TrackedStream::new(file, pos)),
        })
    }

    fn with_session<F>(&self, file: RawFile, f: F) -> i64
    where
        F: FnOnce(&LocalSession) -> io::Result<i64>,
    {
        match self.sessions.get(file) {
            Some(session) => match f(&*session) {
                Ok(v) => v,
                Err(e) => fail(&session.path, e),
            },
            None => -1,
        }
    }

    fn with_reader<F>(&self, file: RawFile, f: F) -> i64
    where
        F: FnOnce(&LocalSession) -> io::Result<i64>,
    {
        match self.sessions.get(file) {
            Some(session) if session.mode.is_write() => not_open_for(&session.path, "reading"),
            Some(session) => match f(&*session) {
                Ok(v) => v,
                Err(e) => fail(&session.path, e),
            },
            None => -1,
        }
    }
}

impl NativeClient for LocalClient {
    fn open_file(&self, path: &str, flags: &OpenFlags) -> Option<RawFile> {
        if flags.mode.is_write() && !self.sessions.acquire_lease(path) {
            return None;
        }
        match self.open_local(path, flags.mode) {
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

    fn close_file(&self, file: RawFile) -> i32 {
        let session = match self.sessions.remove(file) {
            Some(session) => session,
            None => return -1,
        };
        if !session.mode.is_write() {
            return 0;
        }
        self.sessions.release_lease(&session.path);
        let synced = session.stream.lock().get_ref().sync_all();
        match synced {
            Ok(()) => 0,
            Err(e) => fail(&session.path, e) as i32,
        }
    }

    fn read(&self, file: RawFile, buf: &mut [u8]) -> Size {
        let n = transfer_len(buf.len());
        self.with_reader(file, |s| Ok(s.stream.lock().read(&mut buf[..n])? as i64)) as Size
    }

    fn pread(&self, file: RawFile, position: Offset, buf: &mut [u8]) -> Size {
        if position < 0 {
            set_last_error(format!("negative position {}", position));
            return -1;
        }
        let n = transfer_len(buf.len());
        self.with_reader(file, |s| {
            Ok(s.positional_read(position as u64, &mut buf[..n])? as i64)
        }) as Size
    }

    fn write(&self, file: RawFile, buf: &[u8]) -> Size {
        let n = transfer_len(buf.len());
        match self.sessions.get(file) {
            Some(s) if s.mode.is_read() => not_open_for(&s.path, "writing") as Size,
            Some(s) => {
                let written = s.stream.lock().write(&buf[..n]);
                match written {
                    Ok(written) => written as Size,
                    Err(e) => fail(&s.path, e) as Size,
                }
            }
            None => -1,
        }
    }

    fn seek(&self, file: RawFile, position: Offset) -> i32 {
        self.with_reader(file, |s| {
            let mut stream = s.stream.lock();
            let len = stream.get_ref().metadata()?.len() as i64;
            if position < 0 || position > len {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("position {} outside of file (length {})", position, len),
                ));
            }
            stream.seek(position as u64)?;
            Ok(0)
        }) as i32
    }

    fn tell(&self, file: RawFile) -> Offset {
        self.with_session(file, |s| Ok(s.stream.lock().position() as i64))
    }

    fn available(&self, file: RawFile) -> i32 {
        self.with_reader(file, |s| {
            let len = s.len()?;
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
