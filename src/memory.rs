//! In-process filesystem implementing [`NativeClient`].
//!
//! Follows HDFS file semantics closely enough to stand in for a cluster: read sessions are
//! seekable, write sessions are append-only streams, and a path has at most one writer.
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::FileOp;
use crate::native::{
    set_last_error, transfer_len, NativeClient, Offset, OpenFlags, OpenMode, RawFile, Size,
};

type FileData = Arc<RwLock<Vec<u8>>>;

struct Session {
    path: String,
    mode: OpenMode,
    pos: u64,
    data: FileData,
}

#[derive(Default)]
pub struct MemoryClient {
    files: RwLock<HashMap<String, FileData>>,
    sessions: Mutex<HashMap<u64, Session>>,
    next_id: AtomicU64,
    faults: Mutex<HashSet<FileOp>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces `path` with `contents`.
    pub fn insert<P: Into<String>>(&self, path: P, contents: Vec<u8>) {
        self.files
            .write()
            .insert(path.into(), Arc::new(RwLock::new(contents)));
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files.read().get(path).map(|data| data.read().clone())
    }

    pub fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Makes the next native call of kind `op` fail with -1.
    pub fn inject_failure(&self, op: FileOp) {
        self.faults.lock().insert(op);
    }

    fn injected(&self, op: FileOp) -> bool {
        if self.faults.lock().remove(&op) {
            set_last_error(format!("injected {} failure", op));
            true
        } else {
            false
        }
    }

    fn with_session<R, F>(&self, file: RawFile, f: F) -> Option<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(&file.0) {
            Some(session) => Some(f(session)),
            None => {
                set_last_error(format!("unknown file session {}", file.0));
                None
            }
        }
    }
}

fn copy_out(data: &[u8], pos: u64, buf: &mut [u8]) -> usize {
    let len = data.len() as u64;
    if pos >= len {
        return 0;
    }
    let start = pos as usize;
    let n = transfer_len(buf.len()).min(data.len() - start);
    buf[..n].copy_from_slice(&data[start..start + n]);
    n
}

impl NativeClient for MemoryClient {
    fn open_file(&self, path: &str, flags: &OpenFlags) -> Option<RawFile> {
        let mut sessions = self.sessions.lock();
        let has_writer = sessions
            .values()
            .any(|s| s.path == path && s.mode.is_write());
        if flags.mode.is_write() && has_writer {
            set_last_error(format!("{} is already open for writing", path));
            return None;
        }
        let data = match flags.mode {
            OpenMode::Read | OpenMode::Append => match self.files.read().get(path) {
                Some(data) => data.clone(),
                None => {
                    set_last_error(format!("no such file: {}", path));
                    return None;
                }
            },
            OpenMode::Write => {
                let mut files = self.files.write();
                let data = files
                    .entry(path.to_owned())
                    .or_insert_with(|| Arc::new(RwLock::new(Vec::new())))
                    .clone();
                data.write().clear();
                data
            }
        };
        let pos = match flags.mode {
            OpenMode::Append => data.read().len() as u64,
            _ => 0,
        };
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        sessions.insert(
            id,
            Session {
                path: path.to_owned(),
                mode: flags.mode,
                pos,
                data,
            },
        );
        Some(RawFile(id))
    }

    fn close_file(&self, file: RawFile) -> i32 {
        // The session is released even when the close is reported as failed.
        let removed = self.sessions.lock().remove(&file.0);
        if removed.is_none() {
            set_last_error(format!("unknown file session {}", file.0));
            return -1;
        }
        if self.injected(FileOp::Close) {
            return -1;
        }
        0
    }

    fn read(&self, file: RawFile, buf: &mut [u8]) -> Size {
        if self.injected(FileOp::Read) {
            return -1;
        }
        self.with_session(file, |s| {
            if s.mode.is_write() {
                set_last_error(format!("{} is not open for reading", s.path));
                return -1;
            }
            let n = copy_out(&s.data.read(), s.pos, buf);
            s.pos += n as u64;
            n as Size
        })
        .unwrap_or(-1)
    }

    fn pread(&self, file: RawFile, position: Offset, buf: &mut [u8]) -> Size {
        if self.injected(FileOp::Read) {
            return -1;
        }
        if position < 0 {
            set_last_error(format!("negative position {}", position));
            return -1;
        }
        // Only the session lookup is serialized; the copy runs under a shared lock.
        let data = self.with_session(file, |s| {
            if s.mode.is_write() {
                set_last_error(format!("{} is not open for reading", s.path));
                None
            } else {
                Some(s.data.clone())
            }
        });
        match data {
            Some(Some(data)) => copy_out(&data.read(), position as u64, buf) as Size,
            _ => -1,
        }
    }

    fn write(&self, file: RawFile, buf: &[u8]) -> Size {
        if self.injected(FileOp::Write) {
            return -1;
        }
        self.with_session(file, |s| {
            if s.mode.is_read() {
                set_last_error(format!("{} is not open for writing", s.path));
                return -1;
            }
            let n = transfer_len(buf.len());
            let mut data = s.data.write();
            let start = s.pos as usize;
            if data.len() < start + n {
                data.resize(start + n, 0);
            }
            data[start..start + n].copy_from_slice(&buf[..n]);
            s.pos += n as u64;
            n as Size
        })
        .unwrap_or(-1)
    }

    fn seek(&self, file: RawFile, position: Offset) -> i32 {
        if self.injected(FileOp::Seek) {
            return -1;
        }
        self.with_session(file, |s| {
            if s.mode.is_write() {
                set_last_error(format!("cannot seek a write stream on {}", s.path));
                return -1;
            }
            let len = s.data.read().len() as i64;
            if position < 0 || position > len {
                set_last_error(format!(
                    "position {} outside of {} (length {})",
                    position, s.path, len
                ));
                return -1;
            }
            s.pos = position as u64;
            0
        })
        .unwrap_or(-1)
    }

    fn tell(&self, file: RawFile) -> Offset {
        if self.injected(FileOp::Tell) {
            return -1;
        }
        self.with_session(file, |s| s.pos as Offset).unwrap_or(-1)
    }

    fn available(&self, file: RawFile) -> i32 {
        if self.injected(FileOp::Available) {
            return -1;
        }
        self.with_session(file, |s| {
            if s.mode.is_write() {
                set_last_error(format!("{} is not open for reading", s.path));
                return -1;
            }
            let len = s.data.read().len() as u64;
            len.saturating_sub(s.pos).min(i32::max_value() as u64) as i32
        })
        .unwrap_or(-1)
    }

    fn flush(&self, file: RawFile) -> i32 {
        if self.injected(FileOp::Flush) {
            return -1;
        }
        self.with_session(file, |_| 0).unwrap_or(-1)
    }
}
