//! Bookkeeping shared by the stream-backed clients.
//!
//! A [`SessionTable`] maps [`RawFile`] tokens to sessions. Its lock only covers the lookup;
//! all I/O happens on the returned `Arc` so handles never wait on each other.
//! A [`TrackedStream`] remembers its own cursor, because output streams cannot be asked.
use std::collections::{HashMap, HashSet};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::native::{set_last_error, RawFile};

pub(crate) struct SessionTable<S> {
    sessions: Mutex<HashMap<u64, Arc<S>>>,
    writers: Mutex<HashSet<String>>,
    next_id: AtomicU64,
}

impl<S> SessionTable<S> {
    pub fn new() -> Self {
        SessionTable {
            sessions: Mutex::new(HashMap::new()),
            writers: Mutex::new(HashSet::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn insert(&self, session: S) -> RawFile {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sessions.lock().insert(id, Arc::new(session));
        RawFile(id)
    }

    pub fn get(&self, file: RawFile) -> Option<Arc<S>> {
        let session = self.sessions.lock().get(&file.0).cloned();
        if session.is_none() {
            set_last_error(format!("unknown file session {}", file.0));
        }
        session
    }

    pub fn remove(&self, file: RawFile) -> Option<Arc<S>> {
        let session = self.sessions.lock().remove(&file.0);
        if session.is_none() {
            set_last_error(format!("unknown file session {}", file.0));
        }
        session
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Takes the single-writer lease on `path`. Fails if another writer holds it.
    pub fn acquire_lease(&self, path: &str) -> bool {
        if self.writers.lock().insert(path.to_owned()) {
            true
        } else {
            set_last_error(format!("{} is already open for writing", path));
            false
        }
    }

    pub fn release_lease(&self, path: &str) {
        self.writers.lock().remove(path);
    }
}

/// A stream plus the cursor position it was last left at.
pub(crate) struct TrackedStream<F> {
    inner: F,
    pos: u64,
}

impl<F: Read + Write + Seek> TrackedStream<F> {
    pub fn new(inner: F, pos: u64) -> Self {
        TrackedStream { inner, pos }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn get_ref(&self) -> &F {
        &self.inner
    }

    pub fn remaining(&self, len: u64) -> u64 {
        len.saturating_sub(self.pos)
    }

    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    pub fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    pub fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    /// Reads at `position` and puts the cursor back where it was.
    #[cfg_attr(all(unix, not(feature = "hdrs_valid")), allow(dead_code))]
    pub fn pread(&mut self, position: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.seek(SeekFrom::Start(position))?;
        let res = self.inner.read(buf);
        self.inner.seek(SeekFrom::Start(self.pos))?;
        res
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::mpsc;
    use std::time::Duration;

    // Behaves like an HDFS output stream: writable, but any seek or read is refused.
    struct OutputStream(Vec<u8>);

    impl Read for OutputStream {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "not an input stream"))
        }
    }

    impl Write for OutputStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for OutputStream {
        fn seek(&mut self, _: SeekFrom) -> io::Result<u64> {
            Err(io::Error::new(io::ErrorKind::Other, "cannot seek an output stream"))
        }
    }

    #[test]
    fn output_stream_position_needs_no_seek() {
        let mut stream = TrackedStream::new(OutputStream(b"first;".to_vec()), 6);
        assert_eq!(stream.position(), 6);
        assert_eq!(stream.write(b"second;").unwrap(), 7);
        assert_eq!(stream.position(), 13);
        assert!(stream.seek(0).is_err());
        assert_eq!(stream.position(), 13);
    }

    #[test]
    fn pread_restores_cursor() {
        let mut stream = TrackedStream::new(Cursor::new(b"0123456789".to_vec()), 0);
        stream.seek(4).unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(stream.pread(7, &mut buf).unwrap(), 3);
        assert_eq!(&buf, b"789");
        assert_eq!(stream.position(), 4);
        assert_eq!(stream.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"456");
        assert_eq!(stream.remaining(10), 3);
    }

    #[test]
    fn lookup_does_not_hold_the_table() {
        let table = Arc::new(SessionTable::new());
        let busy = table.insert(Mutex::new(0u32));
        let idle = table.insert(Mutex::new(0u32));

        let session = table.get(busy).unwrap();
        let _io = session.lock();

        let (tx, rx) = mpsc::channel();
        let other = table.clone();
        std::thread::spawn(move || {
            let session = other.get(idle).unwrap();
            *session.lock() += 1;
            tx.send(()).unwrap();
        });
        rx.recv_timeout(Duration::from_secs(5))
            .expect("second session blocked behind the first");
    }

    #[test]
    fn lease_is_exclusive_until_released() {
        let table: SessionTable<()> = SessionTable::new();
        assert!(table.acquire_lease("/w"));
        assert!(!table.acquire_lease("/w"));
        table.release_lease("/w");
        assert!(table.acquire_lease("/w"));
    }

    #[test]
    fn removed_sessions_are_unknown() {
        let table = SessionTable::new();
        let raw = table.insert("s");
        assert_eq!(table.len(), 1);
        assert!(table.remove(raw).is_some());
        assert!(table.get(raw).is_none());
        assert!(table.remove(raw).is_none());
        assert_eq!(table.len(), 0);
    }
}
