//! The connection-scoped primitives a native distributed-filesystem client exposes.
//!
//! Every call takes the connection (`&self`) and a [`RawFile`] session token, and reports
//! failure by returning a negative number. A backend that fails records a message through
//! [`set_last_error`] first, so the caller can pick it up with [`NativeClient::last_error`].
use std::cell::RefCell;

use serde_derive::{Deserialize, Serialize};

/// Byte offset as understood by the native client.
pub type Offset = i64;
/// Transfer size as understood by the native client.
pub type Size = i32;

/// Largest transfer a single native call accepts.
pub const MAX_TRANSFER: usize = Size::max_value() as usize;

/// Opaque token for one open file session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawFile(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenMode {
    Read,
    Write,
    Append,
}

impl OpenMode {
    pub fn is_read(self) -> bool {
        self == OpenMode::Read
    }

    pub fn is_write(self) -> bool {
        !self.is_read()
    }
}

/// Flags passed to [`NativeClient::open_file`]. Zero means "use the client default",
/// as with `hdfsOpenFile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    pub mode: OpenMode,
    pub buffer_size: i32,
    pub replication: i16,
    pub block_size: i64,
}

impl OpenFlags {
    pub fn new(mode: OpenMode) -> Self {
        OpenFlags {
            mode,
            buffer_size: 0,
            replication: 0,
            block_size: 0,
        }
    }
}

pub trait NativeClient: Send + Sync {
    fn open_file(&self, path: &str, flags: &OpenFlags) -> Option<RawFile>;

    fn close_file(&self, file: RawFile) -> i32;

    fn read(&self, file: RawFile, buf: &mut [u8]) -> Size;

    fn pread(&self, file: RawFile, position: Offset, buf: &mut [u8]) -> Size;

    fn write(&self, file: RawFile, buf: &[u8]) -> Size;

    fn seek(&self, file: RawFile, position: Offset) -> i32;

    fn tell(&self, file: RawFile) -> Offset;

    fn available(&self, file: RawFile) -> i32;

    fn flush(&self, file: RawFile) -> i32;

    /// Message describing the last failed call on this thread, if any. Reading it clears it.
    fn last_error(&self) -> Option<String> {
        take_last_error()
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = RefCell::new(None);
}

pub fn set_last_error<S: Into<String>>(msg: S) {
    let msg = msg.into();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(msg));
}

pub fn take_last_error() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow_mut().take())
}

/// Clamps a buffer length to what one native call can transfer.
pub(crate) fn transfer_len(len: usize) -> usize {
    len.min(MAX_TRANSFER)
}
