//! Seekable handles to files on a distributed filesystem.
//!
//! A [`FileSystem`] wraps a [`NativeClient`] connection and opens files on it. Each open file
//! is a [`RemoteFileHandle`] offering cursor reads and writes, positional reads, zero-copy
//! variants over caller buffers, and an idempotent close that also runs on drop.
//!
//! ```
//! use std::sync::Arc;
//! use hdfile::{FileSystem, MemoryClient};
//!
//! # fn main() -> hdfile::Result<()> {
//! let fs = FileSystem::new(Arc::new(MemoryClient::new()));
//! let mut f = fs.create("/tmp/t1")?;
//! assert_eq!(f.write(b"hello world")?, 11);
//! f.close()?;
//!
//! let f = fs.open("/tmp/t1")?;
//! assert_eq!(f.pread(6, 5)?, b"world".to_vec());
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
mod file;
mod fs;
#[cfg(feature = "hdrs_valid")]
mod hdfs;
mod local;
pub mod logging;
mod memory;
pub mod native;
mod session;
pub mod span;

pub use config::Configuration;
pub use error::{Error, FileOp, Result};
pub use file::RemoteFileHandle;
pub use fs::FileSystem;
#[cfg(feature = "hdrs_valid")]
pub use hdfs::HdfsClient;
pub use local::LocalClient;
pub use memory::MemoryClient;
pub use native::{NativeClient, OpenFlags, OpenMode};
pub use span::{ReadOnly, ReadableByteSpan, WritableByteSpan};
