//! Caller-supplied buffers for the zero-copy read/write paths.
//!
//! A span hands out its memory only if it is one contiguous region with the right access.
//! Returning `None` makes the file operation fail with [`Error::Buffer`](crate::Error::Buffer)
//! before anything reaches the native client.
use std::collections::VecDeque;

/// A buffer the file may write received bytes into.
pub trait WritableByteSpan {
    fn writable_bytes(&mut self) -> Option<&mut [u8]>;
}

/// A buffer the file may read bytes to send from.
pub trait ReadableByteSpan {
    fn readable_bytes(&self) -> Option<&[u8]>;
}

impl WritableByteSpan for [u8] {
    fn writable_bytes(&mut self) -> Option<&mut [u8]> {
        Some(self)
    }
}

impl ReadableByteSpan for [u8] {
    fn readable_bytes(&self) -> Option<&[u8]> {
        Some(self)
    }
}

impl WritableByteSpan for Vec<u8> {
    fn writable_bytes(&mut self) -> Option<&mut [u8]> {
        Some(self.as_mut_slice())
    }
}

impl ReadableByteSpan for Vec<u8> {
    fn readable_bytes(&self) -> Option<&[u8]> {
        Some(self.as_slice())
    }
}

impl<const N: usize> WritableByteSpan for [u8; N] {
    fn writable_bytes(&mut self) -> Option<&mut [u8]> {
        Some(&mut self[..])
    }
}

impl<const N: usize> ReadableByteSpan for [u8; N] {
    fn readable_bytes(&self) -> Option<&[u8]> {
        Some(&self[..])
    }
}

// A ring buffer is only usable while its contents do not wrap around.
impl WritableByteSpan for VecDeque<u8> {
    fn writable_bytes(&mut self) -> Option<&mut [u8]> {
        let (front, back) = self.as_mut_slices();
        if back.is_empty() {
            Some(front)
        } else {
            None
        }
    }
}

impl ReadableByteSpan for VecDeque<u8> {
    fn readable_bytes(&self) -> Option<&[u8]> {
        let (front, back) = self.as_slices();
        if back.is_empty() {
            Some(front)
        } else {
            None
        }
    }
}

/// Read-only view over borrowed bytes. Usable as a write source, refused as a read target.
#[derive(Debug, Clone, Copy)]
pub struct ReadOnly<'a>(pub &'a [u8]);

impl ReadableByteSpan for ReadOnly<'_> {
    fn readable_bytes(&self) -> Option<&[u8]> {
        Some(self.0)
    }
}

impl WritableByteSpan for ReadOnly<'_> {
    fn writable_bytes(&mut self) -> Option<&mut [u8]> {
        None
    }
}
