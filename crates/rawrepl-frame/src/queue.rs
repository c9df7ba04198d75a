use bytes::{Bytes, BytesMut};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
/// Upper bound on a single up-front reservation; larger hints are capped.
const MAX_RESERVE: usize = 64 * 1024;

/// FIFO buffer of bytes received from the device.
///
/// Bytes are appended at the tail in arrival order and consumed from the
/// head, either up to and including a matched pattern or all at once.
/// Content is never reordered.
#[derive(Debug)]
pub struct ByteQueue {
    buf: BytesMut,
}

impl Default for ByteQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteQueue {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Append received bytes at the tail.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Make room for `additional` more bytes, capped at 64 KiB. The queue
    /// still grows past that as data arrives.
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional.min(MAX_RESERVE));
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current queued content, oldest byte first.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Offset of the first occurrence of `pattern` starting at or after `from`.
    ///
    /// An empty pattern matches at `from`.
    pub fn find(&self, pattern: &[u8], from: usize) -> Option<usize> {
        find_subslice(&self.buf, pattern, from)
    }

    /// Remove and return the first `len` bytes.
    pub fn take(&mut self, len: usize) -> Bytes {
        let len = len.min(self.buf.len());
        self.buf.split_to(len).freeze()
    }

    /// Remove and return everything up to and including the first occurrence
    /// of `pattern` at or after `from`, if present.
    pub fn take_through(&mut self, pattern: &[u8], from: usize) -> Option<Bytes> {
        let start = self.find(pattern, from)?;
        Some(self.take(start + pattern.len()))
    }

    /// Remove and return all queued bytes.
    pub fn drain(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

pub(crate) fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    if needle.is_empty() {
        return Some(from);
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}
