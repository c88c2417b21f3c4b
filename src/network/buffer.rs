//! Fixed-capacity byte storage.
//!
//! Every buffer the engine owns is sized at compile time. Writes past the
//! capacity are dropped rather than failing, and the number of dropped
//! bytes is kept so callers can tell a truncated response from a short one.
//! Bytes taken from the front only advance a read cursor; the storage is
//! compacted when an append needs the space.

use heapless::{String, Vec};

/// An append-only byte store that truncates instead of growing.
#[derive(Debug, Clone)]
pub struct BoundedBuffer<const N: usize> {
    data: Vec<u8, N>,
    head: usize,
    dropped: usize,
}

impl<const N: usize> BoundedBuffer<N> {
    /// Create an empty buffer.
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            head: 0,
            dropped: 0,
        }
    }

    /// Append as much of `bytes` as fits, returning the number accepted.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        if self.head > 0 && bytes.len() > N - self.data.len() {
            self.compact();
        }
        let room = N - self.data.len();
        let take = bytes.len().min(room);
        // `take` never exceeds the remaining capacity.
        let _ = self.data.extend_from_slice(&bytes[..take]);
        self.dropped += bytes.len() - take;
        take
    }

    /// Move up to `out.len()` bytes from the head of the buffer into `out`.
    pub fn pop_front(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.len());
        out[..n].copy_from_slice(&self.data[self.head..self.head + n]);
        self.head += n;
        if self.head == self.data.len() {
            self.data.clear();
            self.head = 0;
        }
        n
    }

    /// Drop all contents and reset the overflow counter.
    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
        self.dropped = 0;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.head..]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[self.head..]
    }

    /// Shorten the stored contents to `len` bytes.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(self.head + len);
    }

    pub fn len(&self) -> usize {
        self.data.len() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn compact(&mut self) {
        let len = self.len();
        self.data.copy_within(self.head.., 0);
        self.data.truncate(len);
        self.head = 0;
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Bytes rejected since the last [`clear`](Self::clear).
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Whether any append since the last clear was cut short.
    pub fn is_truncated(&self) -> bool {
        self.dropped > 0
    }
}

impl<const N: usize> Default for BoundedBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy `s` into a bounded string, cutting at the last character boundary
/// that fits.
pub fn truncate_str<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

/// Convert raw bytes into a bounded string.
///
/// Stops at the first invalid UTF-8 sequence or at the capacity, whichever
/// comes first; a multi-byte character that would straddle the capacity is
/// left out entirely.
pub fn truncate_utf8<const N: usize>(bytes: &[u8]) -> String<N> {
    let valid = match core::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            // `valid_up_to` always marks a character boundary.
            core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default()
        }
    };
    truncate_str(valid)
}
