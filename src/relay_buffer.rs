//! Fixed-capacity per-direction staging buffer.
//!
//! Bytes read from one endpoint wait here until the opposite endpoint
//! accepts them. Valid bytes always occupy `0..len`: consuming delivered
//! bytes from the front moves the untransmitted suffix back to offset
//! zero with `copy_within()`, so the next read appends contiguously and
//! the next write always starts at offset zero. The buffer is allocated
//! once when the relay starts and never grows.

/// A fixed-capacity front-compacting byte buffer.
pub(crate) struct RelayBuffer {
    data: Box<[u8]>,
    len: usize,
}

impl RelayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Number of buffered bytes awaiting delivery.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.data.len()
    }

    /// The buffered bytes, in arrival order.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Writable tail for the next read. After filling a prefix of it,
    /// call `advance(n)` to mark those bytes as buffered.
    #[inline]
    pub fn unfilled(&mut self) -> &mut [u8] {
        &mut self.data[self.len..]
    }

    /// Mark `n` bytes of the unfilled tail as buffered.
    #[inline]
    pub fn advance(&mut self, n: usize) {
        debug_assert!(
            self.len + n <= self.data.len(),
            "RelayBuffer overflow: len={}, n={}, capacity={}",
            self.len,
            n,
            self.data.len()
        );
        self.len += n;
    }

    /// Drop `n` delivered bytes from the front, compacting the remaining
    /// suffix to offset zero.
    #[inline]
    pub fn consume(&mut self, n: usize) {
        debug_assert!(
            n <= self.len,
            "RelayBuffer consume underflow: n={}, len={}",
            n,
            self.len
        );
        if n == 0 {
            return;
        }
        if n < self.len {
            self.data.copy_within(n..self.len, 0);
        }
        self.len -= n;
    }
}
