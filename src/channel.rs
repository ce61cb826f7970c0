use std::io;

/// Result of a single non-blocking read or write attempt on a channel.
///
/// Encrypted transports can require the opposite raw I/O direction to make
/// progress on a logical operation (a read that must first flush a
/// handshake record, say), so "would block" carries which readiness
/// condition will unblock the retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOutcome {
    /// The operation transferred this many bytes. Writes may transfer
    /// fewer bytes than requested; the channel must accept partial writes.
    Transferred(usize),
    /// The peer closed the connection in an orderly fashion.
    Closed,
    /// Retry the same operation once the channel is readable.
    WantRead,
    /// Retry the same operation once the channel is writable.
    WantWrite,
}

/// One side of a relayed connection pair.
///
/// Fatal channel errors are the `Err` arm; everything expected or
/// recoverable comes back as an [`IoOutcome`]. The relay engine never
/// looks past this contract.
pub trait SecureChannel {
    /// Attempt a non-blocking read into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<IoOutcome>;

    /// Attempt a non-blocking write of `buf`. Partial writes are legal;
    /// the caller retries with the untransmitted remainder.
    fn write(&mut self, buf: &[u8]) -> io::Result<IoOutcome>;

    /// Put the underlying transport into non-blocking mode.
    fn set_nonblocking(&mut self) -> io::Result<()>;

    /// Restore blocking mode. Used during teardown to simplify shutdown.
    fn set_blocking(&mut self) -> io::Result<()>;

    /// Shut the channel down.
    fn shutdown(&mut self) -> io::Result<()>;
}
