//! Readiness polling over the two relayed connections.
//!
//! The relay suspends in exactly one place: waiting for at least one of
//! {A readable, A writable, B readable, B writable} to become true. The
//! engine consumes the wait through the [`Poller`] trait; [`FdPoller`] is
//! the `poll(2)` implementation for socket-backed channels.

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// Per-cycle snapshot of which of the four basic operations can proceed
/// without blocking. Not persisted across cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub a_readable: bool,
    pub a_writable: bool,
    pub b_readable: bool,
    pub b_writable: bool,
}

impl Readiness {
    /// True if any operation can proceed.
    #[inline]
    pub fn any(&self) -> bool {
        self.a_readable || self.a_writable || self.b_readable || self.b_writable
    }
}

/// Blocks the relay until at least one operation can proceed.
///
/// An all-false snapshot is only legal as a timeout pass: the engine
/// re-checks its stop flag and waits again. Implementations must never
/// silently drop a wait cycle - a missed readiness event can stall the
/// relay indefinitely - so transient wait failures (interrupts) are
/// retried internally, and anything else is surfaced as fatal.
pub trait Poller {
    fn wait(&mut self) -> io::Result<Readiness>;
}

/// `poll(2)`-based poller over the two connections' file descriptors.
///
/// Both descriptors are watched for read and write readiness every cycle;
/// error and hang-up conditions are reported as readability so the owning
/// read attempt observes the failure through the channel.
pub struct FdPoller {
    fd_a: RawFd,
    fd_b: RawFd,
    timeout: Option<Duration>,
}

impl FdPoller {
    /// Poller that blocks indefinitely until readiness. A raised stop flag
    /// is then only observed at the next readiness event; callers wanting
    /// prompt cancellation should use [`FdPoller::with_timeout`].
    pub fn new(fd_a: RawFd, fd_b: RawFd) -> Self {
        Self {
            fd_a,
            fd_b,
            timeout: None,
        }
    }

    /// Poller that wakes after `timeout` even without readiness. A timeout
    /// pass is not an error: it reports no readiness and the relay simply
    /// re-checks cancellation.
    pub fn with_timeout(fd_a: RawFd, fd_b: RawFd, timeout: Duration) -> Self {
        Self {
            fd_a,
            fd_b,
            timeout: Some(timeout),
        }
    }
}

impl Poller for FdPoller {
    fn wait(&mut self) -> io::Result<Readiness> {
        let mut fds = [
            libc::pollfd {
                fd: self.fd_a,
                events: libc::POLLIN | libc::POLLOUT,
                revents: 0,
            },
            libc::pollfd {
                fd: self.fd_b,
                events: libc::POLLIN | libc::POLLOUT,
                revents: 0,
            },
        ];
        let timeout_ms: libc::c_int = match self.timeout {
            Some(t) => t.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
            None => -1,
        };

        loop {
            let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
            if rc < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            if rc == 0 {
                // Timeout pass: no readiness, caller re-checks cancellation.
                return Ok(Readiness::default());
            }

            let readable = libc::POLLIN | libc::POLLERR | libc::POLLHUP;
            return Ok(Readiness {
                a_readable: fds[0].revents & readable != 0,
                a_writable: fds[0].revents & libc::POLLOUT != 0,
                b_readable: fds[1].revents & readable != 0,
                b_writable: fds[1].revents & libc::POLLOUT != 0,
            });
        }
    }
}
