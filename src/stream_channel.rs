//! Plaintext adapter: any socket-backed duplex stream as a channel.
//!
//! Plain transports never need the opposite raw I/O direction to make
//! progress, so `WouldBlock` maps to `WantRead` for reads and `WantWrite`
//! for writes. Useful for relaying already-encrypted or cleartext byte
//! streams, and for exercising the engine against real sockets without a
//! TLS peer.

use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;

use crate::channel::{IoOutcome, SecureChannel};
use crate::fd_util;

pub struct StreamChannel<S> {
    stream: S,
}

impl<S: Read + Write + AsRawFd> StreamChannel<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}

impl<S: Read + Write + AsRawFd> SecureChannel for StreamChannel<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<IoOutcome> {
        loop {
            return match self.stream.read(buf) {
                Ok(0) => Ok(IoOutcome::Closed),
                Ok(n) => Ok(IoOutcome::Transferred(n)),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(IoOutcome::WantRead),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<IoOutcome> {
        loop {
            return match self.stream.write(buf) {
                Ok(0) => Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "stream accepted zero bytes",
                )),
                Ok(n) => Ok(IoOutcome::Transferred(n)),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(IoOutcome::WantWrite),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };
        }
    }

    fn set_nonblocking(&mut self) -> io::Result<()> {
        fd_util::set_nonblocking(self.stream.as_raw_fd())
    }

    fn set_blocking(&mut self) -> io::Result<()> {
        fd_util::set_blocking(self.stream.as_raw_fd())
    }

    fn shutdown(&mut self) -> io::Result<()> {
        if unsafe { libc::shutdown(self.stream.as_raw_fd(), libc::SHUT_RDWR) } < 0 {
            let err = io::Error::last_os_error();
            // Peer may already have torn the connection down.
            if err.kind() == io::ErrorKind::NotConnected {
                return Ok(());
            }
            return Err(err);
        }
        Ok(())
    }
}
