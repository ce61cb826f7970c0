//! OpenSSL adapter for the relay engine.
//!
//! Wraps an already-established TLS session so the engine can drive it.
//! The OpenSSL error codes map directly onto the channel contract:
//! `ZERO_RETURN` is an orderly close, `WANT_READ`/`WANT_WRITE` name the
//! readiness condition that unblocks a retry, everything else is fatal.

use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;

use openssl::ssl::{ErrorCode, SslContextBuilder, SslMode, SslStream};

use crate::channel::{IoOutcome, SecureChannel};
use crate::fd_util;

/// Enable the write modes the relay engine depends on.
///
/// The engine retries partial writes with the untransmitted remainder
/// compacted to the front of its staging buffer, so the session must
/// accept short writes as success and tolerate the retry buffer having
/// moved. Call this on the context builder (acceptor or connector) before
/// establishing sessions that will be relayed.
pub fn enable_partial_write(ctx: &mut SslContextBuilder) {
    ctx.set_mode(SslMode::ENABLE_PARTIAL_WRITE | SslMode::ACCEPT_MOVING_WRITE_BUFFER);
}

/// An established TLS session as a relay channel.
///
/// The session must already be handshaken and its context configured with
/// [`enable_partial_write`]; this adapter never initiates or accepts
/// connections and never loads key material.
pub struct SslChannel<S> {
    stream: SslStream<S>,
}

impl<S: Read + Write + AsRawFd> SslChannel<S> {
    pub fn new(stream: SslStream<S>) -> Self {
        Self { stream }
    }

    pub fn get_ref(&self) -> &SslStream<S> {
        &self.stream
    }
}

fn fatal(err: openssl::ssl::Error) -> io::Error {
    match err.into_io_error() {
        Ok(io_err) => io_err,
        Err(ssl_err) => io::Error::new(io::ErrorKind::Other, ssl_err),
    }
}

impl<S: Read + Write + AsRawFd> SecureChannel for SslChannel<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<IoOutcome> {
        match self.stream.ssl_read(buf) {
            Ok(n) => Ok(IoOutcome::Transferred(n)),
            Err(e) => match e.code() {
                ErrorCode::ZERO_RETURN => Ok(IoOutcome::Closed),
                ErrorCode::WANT_READ => Ok(IoOutcome::WantRead),
                ErrorCode::WANT_WRITE => Ok(IoOutcome::WantWrite),
                _ => Err(fatal(e)),
            },
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<IoOutcome> {
        match self.stream.ssl_write(buf) {
            Ok(n) => Ok(IoOutcome::Transferred(n)),
            Err(e) => match e.code() {
                ErrorCode::ZERO_RETURN => Ok(IoOutcome::Closed),
                ErrorCode::WANT_READ => Ok(IoOutcome::WantRead),
                ErrorCode::WANT_WRITE => Ok(IoOutcome::WantWrite),
                _ => Err(fatal(e)),
            },
        }
    }

    fn set_nonblocking(&mut self) -> io::Result<()> {
        fd_util::set_nonblocking(self.stream.get_ref().as_raw_fd())
    }

    fn set_blocking(&mut self) -> io::Result<()> {
        fd_util::set_blocking(self.stream.get_ref().as_raw_fd())
    }

    fn shutdown(&mut self) -> io::Result<()> {
        match self.stream.shutdown() {
            Ok(_) => Ok(()),
            Err(e) => match e.code() {
                // The peer may already be gone, or the close_notify may
                // itself hit a would-block in edge cases; neither matters
                // during teardown.
                ErrorCode::ZERO_RETURN | ErrorCode::WANT_READ | ErrorCode::WANT_WRITE => Ok(()),
                _ => Err(fatal(e)),
            },
        }
    }
}
