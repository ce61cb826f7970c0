//! The relay engine.
//!
//! Drives two established duplex channels from a single execution context:
//! bytes read from one side are staged in a fixed-capacity buffer and
//! written to the other, in both directions. All I/O is non-blocking; the
//! engine suspends only inside the readiness poller.
//!
//! Each endpoint carries a retry state per operation recording which
//! readiness condition the last blocked attempt needs. A logical read on
//! an encrypted channel can require write readiness (to flush a handshake
//! record) and a logical write can require read readiness, so the retry
//! state decides both *whether* an operation is admitted this cycle and
//! *under which* readiness flag.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, trace, warn};

use crate::channel::{IoOutcome, SecureChannel};
use crate::config::RelayConfig;
use crate::readiness::{Poller, Readiness};
use crate::relay_buffer::RelayBuffer;

/// Which readiness condition an operation needs before it can be retried.
///
/// `Idle` means the last attempt completed (or none was made yet). The
/// enum makes "at most one pending condition per operation" structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitState {
    #[default]
    Idle,
    WantRead,
    WantWrite,
}

impl WaitState {
    #[inline]
    fn is_idle(self) -> bool {
        matches!(self, WaitState::Idle)
    }
}

/// Endpoint label used in logs and fatal diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// The operation a fatal diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Setup,
    Read,
    Write,
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::Setup => write!(f, "setup"),
            Op::Read => write!(f, "read"),
            Op::Write => write!(f, "write"),
        }
    }
}

/// Fatal relay failure. Would-block conditions and orderly closes never
/// surface here; this is only for unrecoverable channel or poller errors.
#[derive(Debug)]
pub enum RelayError {
    /// An operation on one channel failed unrecoverably.
    Channel {
        side: Side,
        op: Op,
        source: io::Error,
    },
    /// The readiness poller failed.
    Poll(io::Error),
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::Channel { side, op, source } => {
                write!(f, "fatal {} error on channel {}: {}", op, side, source)
            }
            RelayError::Poll(source) => write!(f, "readiness poll failed: {}", source),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RelayError::Channel { source, .. } => Some(source),
            RelayError::Poll(source) => Some(source),
        }
    }
}

/// Byte counters reported when the relay ends without error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelaySummary {
    /// Bytes delivered from channel A to channel B.
    pub a_to_b: u64,
    /// Bytes delivered from channel B to channel A.
    pub b_to_a: u64,
}

// Per-endpoint relay state: the staging buffer holding bytes read from
// this endpoint, the retry state of the last read/write attempted on it,
// and how many staged bytes have been delivered to the peer so far.
struct EndpointState {
    inbound: RelayBuffer,
    read_wait: WaitState,
    write_wait: WaitState,
    delivered: u64,
}

impl EndpointState {
    fn new(capacity: usize) -> Self {
        Self {
            inbound: RelayBuffer::new(capacity),
            read_wait: WaitState::Idle,
            write_wait: WaitState::Idle,
            delivered: 0,
        }
    }
}

// Why the pump loop ended. Closed and Cancelled both produce an Ok result;
// buffered-but-undelivered bytes are discarded in every case.
enum Stop {
    Closed,
    Cancelled,
    Fatal(RelayError),
}

#[derive(Debug, PartialEq, Eq)]
enum Phase {
    Running,
    Closing,
    Terminated,
}

/// Relays opaque application bytes between two channels until either peer
/// closes, a fatal error occurs, or the stop flag is raised.
///
/// Each instance owns its buffers and retry state outright; multiple
/// relays running on different connection pairs share nothing.
pub struct Relay<A, B, P> {
    chan_a: A,
    chan_b: B,
    poller: P,
    a: EndpointState,
    b: EndpointState,
    stop: Arc<AtomicBool>,
    phase: Phase,
}

impl<A, B, P> Relay<A, B, P>
where
    A: SecureChannel,
    B: SecureChannel,
    P: Poller,
{
    /// Build a relay over two established channels. `config` should have
    /// been validated; a zero-size buffer never admits a read and the
    /// relay will idle until cancelled.
    pub fn new(chan_a: A, chan_b: B, poller: P, config: &RelayConfig) -> Self {
        Self {
            chan_a,
            chan_b,
            poller,
            a: EndpointState::new(config.buffer_size),
            b: EndpointState::new(config.buffer_size),
            stop: Arc::new(AtomicBool::new(false)),
            phase: Phase::Running,
        }
    }

    /// Replace the stop flag with one shared by the caller. Raising the
    /// flag is observed before the next poll cycle and ends the relay
    /// without error.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Handle that cancels the relay when set to true.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Run the relay to completion.
    ///
    /// Returns the per-direction byte counters on orderly close or
    /// cancellation, or the fatal diagnostic. Either way both channels are
    /// restored to blocking mode and shut down before returning, and any
    /// buffered-but-undelivered bytes are discarded.
    pub fn run(mut self) -> Result<RelaySummary, RelayError> {
        let stop = self.pump();

        self.phase = Phase::Closing;
        let undelivered = self.a.inbound.len() + self.b.inbound.len();
        if undelivered > 0 {
            debug!("discarding {} undelivered buffered bytes", undelivered);
        }
        self.teardown();

        let summary = RelaySummary {
            a_to_b: self.a.delivered,
            b_to_a: self.b.delivered,
        };
        match stop {
            Stop::Closed => {
                debug!(
                    "relay finished: {} bytes A to B, {} bytes B to A",
                    summary.a_to_b, summary.b_to_a
                );
                Ok(summary)
            }
            Stop::Cancelled => {
                debug!(
                    "relay cancelled: {} bytes A to B, {} bytes B to A",
                    summary.a_to_b, summary.b_to_a
                );
                Ok(summary)
            }
            Stop::Fatal(err) => {
                error!("{}", err);
                Err(err)
            }
        }
    }

    fn pump(&mut self) -> Stop {
        if let Err(e) = self.chan_a.set_nonblocking() {
            return Stop::Fatal(RelayError::Channel {
                side: Side::A,
                op: Op::Setup,
                source: e,
            });
        }
        if let Err(e) = self.chan_b.set_nonblocking() {
            return Stop::Fatal(RelayError::Channel {
                side: Side::B,
                op: Op::Setup,
                source: e,
            });
        }

        loop {
            if self.stop.load(Ordering::Relaxed) {
                debug!("relay stop requested");
                return Stop::Cancelled;
            }

            let ready = match self.poller.wait() {
                Ok(ready) => ready,
                Err(e) => return Stop::Fatal(RelayError::Poll(e)),
            };
            // A timeout pass: nothing is ready, only re-check cancellation.
            if !ready.any() {
                continue;
            }

            if let Err(stop) = self.cycle(&ready) {
                return stop;
            }
        }
    }

    // One pass over the four operations under a single readiness snapshot.
    // Reads before writes, A before B, as fixed order; retry states set
    // earlier in the cycle are visible to later admission tests.
    fn cycle(&mut self, ready: &Readiness) -> Result<(), Stop> {
        try_read(
            Side::A,
            &mut self.chan_a,
            &mut self.a,
            ready.a_readable,
            ready.a_writable,
        )?;
        try_read(
            Side::B,
            &mut self.chan_b,
            &mut self.b,
            ready.b_readable,
            ready.b_writable,
        )?;
        // Writing to A drains B's staging buffer, and vice versa.
        try_write(
            Side::A,
            &mut self.chan_a,
            &mut self.a,
            &mut self.b,
            ready.a_readable,
            ready.a_writable,
        )?;
        try_write(
            Side::B,
            &mut self.chan_b,
            &mut self.b,
            &mut self.a,
            ready.b_readable,
            ready.b_writable,
        )?;
        Ok(())
    }

    // Single teardown routine for every exit path. Restores blocking mode
    // to simplify shutdown, then shuts both channels down. Failures here
    // are logged and never mask the relay result.
    fn teardown(&mut self) {
        if self.phase != Phase::Closing {
            return;
        }

        if let Err(e) = self.chan_a.set_blocking() {
            warn!("failed to restore blocking mode on channel A: {}", e);
        }
        if let Err(e) = self.chan_b.set_blocking() {
            warn!("failed to restore blocking mode on channel B: {}", e);
        }
        if let Err(e) = self.chan_a.shutdown() {
            warn!("failed to shut down channel A: {}", e);
        }
        if let Err(e) = self.chan_b.shutdown() {
            warn!("failed to shut down channel B: {}", e);
        }

        self.phase = Phase::Terminated;
    }
}

// Attempt a read from one endpoint into its staging buffer. Admitted only
// if no write to the same channel is mid-retry (the two operations share
// channel state and must not interleave), the buffer has room, and the
// readiness snapshot satisfies either the plain-read branch or the
// blocked-on-write retry branch.
fn try_read<C: SecureChannel>(
    side: Side,
    chan: &mut C,
    ep: &mut EndpointState,
    can_read: bool,
    can_write: bool,
) -> Result<(), Stop> {
    if !ep.write_wait.is_idle() {
        return Ok(());
    }
    if ep.inbound.is_full() {
        return Ok(());
    }
    let retry_on_write = ep.read_wait == WaitState::WantWrite;
    if !(can_read || (can_write && retry_on_write)) {
        return Ok(());
    }

    // Cleared up front; re-set below only if this attempt blocks again.
    ep.read_wait = WaitState::Idle;

    match chan.read(ep.inbound.unfilled()) {
        Ok(IoOutcome::Transferred(n)) => {
            ep.inbound.advance(n);
            trace!("read {} bytes from channel {}", n, side);
        }
        Ok(IoOutcome::Closed) => {
            debug!("channel {} closed by peer", side);
            return Err(Stop::Closed);
        }
        Ok(IoOutcome::WantRead) => {
            ep.read_wait = WaitState::WantRead;
        }
        Ok(IoOutcome::WantWrite) => {
            debug!("read on channel {} waiting for write readiness", side);
            ep.read_wait = WaitState::WantWrite;
        }
        Err(e) => {
            return Err(Stop::Fatal(RelayError::Channel {
                side,
                op: Op::Read,
                source: e,
            }));
        }
    }
    Ok(())
}

// Attempt a write to one endpoint, draining the peer's staging buffer.
// Mirror of the read admission test: no read on the same channel may be
// mid-retry, there must be staged data, and readiness must satisfy the
// plain-write branch or the blocked-on-read retry branch. Partial writes
// are expected; the untransmitted suffix stays at the buffer front.
fn try_write<C: SecureChannel>(
    side: Side,
    chan: &mut C,
    ep: &mut EndpointState,
    peer: &mut EndpointState,
    can_read: bool,
    can_write: bool,
) -> Result<(), Stop> {
    if !ep.read_wait.is_idle() {
        return Ok(());
    }
    if peer.inbound.is_empty() {
        return Ok(());
    }
    let retry_on_read = ep.write_wait == WaitState::WantRead;
    if !(can_write || (can_read && retry_on_read)) {
        return Ok(());
    }

    ep.write_wait = WaitState::Idle;

    match chan.write(peer.inbound.as_slice()) {
        Ok(IoOutcome::Transferred(n)) => {
            peer.inbound.consume(n);
            peer.delivered += n as u64;
            trace!("wrote {} bytes to channel {}", n, side);
        }
        Ok(IoOutcome::Closed) => {
            debug!("channel {} closed by peer", side);
            return Err(Stop::Closed);
        }
        Ok(IoOutcome::WantRead) => {
            debug!("write on channel {} waiting for read readiness", side);
            ep.write_wait = WaitState::WantRead;
        }
        Ok(IoOutcome::WantWrite) => {
            ep.write_wait = WaitState::WantWrite;
        }
        Err(e) => {
            return Err(Stop::Fatal(RelayError::Channel {
                side,
                op: Op::Write,
                source: e,
            }));
        }
    }
    Ok(())
}
