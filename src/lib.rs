//! shunt - a non-blocking relay engine for encrypted duplex streams.
//!
//! Pumps application bytes between two independently established encrypted
//! connections ("A" and "B") in both directions from a single execution
//! context, using strictly non-blocking I/O and a readiness poller. The
//! engine tracks, per endpoint, which readiness condition a blocked
//! operation needs before it can be retried - encrypted transports can
//! require the opposite raw I/O direction to make progress on a logical
//! read or write - and retries under exactly that condition instead of
//! spinning.
//!
//! Connection establishment, handshakes, certificate loading and
//! crypto-library thread callbacks are the host's business: channels arrive
//! here already established, behind the [`SecureChannel`] contract.
//!
//! # Example
//!
//! ```ignore
//! let config = RelayConfig::default();
//! let poller = FdPoller::new(sock_a.as_raw_fd(), sock_b.as_raw_fd());
//! let relay = Relay::new(
//!     StreamChannel::new(sock_a),
//!     StreamChannel::new(sock_b),
//!     poller,
//!     &config,
//! );
//! let summary = relay.run()?;
//! ```

mod channel;
mod config;
mod fd_util;
mod readiness;
mod relay;
mod relay_buffer;
mod ssl_channel;
mod stream_channel;

pub use channel::{IoOutcome, SecureChannel};
pub use config::RelayConfig;
pub use readiness::{FdPoller, Poller, Readiness};
pub use relay::{Op, Relay, RelayError, RelaySummary, Side};
pub use ssl_channel::SslChannel;
pub use stream_channel::StreamChannel;
