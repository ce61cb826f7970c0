//! Relay tunables.

use serde::Deserialize;

fn default_buffer_size() -> usize {
    80
}

/// Tunables for a single relay instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Staging capacity in bytes for each direction. The default of 80
    /// bytes is deliberately tiny and only suitable for demonstration;
    /// production deployments should size this far larger (tens of
    /// kilobytes) to amortize per-record overhead.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
        }
    }
}

impl RelayConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> std::io::Result<()> {
        if self.buffer_size == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "buffer_size must be non-zero",
            ));
        }
        Ok(())
    }
}
