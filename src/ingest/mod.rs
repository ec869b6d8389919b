/// External data retrieval.
///
/// Submodules:
/// - `inat`      — iNaturalist taxon resolution and observation search.
/// - `herbarium` — CPNWH historical specimen export (trend comparison only).
///
/// All calls are blocking and sequential; nothing here is used by the
/// analysis engine directly.

pub mod herbarium;
pub mod inat;

use std::time::Duration;

/// Bounded retry schedule for upstream requests.
///
/// Rate limiting (HTTP 429) backs off linearly up to a cap; transport
/// failures (timeouts, resets) retry a few times with a shorter step. Any
/// other HTTP status fails immediately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_throttle_attempts: u32,
    pub throttle_step_secs: f64,
    pub throttle_cap_secs: f64,
    pub max_transport_attempts: u32,
    pub transport_step_secs: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_throttle_attempts: 7,
            throttle_step_secs: 2.0,
            throttle_cap_secs: 60.0,
            max_transport_attempts: 5,
            transport_step_secs: 1.5,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after `attempt` (1-based) returned `status`.
    pub fn http_delay(&self, status: u16, attempt: u32) -> Option<Duration> {
        if status != 429 || attempt >= self.max_throttle_attempts {
            return None;
        }
        let secs = (self.throttle_step_secs * attempt as f64).min(self.throttle_cap_secs);
        Some(Duration::from_secs_f64(secs))
    }

    /// Delay before retrying after `attempt` (1-based) failed in transport.
    pub fn transport_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_transport_attempts {
            return None;
        }
        Some(Duration::from_secs_f64(self.transport_step_secs * attempt as f64))
    }
}
