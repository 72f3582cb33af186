use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry policy of the task loop.
///
/// Durations use humantime notation in configuration files, e.g.
/// `backoff = "1s"`, `idle = "1ms"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Pause after a failed invocation.
    #[serde(with = "humantime_serde")]
    pub backoff: Duration,
    /// Pause after a successful invocation.
    #[serde(with = "humantime_serde")]
    pub idle: Duration,
    /// Consecutive failures tolerated. One more marks the action failed.
    pub critical_errors: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(1),
            idle: Duration::from_millis(1),
            critical_errors: 60,
        }
    }
}
