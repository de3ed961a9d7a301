//! Per-call time limits for a distribution run.

use std::time::Duration;

/// Default limit for each external call, in seconds
pub const DEFAULT_CALL_TIMEOUT_SECONDS: u64 = 30;

/// Timeouts applied to each collaborator call.
///
/// A generation timeout falls back to fixed content; a publish timeout is
/// recorded as a failed result; a context timeout uses the default context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchLimits {
    pub context_timeout: Duration,
    pub generate_timeout: Duration,
    pub publish_timeout: Duration,
}

impl Default for DispatchLimits {
    fn default() -> Self {
        let timeout = Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECONDS);
        Self {
            context_timeout: timeout,
            generate_timeout: timeout,
            publish_timeout: timeout,
        }
    }
}

impl DispatchLimits {
    pub fn from_seconds(context: u64, generate: u64, publish: u64) -> Self {
        Self {
            context_timeout: Duration::from_secs(context),
            generate_timeout: Duration::from_secs(generate),
            publish_timeout: Duration::from_secs(publish),
        }
    }
}
