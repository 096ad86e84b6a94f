use std::time::Duration;

/// Timing knobs for the job poll loop and the post-reconfigure readiness
/// check. Every wait in a run is bounded by one of these values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Fixed sleep between `Job/{id}` fetches.
    pub interval: Duration,
    /// Ceiling on any single job wait; exceeding it is a `Timeout` error
    /// rather than an indefinite hang.
    pub job_timeout: Duration,
    /// Ceiling on the VM readiness poll after reconfiguration.
    pub settle_timeout: Duration,
    /// Fallback fixed delay when the VM exposes no readiness signal.
    pub settle_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            job_timeout: Duration::from_secs(600),
            settle_timeout: Duration::from_secs(60),
            settle_delay: Duration::from_secs(5),
        }
    }
}
