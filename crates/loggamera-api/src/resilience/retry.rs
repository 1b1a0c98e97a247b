use std::time::Duration;

// ── RetryConfig ──────────────────────────────────────────────────────

/// Exponential backoff configuration for transient failures.
///
/// The defaults reproduce the platform's observed 15s / 30s / 60s
/// recovery schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay before the first retry. Default: 15s.
    pub initial_delay: Duration,

    /// Upper bound on any single delay, jitter included. Default: 60s.
    pub max_delay: Duration,

    /// Retries after the first attempt. Default: 3.
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(15),
            max_delay: Duration::from_secs(60),
            max_retries: 3,
        }
    }
}

impl RetryConfig {
    /// No retries at all; every transient failure is final.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Delay before retry number `attempt` (0-based).
pub fn calculate_backoff(attempt: u32, config: &RetryConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);

    // Deterministic "jitter" seeded from the attempt number, within ±25 %.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (base * jitter_factor)
        .min(config.max_delay.as_secs_f64())
        .max(0.0);

    Duration::from_secs_f64(with_jitter)
}
