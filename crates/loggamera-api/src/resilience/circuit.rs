// Per-endpoint circuit breakers.
//
// Each endpoint gets an independent three-state breaker. Only exhausted
// transient failures count against it; a definitive answer from the
// platform (success, 4xx, "invalid endpoint") proves the upstream is up.

use std::time::Duration;

use dashmap::DashMap;
use strum::Display;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::endpoint::Endpoint;

// ── CircuitConfig ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitConfig {
    /// Consecutive failures that open the circuit. Default: 3.
    pub failure_threshold: u32,

    /// Failures further apart than this do not accumulate. Default: 5 min.
    pub failure_window: Duration,

    /// How long an open circuit rejects calls before a trial. Default: 5 min.
    pub cool_down: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            failure_window: Duration::from_secs(300),
            cool_down: Duration::from_secs(300),
        }
    }
}

// ── State ────────────────────────────────────────────────────────────

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Closed {
        failures: u32,
        first_failure: Option<Instant>,
    },
    Open {
        until: Instant,
    },
    HalfOpen {
        trial_started: Instant,
    },
}

impl Slot {
    const CLOSED: Self = Self::Closed {
        failures: 0,
        first_failure: None,
    };

    fn state(&self) -> CircuitState {
        match self {
            Self::Closed { .. } => CircuitState::Closed,
            Self::Open { .. } => CircuitState::Open,
            Self::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

/// Result of asking a breaker for permission to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Circuit closed; call normally.
    Normal,
    /// Circuit half-open; this call is the single trial.
    Trial,
}

// ── CircuitBreakers ──────────────────────────────────────────────────

/// Breaker registry keyed by endpoint. Safe to share across tasks.
#[derive(Debug, Default)]
pub struct CircuitBreakers {
    config: CircuitConfig,
    slots: DashMap<Endpoint, Slot>,
}

impl CircuitBreakers {
    pub fn new(config: CircuitConfig) -> Self {
        Self {
            config,
            slots: DashMap::new(),
        }
    }

    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    pub fn state(&self, endpoint: Endpoint) -> CircuitState {
        self.slots
            .get(&endpoint)
            .map_or(CircuitState::Closed, |slot| slot.state())
    }

    /// Ask to send a request. `Err` carries the remaining wait.
    pub fn admit(&self, endpoint: Endpoint) -> Result<Admission, Duration> {
        let now = Instant::now();
        let mut slot = self.slots.entry(endpoint).or_insert(Slot::CLOSED);

        match *slot {
            Slot::Closed { .. } => Ok(Admission::Normal),
            Slot::Open { until } if now >= until => {
                info!(%endpoint, "circuit half-open, admitting trial request");
                *slot = Slot::HalfOpen { trial_started: now };
                Ok(Admission::Trial)
            }
            Slot::Open { until } => Err(until - now),
            Slot::HalfOpen { trial_started } => {
                let expires = trial_started + self.config.cool_down;
                if now >= expires {
                    // The previous trial never reported back.
                    warn!(%endpoint, "stale circuit trial, admitting a new one");
                    *slot = Slot::HalfOpen { trial_started: now };
                    Ok(Admission::Trial)
                } else {
                    Err(expires - now)
                }
            }
        }
    }

    /// The platform answered definitively.
    pub fn success(&self, endpoint: Endpoint) {
        let Some(mut slot) = self.slots.get_mut(&endpoint) else {
            return;
        };
        if !matches!(*slot, Slot::Closed { .. }) {
            info!(%endpoint, "circuit closed");
        }
        *slot = Slot::CLOSED;
    }

    /// A call exhausted its retries on transient failures.
    pub fn failure(&self, endpoint: Endpoint) {
        let now = Instant::now();
        let cool_down = self.config.cool_down;
        let mut slot = self.slots.entry(endpoint).or_insert(Slot::CLOSED);

        match *slot {
            Slot::Closed {
                failures,
                first_failure,
            } => {
                let (failures, first) = match first_failure {
                    Some(first) if now.duration_since(first) <= self.config.failure_window => {
                        (failures.saturating_add(1), first)
                    }
                    _ => (1, now),
                };
                if failures >= self.config.failure_threshold {
                    warn!(
                        %endpoint,
                        failures,
                        cool_down_secs = cool_down.as_secs(),
                        "circuit opened"
                    );
                    *slot = Slot::Open {
                        until: now + cool_down,
                    };
                } else {
                    *slot = Slot::Closed {
                        failures,
                        first_failure: Some(first),
                    };
                }
            }
            Slot::HalfOpen { .. } => {
                warn!(%endpoint, "circuit trial failed, reopening");
                *slot = Slot::Open {
                    until: now + cool_down,
                };
            }
            // A request admitted before the circuit opened; nothing to add.
            Slot::Open { .. } => {}
        }
    }

    /// A trial ended without an answer (cancelled). Frees the half-open slot
    /// so the next caller may run the trial.
    pub fn abandon(&self, endpoint: Endpoint) {
        if let Some(mut slot) = self.slots.get_mut(&endpoint) {
            if matches!(*slot, Slot::HalfOpen { .. }) {
                *slot = Slot::Open {
                    until: Instant::now(),
                };
            }
        }
    }
}
