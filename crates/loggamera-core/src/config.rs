// ── Runtime configuration ──
//
// These types describe how to reach the Loggamera platform and how the
// resilience and normalization layers behave. They carry credential data
// but never touch disk: loggamera-config (or any embedder) builds a
// `ControllerConfig` and hands it in.

use std::time::Duration;

use loggamera_api::transport::{TlsMode, TransportConfig};
use loggamera_api::{CircuitConfig, OrganizationId, RetryConfig};
use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification. Only for intercepting proxies and test rigs.
    DangerAcceptInvalid,
}

impl TlsVerification {
    pub(crate) fn to_transport(&self) -> TlsMode {
        match self {
            Self::SystemDefaults => TlsMode::System,
            Self::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            Self::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Sensor normalization tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerConfig {
    /// A value older than this is flagged stale. Default: 2 hours.
    pub stale_after: Duration,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(2 * 60 * 60),
        }
    }
}

/// Re-validation policy of the endpoint capability cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityPolicy {
    /// `Unavailable` records older than this read as `Unknown` and get
    /// probed again. `None` (default): never expire.
    pub unavailable_ttl: Option<Duration>,
}

/// Everything a `Controller` needs.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// API root, e.g. `https://platform.loggamera.se/api/v2`.
    pub base_url: Url,
    pub api_key: SecretString,
    /// Organization the key belongs to. Requests for devices owned by
    /// other (child) organizations are re-scoped automatically.
    pub organization_id: Option<OrganizationId>,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub circuit: CircuitConfig,
    pub normalizer: NormalizerConfig,
    pub capability: CapabilityPolicy,
}

impl ControllerConfig {
    /// A config with default tuning.
    pub fn new(base_url: Url, api_key: SecretString) -> Self {
        Self {
            base_url,
            api_key,
            organization_id: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            circuit: CircuitConfig::default(),
            normalizer: NormalizerConfig::default(),
            capability: CapabilityPolicy::default(),
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.to_transport(),
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_platform_behaviour() {
        let config = ControllerConfig::new(
            Url::parse(loggamera_api::DEFAULT_BASE_URL).unwrap(),
            SecretString::from("key"),
        );
        assert_eq!(config.normalizer.stale_after, Duration::from_secs(7200));
        assert_eq!(config.capability.unavailable_ttl, None);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.tls, TlsVerification::SystemDefaults);
        assert!(matches!(config.transport().tls, TlsMode::System));
    }
}
