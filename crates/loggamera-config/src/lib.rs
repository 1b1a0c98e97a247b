//! Configuration for Loggamera clients.
//!
//! TOML profiles, API key resolution (env + plaintext), and translation to
//! `loggamera_core::ControllerConfig`. Loading layers built-in defaults,
//! the config file, and `LOGGAMERA_` environment variables, in that order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use loggamera_api::{CircuitConfig, DEFAULT_BASE_URL, OrganizationId, RetryConfig};
use loggamera_core::{CapabilityPolicy, ControllerConfig, NormalizerConfig, TlsVerification};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API key configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    /// Tuning shared by every profile unless overridden.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// The named profile, or the default one when `name` is `None`.
    pub fn profile<'a>(
        &'a self,
        name: Option<&'a str>,
    ) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|profile| (name, profile))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Retries after a transient failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Age in minutes after which a reading is stale.
    #[serde(default = "default_stale_after")]
    pub stale_after_minutes: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            stale_after_minutes: default_stale_after(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_stale_after() -> u64 {
    120
}

/// A named account profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// API root. Defaults to the public platform.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Organization the API key belongs to.
    pub organization_id: Option<u64>,

    /// API key (plaintext; prefer `api_key_env`).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification.
    pub insecure: Option<bool>,

    /// Override `defaults.timeout`.
    pub timeout: Option<u64>,

    /// Override `defaults.max_retries`.
    pub max_retries: Option<u32>,

    /// Consecutive failures that open an endpoint's circuit.
    pub circuit_threshold: Option<u32>,

    /// Seconds an open circuit waits before a trial request.
    pub circuit_cool_down: Option<u64>,

    /// Override `defaults.stale_after_minutes`.
    pub stale_after_minutes: Option<u64>,

    /// Hours after which an unavailable endpoint is probed again. Unset:
    /// never.
    pub capability_ttl_hours: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("se", "loggamera", "loggamera").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("loggamera");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file is not an error.
///
/// Environment keys nest with `__`, e.g. `LOGGAMERA_DEFAULTS__TIMEOUT=10`
/// or `LOGGAMERA_PROFILES__HOME__API_KEY_ENV=HOME_KEY`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading configuration");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LOGGAMERA_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), "configuration saved");
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the API key: the profile's `api_key_env` variable, then the
/// plaintext `api_key`.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = profile.api_key_env {
        match std::env::var(env_name) {
            Ok(val) if !val.trim().is_empty() => return Ok(SecretString::from(val)),
            _ => debug!(variable = %env_name, "API key variable not set"),
        }
    }

    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Build a `ControllerConfig` from a profile, filling unset tuning from
/// `defaults`.
pub fn profile_to_controller_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let base_url: url::Url = profile
        .base_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL: {}", profile.base_url),
        })?;

    let organization_id = match profile.organization_id {
        Some(0) => {
            return Err(ConfigError::Validation {
                field: "organization_id".into(),
                reason: "must be a positive integer".into(),
            });
        }
        other => other.map(OrganizationId),
    };

    let timeout = profile.timeout.unwrap_or(defaults.timeout);
    if timeout == 0 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least one second".into(),
        });
    }

    let api_key = resolve_api_key(profile, profile_name)?;

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let retry = RetryConfig {
        max_retries: profile.max_retries.unwrap_or(defaults.max_retries),
        ..RetryConfig::default()
    };

    let mut circuit = CircuitConfig::default();
    if let Some(threshold) = profile.circuit_threshold {
        circuit.failure_threshold = threshold.max(1);
    }
    if let Some(secs) = profile.circuit_cool_down {
        circuit.cool_down = Duration::from_secs(secs);
    }

    let stale_minutes = profile
        .stale_after_minutes
        .unwrap_or(defaults.stale_after_minutes);

    Ok(ControllerConfig {
        base_url,
        api_key,
        organization_id,
        tls,
        timeout: Duration::from_secs(timeout),
        retry,
        circuit,
        normalizer: NormalizerConfig {
            stale_after: Duration::from_secs(stale_minutes.saturating_mul(60)),
        },
        capability: CapabilityPolicy {
            unavailable_ttl: profile
                .capability_ttl_hours
                .map(|h| Duration::from_secs(h.saturating_mul(3600))),
        },
    })
}
