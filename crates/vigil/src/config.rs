//! Session configuration.
//!
//! Loaded from JSON. Every field has a default, so `{}` is a valid
//! configuration. Local key material is carried as opaque base64 strings
//! and only decoded when a recovery actually needs it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use vigil_core::{CodeStub, Thresholds};
use vigil_events::{ConsumerConfig, RetryPolicy};
use vigil_policy::LocalKeyStore;

use crate::error::ConfigError;

/// Retry settings for the analysis consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per event, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failure, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound on any delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Growth factor between delays.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_delay_ms() -> u64 {
    100
}

const fn default_max_delay_ms() -> u64 {
    5_000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_locale() -> String {
    "en".to_string()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: cfg.max_attempts,
            initial_delay: Duration::from_millis(cfg.initial_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
            multiplier: cfg.multiplier,
        }
    }
}

/// Top-level configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct VigilConfig {
    /// How long one subscription poll waits, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Retry bound and backoff curve.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Classification interval.
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Content locale holding observations.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Full public key identifier → base64 private key.
    #[serde(default)]
    pub local_keys: BTreeMap<String, String>,

    /// Public half of the organization's pre-shared key pair.
    #[serde(default)]
    pub public_key: Option<String>,

    /// Base64 private half of the organization's pre-shared key pair.
    #[serde(default)]
    pub private_key: Option<String>,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            retry: RetryConfig::default(),
            thresholds: Thresholds::default(),
            locale: default_locale(),
            local_keys: BTreeMap::new(),
            public_key: None,
            private_key: None,
        }
    }
}

impl fmt::Debug for VigilConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VigilConfig")
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("retry", &self.retry)
            .field("thresholds", &self.thresholds)
            .field("locale", &self.locale)
            .field("local_keys", &self.local_keys.len())
            .field("public_key", &self.public_key)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl VigilConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Register a pre-shared key pair for recovery.
    pub fn with_local_key(
        mut self,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        self.local_keys.insert(public_key.into(), private_key.into());
        self
    }

    /// Check every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.local_keys.keys().any(|k| k.is_empty()) {
            return Err(ConfigError::Invalid(
                "local key identifier must not be empty".into(),
            ));
        }
        match (&self.public_key, &self.private_key) {
            (Some(public), Some(_)) if public.is_empty() => {
                return Err(ConfigError::Invalid("public_key must not be empty".into()));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(ConfigError::Invalid(
                    "public_key and private_key must be set together".into(),
                ));
            }
            _ => {}
        }
        self.consumer_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Consumer settings derived from this configuration.
    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            retry: RetryPolicy::from(&self.retry),
            thresholds: self.thresholds,
            locale: self.locale.clone(),
            sentinel: CodeStub::pending_analysis(),
        }
    }

    /// Key store holding the organization pair and every local key.
    ///
    /// A `local_keys` entry wins over the pair for the same identifier.
    pub fn key_store(&self) -> LocalKeyStore {
        LocalKeyStore::from_pair(self.public_key.clone(), self.private_key.clone())
            .with_keys(self.local_keys.clone())
    }
}
