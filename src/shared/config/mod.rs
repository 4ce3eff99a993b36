//! Application configuration module
//!
//! Provides configuration types for the analysis pipeline, the model
//! client, risk thresholds and the realtime layer. Values are read from
//! environment variables (12-factor style) with defaults suitable for
//! local development; every tunable the pipeline or registry consumes
//! lives here rather than at the use site.

use std::time::Duration;
use thiserror::Error;

/// Model service client configuration
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Base URL of the hosted model service
    pub endpoint: String,
    /// Model identifier to invoke
    pub model: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8089".to_string(),
            model: "gemini-2.5-flash-lite".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Risk classification thresholds
///
/// A category score at or above `high` maps to the high tier, at or
/// above `low` to the low tier, otherwise none.
#[derive(Debug, Clone, Copy)]
pub struct RiskThresholds {
    /// Lower bound of the low tier
    pub low: f64,
    /// Lower bound of the high tier
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self { low: 0.35, high: 0.7 }
    }
}

/// Analysis pipeline configuration
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Number of pipeline workers; bounds concurrent model calls
    pub worker_count: usize,
    /// Bounded job queue capacity; submissions beyond this are rejected
    pub queue_capacity: usize,
    /// Maximum analysis attempts per pickup (transient errors only)
    pub max_attempts: u32,
    /// Base delay for exponential retry backoff
    pub backoff_base: Duration,
    /// Risk classification thresholds
    pub thresholds: RiskThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            queue_capacity: 64,
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
            thresholds: RiskThresholds::default(),
        }
    }
}

/// Realtime layer configuration
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Inactivity window after which a connection is expired
    pub heartbeat_timeout: Duration,
    /// How often the sweeper checks for stale connections
    pub sweep_interval: Duration,
    /// Capacity of the registry event broadcast channel
    pub event_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(15),
            event_capacity: 256,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Model service client settings
    pub model: ModelConfig,
    /// Analysis pipeline settings
    pub analysis: AnalysisConfig,
    /// Realtime layer settings
    pub realtime: RealtimeConfig,
    /// Escalation webhook URL; `None` disables delivery (logged only)
    pub escalation_hook_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables fall back to defaults; set-but-invalid numeric
    /// values are rejected so a typo cannot silently halve a retry
    /// budget or disable heartbeat expiry.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("MODEL_ENDPOINT") {
            config.model.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("MODEL_NAME") {
            config.model.model = model;
        }
        config.model.timeout = Duration::from_secs(env_parse("MODEL_TIMEOUT_SECS", 30)?);

        config.analysis.worker_count = env_parse("ANALYSIS_WORKERS", 4)?;
        config.analysis.queue_capacity = env_parse("ANALYSIS_QUEUE_CAPACITY", 64)?;
        config.analysis.max_attempts = env_parse("ANALYSIS_MAX_ATTEMPTS", 3)?;
        config.analysis.backoff_base = Duration::from_millis(env_parse("ANALYSIS_BACKOFF_MS", 500)?);
        config.analysis.thresholds = RiskThresholds {
            low: env_parse("RISK_LOW_THRESHOLD", 0.35)?,
            high: env_parse("RISK_HIGH_THRESHOLD", 0.7)?,
        };

        config.realtime.heartbeat_timeout =
            Duration::from_secs(env_parse("HEARTBEAT_TIMEOUT_SECS", 60)?);
        config.realtime.sweep_interval = Duration::from_secs(env_parse("HEARTBEAT_SWEEP_SECS", 15)?);

        config.escalation_hook_url = std::env::var("ESCALATION_HOOK_URL").ok();

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.worker_count == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ANALYSIS_WORKERS",
                message: "must be at least 1".to_string(),
            });
        }
        if self.analysis.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ANALYSIS_MAX_ATTEMPTS",
                message: "must be at least 1".to_string(),
            });
        }
        let t = self.analysis.thresholds;
        if !(0.0..=1.0).contains(&t.low) || !(0.0..=1.0).contains(&t.high) || t.low > t.high {
            return Err(ConfigError::InvalidValue {
                key: "RISK_LOW_THRESHOLD/RISK_HIGH_THRESHOLD",
                message: format!("thresholds must satisfy 0 <= low <= high <= 1, got {} / {}", t.low, t.high),
            });
        }
        Ok(())
    }
}

/// Parse an environment variable, falling back to a default when unset
fn env_parse<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key,
            message: format!("could not parse '{raw}'"),
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        key: &'static str,
        message: String,
    },
}
