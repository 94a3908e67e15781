//! Configuration management for authguard.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{AuthGuardError, Result};
use crate::ratelimit::{LimitConfig, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};

/// Main configuration for authguard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthGuardConfig {
    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Limit applied to actions without their own entry
    #[serde(default)]
    pub default_limit: LimitSettings,

    /// Per-action limits, keyed by action name (e.g. `login`)
    #[serde(default)]
    pub actions: HashMap<String, LimitSettings>,

    /// How often expired records are swept, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            default_limit: LimitSettings::default(),
            actions: HashMap::new(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    60
}

impl RateLimitingConfig {
    /// Get the sweep interval.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// A limit as written in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitSettings {
    /// Requests allowed per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
        }
    }
}

fn default_max_requests() -> u32 {
    DEFAULT_MAX_REQUESTS
}

fn default_window_ms() -> u64 {
    DEFAULT_WINDOW.as_millis() as u64
}

impl From<LimitSettings> for LimitConfig {
    fn from(settings: LimitSettings) -> Self {
        LimitConfig::new(settings.max_requests, Duration::from_millis(settings.window_ms))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl AuthGuardConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: AuthGuardConfig = serde_yaml::from_str(yaml)
            .map_err(|e| AuthGuardError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the limiter cannot run with.
    pub fn validate(&self) -> Result<()> {
        let rl = &self.rate_limiting;
        if rl.sweep_interval_secs == 0 {
            return Err(AuthGuardError::Config(
                "sweep_interval_secs must be greater than 0".to_string(),
            ));
        }
        if rl.default_limit.window_ms == 0 {
            return Err(AuthGuardError::Config(
                "default_limit.window_ms must be greater than 0".to_string(),
            ));
        }
        if let Some((action, _)) = rl.actions.iter().find(|(_, l)| l.window_ms == 0) {
            return Err(AuthGuardError::Config(format!(
                "actions.{}.window_ms must be greater than 0",
                action
            )));
        }
        Ok(())
    }

    /// Limit configured for `action`, or the default limit.
    pub fn limit_for(&self, action: &str) -> LimitConfig {
        self.rate_limiting
            .actions
            .get(action)
            .copied()
            .unwrap_or(self.rate_limiting.default_limit)
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthGuardConfig::default();
        assert_eq!(config.rate_limiting.default_limit.max_requests, 10);
        assert_eq!(config.rate_limiting.default_limit.window_ms, 60_000);
        assert_eq!(config.rate_limiting.sweep_interval(), Duration::from_secs(60));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_empty_document() {
        let config = AuthGuardConfig::from_yaml("{}").unwrap();
        assert_eq!(config.limit_for("login"), LimitConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
rate_limiting:
  default_limit:
    max_requests: 20
    window_ms: 30000
  actions:
    login:
      max_requests: 5
      window_ms: 900000
    register:
      max_requests: 3
  sweep_interval_secs: 120
logging:
  level: debug
  format: json
"#;
        let config = AuthGuardConfig::from_yaml(yaml).unwrap();

        assert_eq!(
            config.limit_for("login"),
            LimitConfig::new(5, Duration::from_secs(900))
        );
        // Missing window falls back to the default window
        assert_eq!(
            config.limit_for("register"),
            LimitConfig::new(3, Duration::from_secs(60))
        );
        assert_eq!(
            config.limit_for("reset_password"),
            LimitConfig::new(20, Duration::from_secs(30))
        );
        assert_eq!(config.rate_limiting.sweep_interval_secs, 120);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let yaml = "rate_limiting:\n  sweep_interval_secs: 0\n";
        assert!(matches!(
            AuthGuardConfig::from_yaml(yaml),
            Err(AuthGuardError::Config(_))
        ));
    }

    #[test]
    fn test_zero_action_window_rejected() {
        let yaml = r#"
rate_limiting:
  actions:
    login:
      max_requests: 5
      window_ms: 0
"#;
        let err = AuthGuardConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("actions.login.window_ms"));
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        let result = AuthGuardConfig::from_yaml("rate_limiting: [not, a, map]");
        assert!(matches!(result, Err(AuthGuardError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = AuthGuardConfig::from_file("/nonexistent/authguard.yaml");
        assert!(matches!(result, Err(AuthGuardError::Io(_))));
    }
}
