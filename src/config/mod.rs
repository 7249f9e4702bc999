//! Configuration surface for the tiered cache façade.

use serde::Deserialize;

/// Write propagation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStrategy {
    /// Attempt every layer; succeed if any layer accepted the write.
    Through,
    /// Stop at the first layer that accepts the write.
    First,
}

impl Default for WriteStrategy {
    fn default() -> Self {
        Self::Through
    }
}

/// Recovery-populate strategy.
///
/// The host cache framework this façade is modeled on defaults to
/// `NATURAL` even though its own documentation advertised `POPULATE` as
/// the default; this crate follows the framework's actual runtime
/// behavior rather than its documentation (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryStrategy {
    /// Back-fill healthy higher tiers on a deeper-tier hit.
    Populate,
    /// Never back-fill; rely on natural cache population via writes.
    Natural,
}

impl Default for RecoveryStrategy {
    fn default() -> Self {
        Self::Natural
    }
}

/// Per-tier circuit breaker configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BreakerConfig {
    /// Failure ratio in `(0,1]` above which the breaker opens.
    pub failure_threshold: f64,
    /// Sliding window capacity in outcomes.
    pub window_size: usize,
    /// Seconds to wait in `OPEN` before probing with `HALF_OPEN`.
    pub timeout_secs: i64,
    /// Consecutive half-open successes required to close.
    pub success_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 0.5,
            window_size: 10,
            timeout_secs: 30,
            success_threshold: 1,
        }
    }
}

impl BreakerConfig {
    /// Loads breaker configuration from environment variables, layered
    /// over [`BreakerConfig::default`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies `TIERCACHE_BREAKER_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("TIERCACHE_BREAKER_FAILURE_THRESHOLD") {
            if let Ok(parsed) = v.parse::<f64>() {
                self.failure_threshold = parsed;
            }
        }
        if let Ok(v) = std::env::var("TIERCACHE_BREAKER_WINDOW_SIZE") {
            if let Ok(parsed) = v.parse::<usize>() {
                self.window_size = parsed.max(1);
            }
        }
        if let Ok(v) = std::env::var("TIERCACHE_BREAKER_TIMEOUT_SECS") {
            if let Ok(parsed) = v.parse::<i64>() {
                self.timeout_secs = parsed;
            }
        }
        if let Ok(v) = std::env::var("TIERCACHE_BREAKER_SUCCESS_THRESHOLD") {
            if let Ok(parsed) = v.parse::<u32>() {
                self.success_threshold = parsed.max(1);
            }
        }
        self
    }

    /// Sets the failure threshold.
    #[must_use]
    pub const fn with_failure_threshold(mut self, threshold: f64) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the sliding window size.
    #[must_use]
    pub const fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Sets the open-state timeout in seconds.
    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: i64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the half-open success threshold.
    #[must_use]
    pub const fn with_success_threshold(mut self, success_threshold: u32) -> Self {
        self.success_threshold = success_threshold;
        self
    }

    /// Validates the invariants a breaker config must satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] if `failure_threshold` is
    /// outside `(0,1]` or `window_size` is zero.
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.failure_threshold > 0.0 && self.failure_threshold <= 1.0) {
            return Err(crate::Error::Configuration {
                detail: format!(
                    "breaker failure_threshold must be in (0,1], got {}",
                    self.failure_threshold
                ),
            });
        }
        if self.window_size == 0 {
            return Err(crate::Error::Configuration {
                detail: "breaker window_size must be >= 1".to_string(),
            });
        }
        if self.success_threshold == 0 {
            return Err(crate::Error::Configuration {
                detail: "breaker success_threshold must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Per-tier configuration.
#[derive(Debug, Clone)]
pub struct LayerConfig {
    /// Human-readable backend class identifier, surfaced via
    /// [`crate::cache::coordinator::LayerStatus`].
    pub name: String,
    /// TTL ceiling in seconds for this tier; `None` means no ceiling.
    pub ttl: Option<i64>,
    /// Breaker overrides for this tier.
    pub breaker: BreakerConfig,
}

impl LayerConfig {
    /// Creates a layer config with the default breaker and no TTL ceiling.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttl: None,
            breaker: BreakerConfig::default(),
        }
    }

    /// Sets the TTL ceiling in seconds.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: i64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sets the breaker configuration for this tier.
    #[must_use]
    pub fn with_breaker(mut self, breaker: BreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }
}

/// Coordinator-wide configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    /// Write propagation strategy.
    #[serde(default)]
    pub write_strategy: WriteStrategy,
    /// Recovery-populate strategy.
    #[serde(default)]
    pub recovery_strategy: RecoveryStrategy,
    /// Reject (rather than auto-wrap) non-`WrappedValue` reads.
    #[serde(default)]
    pub strict_mode: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            write_strategy: WriteStrategy::default(),
            recovery_strategy: RecoveryStrategy::default(),
            strict_mode: false,
        }
    }
}

impl CoordinatorConfig {
    /// Loads coordinator configuration from environment variables,
    /// layered over [`CoordinatorConfig::default`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies `TIERCACHE_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        match std::env::var("TIERCACHE_WRITE_STRATEGY").as_deref() {
            Ok("first") => self.write_strategy = WriteStrategy::First,
            Ok("through") => self.write_strategy = WriteStrategy::Through,
            _ => {},
        }
        match std::env::var("TIERCACHE_RECOVERY_STRATEGY").as_deref() {
            Ok("populate") => self.recovery_strategy = RecoveryStrategy::Populate,
            Ok("natural") => self.recovery_strategy = RecoveryStrategy::Natural,
            _ => {},
        }
        if let Ok(v) = std::env::var("TIERCACHE_STRICT_MODE") {
            if let Ok(parsed) = v.parse::<bool>() {
                self.strict_mode = parsed;
            }
        }
        self
    }

    /// Sets the write strategy.
    #[must_use]
    pub const fn with_write_strategy(mut self, strategy: WriteStrategy) -> Self {
        self.write_strategy = strategy;
        self
    }

    /// Sets the recovery strategy.
    #[must_use]
    pub const fn with_recovery_strategy(mut self, strategy: RecoveryStrategy) -> Self {
        self.recovery_strategy = strategy;
        self
    }

    /// Sets strict mode.
    #[must_use]
    pub const fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Parses coordinator configuration from a TOML document, falling back
    /// to documented defaults for any field the document omits.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] if `text` is not valid TOML
    /// for this shape.
    pub fn from_toml(text: &str) -> crate::Result<Self> {
        toml::from_str(text).map_err(|e| crate::Error::Configuration {
            detail: format!("invalid coordinator config TOML: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinator_config_defaults_are_through_natural_non_strict() {
        let cfg = CoordinatorConfig::default();
        assert_eq!(cfg.write_strategy, WriteStrategy::Through);
        assert_eq!(cfg.recovery_strategy, RecoveryStrategy::Natural);
        assert!(!cfg.strict_mode);
    }

    #[test]
    fn breaker_config_defaults_are_valid() {
        let cfg = BreakerConfig::default();
        assert!((cfg.failure_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(cfg.window_size, 10);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.success_threshold, 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn breaker_config_rejects_out_of_range_threshold() {
        let cfg = BreakerConfig::default().with_failure_threshold(0.0);
        assert!(cfg.validate().is_err());
        let cfg = BreakerConfig::default().with_failure_threshold(1.5);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn breaker_config_rejects_zero_window() {
        let cfg = BreakerConfig::default().with_window_size(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn coordinator_config_from_toml() {
        let cfg = CoordinatorConfig::from_toml(
            r#"
            write_strategy = "first"
            recovery_strategy = "populate"
            strict_mode = true
            "#,
        )
        .expect("valid toml");
        assert_eq!(cfg.write_strategy, WriteStrategy::First);
        assert_eq!(cfg.recovery_strategy, RecoveryStrategy::Populate);
        assert!(cfg.strict_mode);
    }

    #[test]
    fn layer_config_builder() {
        let layer = LayerConfig::new("memory").with_ttl(60);
        assert_eq!(layer.name, "memory");
        assert_eq!(layer.ttl, Some(60));
    }
}
