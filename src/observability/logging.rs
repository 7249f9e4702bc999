//! Logging configuration: a minimal `tracing_subscriber` setup, kept
//! deliberately small since the façade logs at call sites rather than
//! through a dedicated logging facade.

/// Output format for the `tracing_subscriber` formatting layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line JSON records, suitable for log shippers.
    Json,
    /// Human-readable multi-line output, suitable for a terminal.
    Pretty,
}

/// Logging configuration for [`super::init`].
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive string, e.g. `"tiercache=debug,warn"`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Builds a logging config from `TIERCACHE_LOG_FORMAT` / `TIERCACHE_LOG_LEVEL`,
    /// layered over [`LoggingConfig::default`].
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        match std::env::var("TIERCACHE_LOG_FORMAT").as_deref() {
            Ok("json") => config.format = LogFormat::Json,
            Ok("pretty") => config.format = LogFormat::Pretty,
            _ => {},
        }
        if let Ok(level) = std::env::var("TIERCACHE_LOG_LEVEL") {
            config.filter = level;
        }
        config
    }

    /// Sets the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the `EnvFilter` directive string.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }
}
