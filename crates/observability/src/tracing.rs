//! Tracing/logging initialization.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

/// Variable selecting the output format (`json` or `pretty`).
pub const LOG_FORMAT_VAR: &str = "SETTLEMENT_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    /// Unknown values fall back to JSON.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directives, e.g. `info` or `settlement_infra=debug`.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LogConfig {
    /// `RUST_LOG` for the filter, `SETTLEMENT_LOG_FORMAT` for the format.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            filter: lookup(EnvFilter::DEFAULT_ENV)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.filter),
            format: lookup(LOG_FORMAT_VAR)
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.format),
        }
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(config: LogConfig) {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_json_info() {
        assert_eq!(LogConfig::from_lookup(|_| None), LogConfig::default());
    }

    #[test]
    fn config_reads_filter_and_format() {
        let config = LogConfig::from_lookup(|key| match key {
            "RUST_LOG" => Some("settlement_infra=debug".to_string()),
            LOG_FORMAT_VAR => Some("Pretty".to_string()),
            _ => None,
        });
        assert_eq!(config.filter, "settlement_infra=debug");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(LogFormat::parse("yaml"), LogFormat::Json);
    }

    #[test]
    fn init_twice_is_harmless() {
        init(LogConfig::default());
        init(LogConfig {
            filter: "not a [valid filter".to_string(),
            format: LogFormat::Pretty,
        });
        ::tracing::info!("still logging");
    }
}
