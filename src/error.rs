use std::time::Duration;

use thiserror::Error;

/// Problems with the run's setup; reported before any row is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("column '{column}' not found in CSV. Available columns: {available:?}")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },
    #[error("input CSV has no header row")]
    EmptyHeader,
    #[error("threshold must be a number between 0 and 1, got {0:?}")]
    ThresholdOutOfRange(String),
    #[error("delay must be a non-negative number of seconds, got {0:?}")]
    InvalidDelay(String),
}

/// clap value parser for `[0, 1]` thresholds.
pub fn parse_threshold(value: &str) -> Result<f64, ConfigError> {
    match value.trim().parse::<f64>() {
        Ok(v) if (0.0..=1.0).contains(&v) => Ok(v),
        _ => Err(ConfigError::ThresholdOutOfRange(value.to_string())),
    }
}

/// clap value parser for the pause between requests, in seconds.
pub fn parse_delay(value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs >= 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| ConfigError::InvalidDelay(value.to_string()))
}
