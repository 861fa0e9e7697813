use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid threshold expression {expression:?} for metric {metric}: {reason}")]
    InvalidThreshold {
        metric: String,
        expression: String,
        reason: &'static str,
    },

    #[error("Scenario {0} has no load profile; supply `.duration()` or `.stages()`")]
    NoProfile(String),

    #[error("Weighted table needs at least one entry with a non-zero weight")]
    EmptyWeights,
}
