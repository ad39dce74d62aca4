use thiserror::Error;

/// Failure to load or validate `DocketConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer could not be read or a value has the wrong type.
    #[error("config layer error: {0}")]
    Figment(#[from] figment::Error),

    /// A value parsed but breaks a sync constraint.
    #[error("invalid config value {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}
