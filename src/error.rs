use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    /// Caller misuse: unknown target name, unknown or missing SQL dialect.
    #[error("{0}")]
    Configuration(String),

    /// Multiple or mixed encoding layers detected during canonicalization.
    #[error("Ambiguous encoding detected: {0}")]
    AmbiguousEncoding(String),
}

pub type Result<T> = std::result::Result<T, GuardError>;
