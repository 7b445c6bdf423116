use stepmesh_step::StepError;
use thiserror::Error;

/// Errors that abort an import.
///
/// Geometry and topology problems never appear here; they are collected as
/// [`crate::ImportWarning`]s on a successful result.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The input file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid Part 21 text.
    #[error("STEP parse error: {0}")]
    Parse(#[from] StepError),
    /// Import options could not be read from TOML.
    #[error("invalid import options: {0}")]
    Config(#[from] toml::de::Error),
    /// The caller cancelled the import.
    #[error("import cancelled")]
    Cancelled,
    /// The blocking import worker failed to complete.
    #[error("import task failed: {0}")]
    Task(String),
}
