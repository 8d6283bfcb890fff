use thiserror::Error;

/// Errors surfaced by the review pipeline.
///
/// `Parse` and `Serialize` are per-document conditions: the processor records them
/// on the document's report and moves on. `Configuration` is a setup defect and is
/// returned from construction before any document is touched.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Failed to parse document: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Failed to serialize document: {0}")]
    Serialize(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReviewError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, ReviewError::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;
