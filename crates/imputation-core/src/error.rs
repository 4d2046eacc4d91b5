use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImputationError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Search error: {0}")]
    SearchError(String),

    #[error("Extraction error: {0}")]
    ExtractionError(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
