#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("invalid data format: {0}")]
    Format(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for RecordError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(value: serde_json::Error) -> Self {
        Self::Format(value.to_string())
    }
}
