use thiserror::Error;

use crate::import_export::ParseError;

/// Reported by the host when an image upload fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UploadError {
    pub message: String,
}

impl UploadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    #[error("image upload failed: {0}")]
    Upload(#[from] UploadError),
    #[error("no upload is pending for ticket {0}")]
    UnknownUpload(u64),
    #[error("could not parse content: {0}")]
    Parse(#[from] ParseError),
    #[error("invalid document JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for EditorError {
    fn from(err: serde_json::Error) -> Self {
        EditorError::Json(err.to_string())
    }
}
