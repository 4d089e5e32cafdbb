use thiserror::Error;

/// Failures crossing the backend and storage seams.
///
/// None of these are fatal to the session: each one degrades a single feature
/// (chapter view, footnote, bookmark, persisted position) and leaves verse
/// reading usable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReaderError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server responded with status {0}")]
    Status(u16),
    #[error("Malformed response: {0}")]
    Decode(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ReaderError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for ReaderError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::Status(status.as_u16());
        }
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ReaderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type ReaderResult<T> = Result<T, ReaderError>;
