//! Error taxonomy for facility reads and writes.

use thiserror::Error;

/// Errors surfaced by stores, the remote directory and edit validation.
#[derive(Debug, Error)]
pub enum FacilityError {
    #[error("Facility with ID {0} not found")]
    NotFound(String),

    #[error("Document {document_id} not found on facility {facility_id}")]
    DocumentNotFound {
        facility_id: String,
        document_id: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Facility with ID {0} already exists")]
    Conflict(String),

    #[error("Write operations require a bearer token")]
    Unauthorized,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FacilityError {
    pub fn validation(message: impl Into<String>) -> Self {
        FacilityError::Validation(message.into())
    }
}

impl From<reqwest::Error> for FacilityError {
    fn from(err: reqwest::Error) -> Self {
        FacilityError::Transport(err.to_string())
    }
}

pub type FacilityResult<T> = Result<T, FacilityError>;
