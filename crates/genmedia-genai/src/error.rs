//! Gateway error taxonomy.
//!
//! Partial failures during fan-out are absorbed and logged inside the
//! gateway; only total failure crosses this boundary. The tool layer
//! converts every variant into a failure envelope, so nothing here reaches
//! the transport as a thrown error.

use std::time::Duration;

use genmedia_core::error::ValidationError;
use genmedia_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Remote generation call failed: {0}")]
    RemoteCallFailed(String),

    #[error("Generation completed but returned no artifacts")]
    NoArtifactsReturned,

    #[error("No artifacts could be persisted")]
    NoArtifactsPersisted,

    #[error("Download failed with status {status}: {message}")]
    DownloadFailed { status: u16, message: String },

    #[error("Failed to fetch {url}: status {status}")]
    FetchFailed { status: u16, url: String },

    #[error("Generation did not complete within {0:?}")]
    TimeoutExceeded(Duration),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl From<ValidationError> for GatewayError {
    fn from(err: ValidationError) -> Self {
        GatewayError::Validation(err.0)
    }
}
