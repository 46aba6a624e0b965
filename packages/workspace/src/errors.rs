use quire_editor::{ImportError, IntegrityError};
use thiserror::Error;

/// Failures reported by the remote story store or credential service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        RemoteError::Serialization(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum TokenStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed token file: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("No access token for story {0}")]
    MissingToken(String),

    #[error("No active story")]
    NoActiveStory,

    #[error("Story {0} already exists")]
    AlreadyExists(String),

    #[error("Token store error: {0}")]
    TokenStore(#[from] TokenStoreError),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;
