use thiserror::Error;

use crate::retry::Transient;

/// Errors that can occur while talking to the blob store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),
    /// The provided content identifier is invalid.
    #[error("invalid content identifier: {0}")]
    InvalidCid(String),
    /// The request never produced a response (connect error, timeout).
    #[error("blob store unreachable: {0}")]
    Transport(String),
    /// The blob store answered with a non-success status.
    #[error("blob store returned {status}: {body}")]
    Upstream { status: u16, body: String },
    /// The response or stored document could not be decoded.
    #[error("malformed blob store response: {0}")]
    Decode(String),
}

impl Transient for StorageError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            Self::NotFound(_) | Self::InvalidCid(_) | Self::Decode(_) => false,
        }
    }
}
