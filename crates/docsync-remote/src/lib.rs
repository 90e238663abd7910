//! docsync Remote - Rate-limited access to the remote document tree
//!
//! Provides:
//! - A process-wide request budget that paces every outgoing call
//! - A client owning credentials and the signed-in session
//! - A lazily listed, recursively walkable view of the remote tree
//! - Adapters for the remote API (GitHub REST, in-memory)
//! - Keyring-backed credential storage
//!
//! ## Modules
//!
//! - [`rate_limit`] - Request budget and pacing computation
//! - [`client`] - Paced remote client with sign-in and 404/409 folding
//! - [`tree`] - Remote tree levels, walking and document file loading
//! - [`github`] - GitHub REST implementation of `IRemoteApi`
//! - [`memory`] - In-memory implementation of `IRemoteApi`
//! - [`credentials`] - Token storage in the system keyring

pub mod client;
pub mod credentials;
pub mod github;
pub mod memory;
pub mod rate_limit;
pub mod tree;

use docsync_core::ports::{ApiError, CodecError};
use thiserror::Error;

/// Errors surfaced by the remote client and tree
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The remote rejected the credentials during sign-in (4xx)
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The remote answered with an unexpected status
    #[error("Remote error {status}: {message}")]
    Remote { status: u16, message: String },

    /// The request failed at the network level or with a server error (5xx)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The current request quota could not be determined
    #[error("Failed to query the request quota: {0}")]
    RateLimitQuery(String),

    /// A file has an unsupported extension or could not be parsed
    #[error("Format error: {0}")]
    Format(String),

    /// The remote response could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { code, message } if code >= 500 => {
                ClientError::Transport(format!("status {}: {}", code, message))
            }
            ApiError::Status { code, message } => ClientError::Remote {
                status: code,
                message,
            },
            ApiError::Transport(msg) => ClientError::Transport(msg),
            ApiError::InvalidResponse(msg) => ClientError::InvalidResponse(msg),
        }
    }
}

impl From<CodecError> for ClientError {
    fn from(err: CodecError) -> Self {
        ClientError::Format(err.to_string())
    }
}
