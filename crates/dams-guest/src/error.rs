//! Error types for the guest runtime

use thiserror::Error;

/// Result type for guest operations
pub type Result<T> = std::result::Result<T, GuestError>;

/// Guest error types
#[derive(Error, Debug)]
pub enum GuestError {
    /// The host never transferred an identity bundle
    #[error("Handshake incomplete: no context received from host")]
    HandshakeIncomplete,

    /// Identity is known but the host has not set the app mode yet
    #[error("App mode not set")]
    ModeUnset,

    /// Group mode was requested for a user without a group
    #[error("User has no group assigned")]
    NoGroupAssigned,

    /// Session has not been verified (or verification failed)
    #[error("Session is not trusted")]
    SessionInvalid,

    /// Store client could not be built for this context
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Any HTTP failure against the preference store
    #[error("Store error: {0}")]
    TransientStore(#[from] dams_store_client::StoreError),

    /// No file / invalid file
    #[error("{0}")]
    UserInput(String),

    /// Raw score payload was not valid JSON scores
    #[error("Invalid scores payload: {0}")]
    InvalidScores(#[from] serde_json::Error),

    /// The host-to-guest channel is gone
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GuestError {
    /// Errors that mean "no trusted context": the guest keeps running local-only.
    pub fn is_degraded_context(&self) -> bool {
        matches!(
            self,
            GuestError::HandshakeIncomplete
                | GuestError::ModeUnset
                | GuestError::NoGroupAssigned
                | GuestError::SessionInvalid
                | GuestError::StoreUnavailable(_)
        )
    }
}
