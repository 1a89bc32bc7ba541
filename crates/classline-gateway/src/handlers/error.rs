//! Handler error types

use crate::protocol::{CloseCode, ServerEvent};
use classline_core::DomainError;
use classline_service::ServiceError;
use thiserror::Error;

/// Errors raised while handling a client event
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Malformed envelope or unknown event type
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Channel-scoped event on a connection that is not `Active`
    #[error("Not authenticated")]
    Unauthorized,

    /// Token rejected during `authenticate`
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// `authenticate` on an already authenticated connection
    #[error("Already authenticated")]
    AlreadyAuthenticated,

    /// Service layer rejection
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Domain rejection (from repositories)
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Close code if the error tears the connection down; `None` means
    /// the connection stays open and only an error envelope is sent
    #[must_use]
    pub fn close_code(&self) -> Option<CloseCode> {
        match self {
            Self::AuthenticationFailed(_) => Some(CloseCode::AuthenticationFailed),
            Self::AlreadyAuthenticated => Some(CloseCode::AlreadyAuthenticated),
            _ => None,
        }
    }

    /// Wire error code for the error envelope
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Protocol(_) => "PROTOCOL_ERROR",
            Self::Unauthorized | Self::AuthenticationFailed(_) | Self::AlreadyAuthenticated => {
                "UNAUTHORIZED"
            }
            Self::Service(e) => e.error_code(),
            Self::Domain(e) => e.code(),
            Self::Internal(_) => "UNAVAILABLE",
        }
    }

    /// Error envelope for the originating connection
    #[must_use]
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::error(self.code(), self.to_string())
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
