//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found
    // =========================================================================
    #[error("User not found: {0}")]
    UserNotFound(Snowflake),

    #[error("Channel not found: {0}")]
    ChannelNotFound(Snowflake),

    #[error("Message not found: {0}")]
    MessageNotFound(Snowflake),

    // =========================================================================
    // Validation
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Password too weak: {0}")]
    WeakPassword(String),

    #[error("Message content must not be empty")]
    EmptyContent,

    #[error("Content too long: max {max} characters")]
    ContentTooLong { max: usize },

    #[error("Channel name must not be empty")]
    EmptyChannelName,

    // =========================================================================
    // Authorization
    // =========================================================================
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Only educators can create group channels")]
    NotEducator,

    #[error("Not a member of channel {0}")]
    NotMember(Snowflake),

    // =========================================================================
    // Conflict
    // =========================================================================
    #[error("Email already in use")]
    EmailAlreadyExists,

    #[error("Cannot open a direct channel with yourself")]
    SelfDirectChannel,

    // =========================================================================
    // Infrastructure (wrapped)
    // =========================================================================
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Wire-level error code for this error
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) | Self::ChannelNotFound(_) | Self::MessageNotFound(_) => {
                "NOT_FOUND"
            }

            Self::ValidationError(_)
            | Self::InvalidEmail
            | Self::WeakPassword(_)
            | Self::EmptyContent
            | Self::ContentTooLong { .. }
            | Self::EmptyChannelName
            | Self::SelfDirectChannel => "INVALID_ARGUMENT",

            Self::InvalidCredentials => "UNAUTHORIZED",
            Self::NotEducator => "FORBIDDEN",
            Self::NotMember(_) => "NOT_MEMBER",

            Self::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",

            Self::StorageError(_) | Self::InternalError(_) => "UNAVAILABLE",
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_) | Self::ChannelNotFound(_) | Self::MessageNotFound(_)
        )
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::InvalidEmail
                | Self::WeakPassword(_)
                | Self::EmptyContent
                | Self::ContentTooLong { .. }
                | Self::EmptyChannelName
                | Self::SelfDirectChannel
        )
    }

    #[must_use]
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::NotEducator | Self::NotMember(_)
        )
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::EmailAlreadyExists)
    }
}
