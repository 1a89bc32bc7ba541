//! Business logic services
//!
//! Services own validation and orchestration of domain operations. They
//! are constructed per call against a shared `ServiceContext`.

pub mod auth;
pub mod channel;
pub mod context;
pub mod error;
pub mod message;
pub mod presence;

// Re-export all services for convenience
pub use auth::{AuthService, AuthSession, LoginRequest, RegisterRequest};
pub use channel::ChannelService;
pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use message::MessageService;
pub use presence::{DisconnectOutcome, PresenceService};
