//! # classline-service
//!
//! Application layer containing business logic and services.

pub mod services;

pub use services::{
    AuthService, AuthSession, ChannelService, DisconnectOutcome, LoginRequest, MessageService,
    PresenceService, RegisterRequest, ServiceContext, ServiceContextBuilder, ServiceError,
    ServiceResult,
};
