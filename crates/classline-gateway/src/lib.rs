//! # classline-gateway
//!
//! WebSocket gateway: envelope protocol, session registry, and the
//! channel fanout engine.

pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use server::{build_state, create_app, run, spawn_typing_sweeper, GatewayState};
