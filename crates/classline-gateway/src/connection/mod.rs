//! Connection and session tracking

mod connection;
mod registry;

pub use connection::{Connection, ConnectionState, Outbound};
pub use registry::SessionRegistry;
