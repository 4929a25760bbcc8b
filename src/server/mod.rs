//! Server startup and connection serving

pub mod connection;
pub mod listener;

pub use connection::serve;
pub use listener::{create_reusable_listener, resolve_addr};
