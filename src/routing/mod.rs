//! Request routing
//!
//! Two-level dispatch: a [`HostSelector`] per listening address picks the
//! route table for the request's host, and that [`PathDispatcher`] picks
//! the handler for the request's path. Both levels are built once by the
//! [`builder`] and never mutated afterwards.

pub mod builder;
pub mod dispatcher;
pub mod vhost;

pub use builder::{build_servers, BuildError};
pub use dispatcher::PathDispatcher;
pub use vhost::HostSelector;
