//! served is a multi-site web server: one process serves any number of
//! listening addresses, each carrying any number of virtual hosts, each
//! host composed of static file trees, rendered article/blog areas, and
//! slide presentations.
//!
//! The pipeline is strictly one-way: [`config`] loads and validates the
//! site topology, [`routing`] walks it once into an immutable dispatch
//! structure, and [`server`] accepts connections and routes every request
//! through that structure.

pub mod config;
pub mod docs;
pub mod handler;
pub mod http;
pub mod play;
pub mod routing;
pub mod server;
pub mod slides;
