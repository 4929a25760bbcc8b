//! Content handler module
//!
//! Every content area is served by one `ContentHandler`. Handlers are small
//! owned structs built from explicit copies of their configuration; the
//! enum is assembled once by the router builder and never mutated after.

pub mod assets;
pub mod static_files;

pub use assets::AssetHandler;
pub use static_files::StaticHandler;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response};
use tracing::info;

use crate::docs::DocHandler;
use crate::play::SocketHandler;
use crate::slides::SlideHandler;

/// A runtime request handler for one content area.
#[derive(Debug)]
pub enum ContentHandler {
    /// Static file tree.
    Static(StaticHandler),
    /// Rendered article/blog area.
    Docs(DocHandler),
    /// Slide/presentation area.
    Slides(SlideHandler),
    /// Embedded documentation support files.
    Assets(AssetHandler),
    /// Interactive code-execution socket.
    Play(SocketHandler),
    /// Logging middleware: records host and path, then delegates.
    Logged(Box<ContentHandler>),
}

impl ContentHandler {
    /// Wrap this handler in the logging middleware when request logging is
    /// enabled. The wrapper is always outermost, so it observes each
    /// request exactly once regardless of downstream failures.
    #[must_use]
    pub fn logged(self, enabled: bool) -> Self {
        if enabled {
            Self::Logged(Box::new(self))
        } else {
            self
        }
    }

    /// Serve one request.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>> {
        match self {
            Self::Static(h) => h.handle(&req).await,
            Self::Docs(h) => h.handle(&req).await,
            Self::Slides(h) => h.handle(&req).await,
            Self::Assets(h) => h.handle(&req),
            Self::Play(h) => h.handle(req),
            Self::Logged(inner) => {
                let host = req
                    .headers()
                    .get("host")
                    .and_then(|h| h.to_str().ok())
                    .unwrap_or("-");
                info!(target: "served::access", "{host} {}", req.uri());
                Box::pin(inner.handle(req)).await
            }
        }
    }
}
