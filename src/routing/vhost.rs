//! Host selection

use std::collections::HashMap;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response};

use super::dispatcher::PathDispatcher;
use crate::handler::ContentHandler;
use crate::http;

/// All hosts served on one listening address.
///
/// The map is built once from the configuration and is immutable from then
/// on, so it can be shared across connection tasks without locking.
#[derive(Debug, Default)]
pub struct HostSelector {
    hosts: HashMap<String, PathDispatcher>,
}

impl HostSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hostname: &str, dispatcher: PathDispatcher) {
        self.hosts.insert(hostname.to_string(), dispatcher);
    }

    pub fn dispatcher(&self, hostname: &str) -> Option<&PathDispatcher> {
        self.hosts.get(hostname)
    }

    /// Route one request to the handler declared for its host and path.
    /// Unknown host or unmatched path both resolve to a 404.
    pub async fn dispatch<B>(&self, req: Request<B>) -> Response<Full<Bytes>> {
        let hostname = req
            .headers()
            .get("host")
            .and_then(|v| v.to_str().ok())
            .map_or_else(String::new, |h| host_name(h).to_string());
        let path = req.uri().path().to_string();

        match self.hosts.get(&hostname).and_then(|d| d.lookup(&path)) {
            Some(handler) => handler.handle(req).await,
            None => http::build_404_response(),
        }
    }
}

/// Strip any `:port` suffix from a Host header value.
fn host_name(host: &str) -> &str {
    host.split(':').next().unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::AssetHandler;

    fn selector() -> HostSelector {
        let mut d = PathDispatcher::new();
        d.register(
            "/lib/docs/",
            ContentHandler::Assets(AssetHandler::new("/lib/docs/")),
        );
        let mut s = HostSelector::new();
        s.insert("example.test", d);
        s
    }

    fn request(host: &str, path: &str) -> Request<()> {
        Request::builder()
            .uri(path)
            .header("host", host)
            .body(())
            .unwrap()
    }

    #[tokio::test]
    async fn port_is_stripped_before_host_lookup() {
        let s = selector();
        let resp = s
            .dispatch(request("example.test:8080", "/lib/docs/doc.css"))
            .await;
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn unknown_host_yields_404() {
        let s = selector();
        let resp = s.dispatch(request("other.test", "/lib/docs/doc.css")).await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn unmatched_path_yields_404() {
        let s = selector();
        let resp = s.dispatch(request("example.test", "/nowhere")).await;
        assert_eq!(resp.status(), 404);
    }
}
