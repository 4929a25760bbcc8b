//! Embedded asset module
//!
//! A fixed bundle of documentation support files compiled into the binary.
//! Registered once per host that carries at least one blog area.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response};

use crate::http::{self, cache, mime};

/// The support files referenced by document and slide templates.
static FILES: &[(&str, &str)] = &[
    ("doc.css", include_str!("../../assets/doc.css")),
    ("play.js", include_str!("../../assets/play.js")),
];

/// Serves the embedded support bundle under a fixed prefix.
#[derive(Debug, Clone)]
pub struct AssetHandler {
    prefix: String,
}

impl AssetHandler {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn handle<B>(&self, req: &Request<B>) -> Response<Full<Bytes>> {
        let path = req.uri().path();
        let Some(name) = path.strip_prefix(self.prefix.as_str()) else {
            return http::build_404_response();
        };

        let Some((_, content)) = FILES.iter().find(|(n, _)| *n == name) else {
            return http::build_404_response();
        };

        let etag = cache::generate_etag(content.as_bytes());
        let if_none_match = req
            .headers()
            .get("if-none-match")
            .and_then(|v| v.to_str().ok());
        if cache::check_etag_match(if_none_match, &etag) {
            return http::response::build_304_response(&etag);
        }

        let extension = name.rsplit('.').next();
        http::response::build_content_response(
            Bytes::from_static(content.as_bytes()),
            mime::get_content_type(extension),
            &etag,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str) -> Request<()> {
        Request::builder().uri(path).body(()).unwrap()
    }

    #[test]
    fn known_asset_is_served_with_mime() {
        let handler = AssetHandler::new("/lib/docs/");
        let resp = handler.handle(&request("/lib/docs/doc.css"));
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers().get("Content-Type").unwrap(), "text/css");
    }

    #[test]
    fn unknown_asset_yields_404() {
        let handler = AssetHandler::new("/lib/docs/");
        assert_eq!(handler.handle(&request("/lib/docs/nope.css")).status(), 404);
    }
}
