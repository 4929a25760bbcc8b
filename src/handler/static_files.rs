//! Static file serving module
//!
//! Serves bytes from a fixed backing directory with directory listings,
//! index file support, and conditional GET.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

use crate::http::{self, cache, mime};

const INDEX_FILE: &str = "index.html";

/// Serves a file tree rooted at a configured directory.
///
/// When registered at a non-root prefix the prefix is stripped from the
/// request path before hitting the tree; a handler registered at `/`
/// receives the full original path.
#[derive(Debug, Clone)]
pub struct StaticHandler {
    folder: PathBuf,
    strip_prefix: Option<String>,
}

impl StaticHandler {
    /// Create a handler for `folder` registered at `root`.
    pub fn new(folder: &str, root: &str) -> Self {
        let strip_prefix = (root != "/").then(|| root.to_string());
        Self {
            folder: PathBuf::from(folder),
            strip_prefix,
        }
    }

    pub async fn handle<B>(&self, req: &Request<B>) -> Response<Full<Bytes>> {
        let path = req.uri().path();
        let relative = match &self.strip_prefix {
            Some(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest,
                None => return http::build_404_response(),
            },
            None => path,
        };

        let if_none_match = req
            .headers()
            .get("if-none-match")
            .and_then(|v| v.to_str().ok());
        self.serve(relative, if_none_match).await
    }

    /// Serve `relative` (no registered prefix) out of the backing folder.
    pub async fn serve(
        &self,
        relative: &str,
        if_none_match: Option<&str>,
    ) -> Response<Full<Bytes>> {
        let relative = relative.trim_start_matches('/');
        if relative.split('/').any(|part| part == "..") {
            return http::build_400_response("invalid path");
        }

        let Ok(folder) = self.folder.canonicalize() else {
            warn!(
                "static folder not found or inaccessible: {}",
                self.folder.display()
            );
            return http::build_404_response();
        };

        let mut target = folder.join(relative);
        if target.is_dir() {
            let index = target.join(INDEX_FILE);
            if index.is_file() {
                target = index;
            } else {
                return list_directory(&target, relative).await;
            }
        }

        // A miss on canonicalize is an ordinary 404; escaping the folder
        // after symlink resolution is not.
        let Ok(target) = target.canonicalize() else {
            return http::build_404_response();
        };
        if !target.starts_with(&folder) {
            warn!("path traversal attempt blocked: {relative}");
            return http::build_404_response();
        }

        let content = match fs::read(&target).await {
            Ok(content) => content,
            Err(e) => {
                warn!("failed to read file {}: {e}", target.display());
                return http::build_404_response();
            }
        };

        let etag = cache::generate_etag(&content);
        if cache::check_etag_match(if_none_match, &etag) {
            return http::response::build_304_response(&etag);
        }

        let content_type =
            mime::get_content_type(target.extension().and_then(|e| e.to_str()));
        http::response::build_content_response(Bytes::from(content), content_type, &etag)
    }
}

/// Render a plain HTML directory listing.
async fn list_directory(dir: &Path, relative: &str) -> Response<Full<Bytes>> {
    let mut entries = Vec::new();
    let mut reader = match fs::read_dir(dir).await {
        Ok(reader) => reader,
        Err(_) => return http::build_404_response(),
    };
    while let Ok(Some(entry)) = reader.next_entry().await {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_dir() {
            name.push('/');
        }
        entries.push(name);
    }
    entries.sort();

    let title = if relative.is_empty() { "/" } else { relative };
    let mut body = format!("<html><head><title>{title}</title></head><body><ul>\n");
    for name in entries {
        body.push_str(&format!("<li><a href=\"{name}\">{name}</a></li>\n"));
    }
    body.push_str("</ul></body></html>\n");
    http::response::build_html_response(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn request(path: &str) -> Request<()> {
        Request::builder().uri(path).body(()).unwrap()
    }

    async fn body_text(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        std_fs::write(dir.path().join("readme.txt"), "hello from disk").unwrap();
        std_fs::create_dir(dir.path().join("sub")).unwrap();
        std_fs::write(dir.path().join("sub/page.html"), "<p>sub</p>").unwrap();
        dir
    }

    #[tokio::test]
    async fn prefix_is_stripped_before_lookup() {
        let dir = fixture();
        let handler = StaticHandler::new(dir.path().to_str().unwrap(), "/files/");
        let resp = handler.handle(&request("/files/readme.txt")).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_text(resp).await, "hello from disk");
    }

    #[tokio::test]
    async fn root_registration_keeps_full_path() {
        let dir = fixture();
        let handler = StaticHandler::new(dir.path().to_str().unwrap(), "/");
        let resp = handler.handle(&request("/readme.txt")).await;
        assert_eq!(resp.status(), 200);

        // A path carrying the folder name again must miss: nothing is stripped.
        let resp = handler.handle(&request("/files/readme.txt")).await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn missing_file_yields_404() {
        let dir = fixture();
        let handler = StaticHandler::new(dir.path().to_str().unwrap(), "/files/");
        let resp = handler.handle(&request("/files/nope.txt")).await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn dot_dot_is_rejected() {
        let dir = fixture();
        let handler = StaticHandler::new(dir.path().to_str().unwrap(), "/files/");
        let resp = handler.handle(&request("/files/../secret")).await;
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn directory_without_index_is_listed() {
        let dir = fixture();
        let handler = StaticHandler::new(dir.path().to_str().unwrap(), "/files/");
        let resp = handler.handle(&request("/files/")).await;
        assert_eq!(resp.status(), 200);
        let body = body_text(resp).await;
        assert!(body.contains("readme.txt"));
        assert!(body.contains("sub/"));
    }

    #[tokio::test]
    async fn directory_with_index_serves_it() {
        let dir = fixture();
        std_fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        let handler = StaticHandler::new(dir.path().to_str().unwrap(), "/files/");
        let resp = handler.handle(&request("/files/")).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_text(resp).await, "<h1>home</h1>");
    }

    #[tokio::test]
    async fn etag_match_yields_304() {
        let dir = fixture();
        let handler = StaticHandler::new(dir.path().to_str().unwrap(), "/files/");
        let first = handler.handle(&request("/files/readme.txt")).await;
        let etag = first.headers().get("ETag").unwrap().to_str().unwrap().to_string();

        let req = Request::builder()
            .uri("/files/readme.txt")
            .header("if-none-match", &etag)
            .body(())
            .unwrap();
        let second = handler.handle(&req).await;
        assert_eq!(second.status(), 304);
    }
}
