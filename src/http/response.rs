//! HTTP response building module
//!
//! Provides builders for the status codes the dispatch layer can produce,
//! decoupled from specific content engines.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

/// Build 400 Bad Request response with an explanatory message
pub fn build_400_response(message: &str) -> Response<Full<Bytes>> {
    build_plain(400, format!("400 Bad Request: {message}"))
}

/// Build 403 Forbidden response
pub fn build_403_response(message: &str) -> Response<Full<Bytes>> {
    build_plain(403, format!("403 Forbidden: {message}"))
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_plain(404, "404 Not Found".to_string())
}

/// Build 500 Internal Server Error response carrying the error text
pub fn build_500_response(error: &str) -> Response<Full<Bytes>> {
    build_plain(500, error.to_string())
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(304)
        .header("ETag", etag)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build generic HTML response
pub fn build_html_response(content: String) -> Response<Full<Bytes>> {
    let content_length = content.len();
    Response::builder()
        .status(200)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Content-Length", content_length)
        .body(Full::new(Bytes::from(content)))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 200 response for typed content with an `ETag`
pub fn build_content_response(
    data: Bytes,
    content_type: &str,
    etag: &str,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    Response::builder()
        .status(200)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .header("ETag", etag)
        .body(Full::new(data))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build Atom feed response
pub fn build_atom_response(content: String) -> Response<Full<Bytes>> {
    let content_length = content.len();
    Response::builder()
        .status(200)
        .header("Content-Type", "application/atom+xml; charset=utf-8")
        .header("Content-Length", content_length)
        .body(Full::new(Bytes::from(content)))
        .unwrap_or_else(|e| {
            log_build_error("atom", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

fn build_plain(status: u16, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body.clone())))
        .unwrap_or_else(|e| {
            log_build_error("plain", &e);
            Response::new(Full::new(Bytes::from(body)))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    tracing::error!("failed to build {status} response: {error}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_responses_carry_status_and_text() {
        assert_eq!(build_404_response().status(), 404);
        assert_eq!(build_400_response("bad path").status(), 400);
        assert_eq!(build_500_response("boom").status(), 500);
        assert_eq!(build_403_response("origin").status(), 403);
    }

    #[test]
    fn html_response_sets_content_type() {
        let resp = build_html_response("<p>hi</p>".to_string());
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get("Content-Type").unwrap(),
            "text/html; charset=utf-8"
        );
    }
}
