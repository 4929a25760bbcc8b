//! Slide/presentation area module
//!
//! The slides collaborator: serves a presentation folder, routing
//! `.slide` and `.article` sources through the presentation templates and
//! everything else straight from disk. Paths containing a hidden segment
//! (leading period) are rejected before touching the filesystem.
//!
//! Templates are read per request, so a template edit shows up on the next
//! page load; a missing or unreadable template surfaces as a 500 carrying
//! the error text.

use std::fmt::Write as _;
use std::path::PathBuf;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response};

use crate::docs::escape_html;
use crate::handler::StaticHandler;
use crate::http;

const SLIDES_TEMPLATE: &str = "slides.tmpl";
const ARTICLE_TEMPLATE: &str = "article.tmpl";

#[derive(Debug, Clone)]
pub struct SlideConfig {
    pub content_dir: PathBuf,
    pub template_dir: PathBuf,
    /// Base URL path relative to server root, no trailing slash.
    pub base_path: String,
    pub play_enabled: bool,
}

/// Serves one presentation area.
#[derive(Debug)]
pub struct SlideHandler {
    config: SlideConfig,
    files: StaticHandler,
}

impl SlideHandler {
    pub fn new(config: SlideConfig) -> Self {
        let files = StaticHandler::new(&config.content_dir.to_string_lossy(), "/");
        Self { config, files }
    }

    pub async fn handle<B>(&self, req: &Request<B>) -> Response<Full<Bytes>> {
        let path = req.uri().path();
        let relative = path
            .strip_prefix(self.config.base_path.as_str())
            .unwrap_or(path)
            .trim_start_matches('/');

        if contains_special_file(relative) {
            return http::build_400_response("path not allowed");
        }

        match doc_template(relative) {
            Some(template) => match self.render_doc(relative, template).await {
                Ok(html) => http::response::build_html_response(html),
                Err(e) => http::build_500_response(&e),
            },
            None => {
                let if_none_match = req
                    .headers()
                    .get("if-none-match")
                    .and_then(|v| v.to_str().ok());
                self.files.serve(relative, if_none_match).await
            }
        }
    }

    /// Read a presentation source and run it through its template.
    async fn render_doc(&self, relative: &str, template: &str) -> Result<String, String> {
        let source = tokio::fs::read_to_string(self.config.content_dir.join(relative))
            .await
            .map_err(|e| format!("unable to read {relative}: {e}"))?;
        let template_path = self.config.template_dir.join(template);
        let template = tokio::fs::read_to_string(&template_path)
            .await
            .map_err(|e| format!("unable to read template {}: {e}", template_path.display()))?;

        let doc = parse_doc(&source).map_err(|e| format!("unable to parse {relative}: {e}"))?;
        Ok(template
            .replace("{{title}}", &escape_html(&doc.title))
            .replace("{{base}}", &self.config.base_path)
            .replace("{{sections}}", &doc.sections_html))
    }
}

/// Which template renders this path, if any.
fn doc_template(path: &str) -> Option<&'static str> {
    match std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
    {
        Some("slide") => Some(SLIDES_TEMPLATE),
        Some("article") => Some(ARTICLE_TEMPLATE),
        _ => None,
    }
}

/// Reports whether the path contains an element starting with a period.
/// The name is always delimited by forward slashes at this point.
fn contains_special_file(name: &str) -> bool {
    name.split('/').any(|part| part.starts_with('.'))
}

struct ParsedDoc {
    title: String,
    sections_html: String,
}

/// Presentation source format: first line is the title, then header lines
/// up to the first blank line; each line starting with `* ` opens a new
/// section whose following lines become its body.
fn parse_doc(source: &str) -> Result<ParsedDoc, String> {
    let mut lines = source.lines();
    let title = lines.next().unwrap_or("").trim().to_string();
    if title.is_empty() {
        return Err("empty title".to_string());
    }
    for line in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }
    }

    let mut sections_html = String::new();
    let mut heading: Option<String> = None;
    let mut body = String::new();
    let mut flush = |heading: &Option<String>, body: &str, out: &mut String| {
        if let Some(h) = heading {
            let _ = writeln!(
                out,
                "<div class=\"slide\"><h2>{}</h2><p>{}</p></div>",
                escape_html(h),
                escape_html(body.trim()),
            );
        }
    };

    for line in lines {
        if let Some(rest) = line.strip_prefix("* ") {
            flush(&heading, &body, &mut sections_html);
            heading = Some(rest.trim().to_string());
            body.clear();
        } else if heading.is_some() {
            if !body.is_empty() {
                body.push(' ');
            }
            body.push_str(line.trim());
        }
    }
    flush(&heading, &body, &mut sections_html);

    Ok(ParsedDoc {
        title,
        sections_html,
    })
}
