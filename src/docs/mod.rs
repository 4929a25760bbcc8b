//! Rendered document area module
//!
//! The documents collaborator: given a content/template folder pair and
//! per-area metadata, builds a handler for an article/blog area. Article
//! sources are `*.article` files whose first line is the title and whose
//! optional second line is a display date; file names order the collection,
//! newest (greatest) first.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response};

use crate::handler::StaticHandler;
use crate::http;

const HOME_TEMPLATE: &str = "home.tmpl";
const ARTICLE_TEMPLATE: &str = "article.tmpl";
const FEED_PATH: &str = "feed.atom";

/// Everything a document area needs to rebuild itself from disk.
#[derive(Debug, Clone)]
pub struct DocConfig {
    pub hostname: String,
    /// Base URL path relative to server root, no trailing slash.
    pub base_path: String,
    pub home_articles: usize,
    pub feed_articles: usize,
    pub feed_title: String,
    pub play_enabled: bool,
    pub content_dir: PathBuf,
    pub template_dir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("missing template {name} in {dir}")]
    MissingTemplate { name: &'static str, dir: String },

    #[error("unable to read content folder {dir}: {source}")]
    ReadContent {
        dir: String,
        source: std::io::Error,
    },

    #[error("invalid article {path}: empty title")]
    EmptyTitle { path: String },
}

/// One parsed article.
#[derive(Debug, Clone)]
struct Article {
    slug: String,
    title: String,
    date: String,
    body_html: String,
}

/// A fully built document area: parsed articles plus loaded templates.
#[derive(Debug)]
pub struct DocServer {
    config: DocConfig,
    home_template: String,
    article_template: String,
    articles: Vec<Article>,
    files: StaticHandler,
}

/// The two lifecycle modes of a document area.
///
/// `Cached` parses once at construction; `Reload` re-parses the backing
/// folder on every request and turns a parse failure into a 500 response
/// instead of a process fatal.
#[derive(Debug)]
pub enum DocHandler {
    Cached(Arc<DocServer>),
    Reload(DocConfig),
}

impl DocHandler {
    pub fn new(config: DocConfig, reload: bool) -> Result<Self, DocError> {
        if reload {
            Ok(Self::Reload(config))
        } else {
            Ok(Self::Cached(Arc::new(DocServer::new(config)?)))
        }
    }

    pub async fn handle<B>(&self, req: &Request<B>) -> Response<Full<Bytes>> {
        let path = req.uri().path().to_string();
        let if_none_match = req
            .headers()
            .get("if-none-match")
            .and_then(|v| v.to_str().ok());

        match self {
            Self::Cached(server) => server.respond(&path, if_none_match).await,
            Self::Reload(config) => match DocServer::new(config.clone()) {
                Ok(server) => server.respond(&path, if_none_match).await,
                Err(e) => http::build_500_response(&e.to_string()),
            },
        }
    }
}

impl DocServer {
    /// Parse the content folder and load the templates. Fails when a
    /// required template resource is missing, which is fatal in cached
    /// mode.
    pub fn new(config: DocConfig) -> Result<Self, DocError> {
        let home_template = load_template(&config, HOME_TEMPLATE)?;
        let article_template = load_template(&config, ARTICLE_TEMPLATE)?;
        let articles = parse_articles(&config)?;
        let files = StaticHandler::new(
            &config.content_dir.to_string_lossy(),
            "/",
        );
        Ok(Self {
            config,
            home_template,
            article_template,
            articles,
            files,
        })
    }

    async fn respond(
        &self,
        path: &str,
        if_none_match: Option<&str>,
    ) -> Response<Full<Bytes>> {
        let relative = path
            .strip_prefix(self.config.base_path.as_str())
            .unwrap_or(path)
            .trim_start_matches('/');

        if relative.is_empty() {
            return http::response::build_html_response(self.render_home());
        }
        if relative == FEED_PATH {
            return http::response::build_atom_response(self.render_feed());
        }
        if let Some(article) = self.articles.iter().find(|a| a.slug == relative) {
            return http::response::build_html_response(self.render_article(article));
        }

        // Anything else is supporting content (images, downloads) served
        // straight from the content folder.
        self.files.serve(relative, if_none_match).await
    }

    fn render_home(&self) -> String {
        let mut listing = String::new();
        for article in self.articles.iter().take(self.config.home_articles) {
            let _ = writeln!(
                listing,
                "<li><a href=\"{}/{}\">{}</a> <span class=\"article-date\">{}</span></li>",
                self.config.base_path,
                article.slug,
                escape_html(&article.title),
                escape_html(&article.date),
            );
        }
        self.home_template
            .replace("{{title}}", &escape_html(&self.config.feed_title))
            .replace("{{base}}", &self.config.base_path)
            .replace("{{articles}}", &listing)
    }

    fn render_article(&self, article: &Article) -> String {
        self.article_template
            .replace("{{title}}", &escape_html(&article.title))
            .replace("{{date}}", &escape_html(&article.date))
            .replace("{{base}}", &self.config.base_path)
            .replace("{{content}}", &article.body_html)
    }

    fn render_feed(&self) -> String {
        let site = format!("http://{}{}", self.config.hostname, self.config.base_path);
        let mut feed = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        feed.push_str("<feed xmlns=\"http://www.w3.org/2005/Atom\">\n");
        let _ = writeln!(feed, "<title>{}</title>", escape_xml(&self.config.feed_title));
        let _ = writeln!(feed, "<id>{site}/</id>");
        let _ = writeln!(feed, "<link href=\"{site}/\"/>");
        for article in self.articles.iter().take(self.config.feed_articles) {
            feed.push_str("<entry>\n");
            let _ = writeln!(feed, "<title>{}</title>", escape_xml(&article.title));
            let _ = writeln!(feed, "<id>{site}/{}</id>", article.slug);
            let _ = writeln!(feed, "<link href=\"{site}/{}\"/>", article.slug);
            let _ = writeln!(
                feed,
                "<content type=\"html\">{}</content>",
                escape_xml(&article.body_html)
            );
            feed.push_str("</entry>\n");
        }
        feed.push_str("</feed>\n");
        feed
    }
}

fn load_template(config: &DocConfig, name: &'static str) -> Result<String, DocError> {
    fs::read_to_string(config.template_dir.join(name)).map_err(|_| DocError::MissingTemplate {
        name,
        dir: config.template_dir.display().to_string(),
    })
}

fn parse_articles(config: &DocConfig) -> Result<Vec<Article>, DocError> {
    let entries = fs::read_dir(&config.content_dir).map_err(|source| DocError::ReadContent {
        dir: config.content_dir.display().to_string(),
        source,
    })?;

    let mut articles = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("article") {
            continue;
        }
        let text = fs::read_to_string(&path).map_err(|source| DocError::ReadContent {
            dir: path.display().to_string(),
            source,
        })?;
        let slug = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        articles.push(parse_article(&slug, &text, &path)?);
    }

    // File names carry the date prefix by convention; greatest first.
    articles.sort_by(|a, b| b.slug.cmp(&a.slug));
    Ok(articles)
}

fn parse_article(slug: &str, text: &str, path: &std::path::Path) -> Result<Article, DocError> {
    let mut lines = text.lines();
    let title = lines.next().unwrap_or("").trim().to_string();
    if title.is_empty() {
        return Err(DocError::EmptyTitle {
            path: path.display().to_string(),
        });
    }

    // Remaining header lines up to the first blank line; the first one is
    // the display date when present.
    let mut date = String::new();
    for line in lines.by_ref() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if date.is_empty() {
            date = line.to_string();
        }
    }

    let body: Vec<&str> = lines.collect();
    Ok(Article {
        slug: slug.to_string(),
        title,
        date,
        body_html: render_paragraphs(&body),
    })
}

/// Turn blank-line separated source text into escaped HTML paragraphs.
fn render_paragraphs(lines: &[&str]) -> String {
    let mut html = String::new();
    let mut paragraph = String::new();
    for line in lines.iter().chain(std::iter::once(&"")) {
        if line.trim().is_empty() {
            if !paragraph.is_empty() {
                let _ = writeln!(html, "<p>{}</p>", escape_html(paragraph.trim()));
                paragraph.clear();
            }
        } else {
            if !paragraph.is_empty() {
                paragraph.push(' ');
            }
            paragraph.push_str(line.trim());
        }
    }
    html
}

pub(crate) fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escape_xml(s: &str) -> String {
    escape_html(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, DocConfig) {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        let template = dir.path().join("template");
        std_fs::create_dir(&content).unwrap();
        std_fs::create_dir(&template).unwrap();

        std_fs::write(
            content.join("2024-01-05-first.article"),
            "First Post\n5 Jan 2024\n\nHello world.\n\nSecond paragraph.\n",
        )
        .unwrap();
        std_fs::write(
            content.join("2024-03-10-second.article"),
            "Second Post\n10 Mar 2024\n\nNewer text.\n",
        )
        .unwrap();
        std_fs::write(
            template.join("home.tmpl"),
            "<html><h1>{{title}}</h1><ul>{{articles}}</ul></html>",
        )
        .unwrap();
        std_fs::write(
            template.join("article.tmpl"),
            "<html><h1>{{title}}</h1>{{content}}</html>",
        )
        .unwrap();

        let config = DocConfig {
            hostname: "example.test".to_string(),
            base_path: "/blog".to_string(),
            home_articles: 1,
            feed_articles: 2,
            feed_title: "Example Blog".to_string(),
            play_enabled: false,
            content_dir: content,
            template_dir: template,
        };
        (dir, config)
    }

    fn request(path: &str) -> Request<()> {
        Request::builder().uri(path).body(()).unwrap()
    }

    async fn body_text(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn home_lists_newest_articles_up_to_limit() {
        let (_dir, config) = fixture();
        let handler = DocHandler::new(config, false).unwrap();
        let resp = handler.handle(&request("/blog/")).await;
        assert_eq!(resp.status(), 200);
        let body = body_text(resp).await;
        assert!(body.contains("Second Post"));
        // home_articles is 1, so the older article is not listed
        assert!(!body.contains("First Post"));
    }

    #[tokio::test]
    async fn article_page_renders_through_template() {
        let (_dir, config) = fixture();
        let handler = DocHandler::new(config, false).unwrap();
        let resp = handler.handle(&request("/blog/2024-01-05-first")).await;
        assert_eq!(resp.status(), 200);
        let body = body_text(resp).await;
        assert!(body.contains("<h1>First Post</h1>"));
        assert!(body.contains("<p>Hello world.</p>"));
        assert!(body.contains("<p>Second paragraph.</p>"));
    }

    #[tokio::test]
    async fn feed_contains_feed_articles_entries() {
        let (_dir, config) = fixture();
        let handler = DocHandler::new(config, false).unwrap();
        let resp = handler.handle(&request("/blog/feed.atom")).await;
        assert_eq!(resp.status(), 200);
        let body = body_text(resp).await;
        assert!(body.contains("<title>Example Blog</title>"));
        assert!(body.contains("2024-01-05-first"));
        assert!(body.contains("2024-03-10-second"));
    }

    #[tokio::test]
    async fn missing_template_is_a_construction_error() {
        let (_dir, config) = fixture();
        std_fs::remove_file(config.template_dir.join("home.tmpl")).unwrap();
        assert!(matches!(
            DocServer::new(config),
            Err(DocError::MissingTemplate { name: "home.tmpl", .. })
        ));
    }

    #[tokio::test]
    async fn reload_mode_sees_new_content_without_restart() {
        let (_dir, config) = fixture();
        let content_dir = config.content_dir.clone();
        let handler = DocHandler::new(config, true).unwrap();

        let before = body_text(handler.handle(&request("/blog/2024-03-10-second")).await).await;
        assert!(before.contains("Newer text."));

        std_fs::write(
            content_dir.join("2024-03-10-second.article"),
            "Second Post\n10 Mar 2024\n\nEdited text.\n",
        )
        .unwrap();

        let after = body_text(handler.handle(&request("/blog/2024-03-10-second")).await).await;
        assert!(after.contains("Edited text."));
    }

    #[tokio::test]
    async fn cached_mode_keeps_content_as_of_construction() {
        let (_dir, config) = fixture();
        let content_dir = config.content_dir.clone();
        let handler = DocHandler::new(config, false).unwrap();

        std_fs::write(
            content_dir.join("2024-03-10-second.article"),
            "Second Post\n10 Mar 2024\n\nEdited text.\n",
        )
        .unwrap();

        let body = body_text(handler.handle(&request("/blog/2024-03-10-second")).await).await;
        assert!(body.contains("Newer text."));
        assert!(!body.contains("Edited text."));
    }

    #[tokio::test]
    async fn reload_mode_parse_failure_yields_500() {
        let (_dir, config) = fixture();
        let template_dir = config.template_dir.clone();
        let handler = DocHandler::new(config, true).unwrap();
        std_fs::remove_file(template_dir.join("article.tmpl")).unwrap();

        let resp = handler.handle(&request("/blog/")).await;
        assert_eq!(resp.status(), 500);
        let body = body_text(resp).await;
        assert!(body.contains("article.tmpl"));
    }
}
