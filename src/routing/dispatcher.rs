//! Path prefix dispatch

use crate::handler::ContentHandler;

/// Per-host route table mapping declared path prefixes to handlers.
///
/// Registration happens once while the router builder walks the
/// configuration; after that the table is lookup-only.
#[derive(Debug, Default)]
pub struct PathDispatcher {
    routes: Vec<(String, ContentHandler)>,
}

impl PathDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, prefix: &str, handler: ContentHandler) {
        self.routes.push((prefix.to_string(), handler));
    }

    /// Find the handler for a request path.
    ///
    /// A pattern ending in `/` matches every path it is a prefix of; any
    /// other pattern matches exactly. When several patterns match, the
    /// longest one wins.
    pub fn lookup(&self, path: &str) -> Option<&ContentHandler> {
        let mut best: Option<&(String, ContentHandler)> = None;
        for route in &self.routes {
            let (pattern, _) = route;
            let matched = if pattern.ends_with('/') {
                path.starts_with(pattern.as_str())
            } else {
                path == pattern
            };
            if matched && best.is_none_or(|(b, _)| pattern.len() > b.len()) {
                best = Some(route);
            }
        }
        best.map(|(_, handler)| handler)
    }

    /// Registered prefixes, in registration order.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(prefix, _)| prefix.as_str())
    }
}
