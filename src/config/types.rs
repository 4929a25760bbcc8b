//! Configuration types module
//!
//! Defines the site topology: servers (listening addresses) containing
//! hosts (virtual domains) containing path-prefixed content areas.

use serde::Deserialize;

/// Top-level configuration: the list of servers plus runtime switches.
///
/// `reload` and `log_requests` are not part of the configuration file;
/// they come from the command line and are threaded explicitly into the
/// router builder rather than read from ambient process state.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(rename = "Servers")]
    pub servers: Vec<ServerSpec>,

    /// Rebuild document areas on every request (slow; for local editing).
    #[serde(skip)]
    pub reload: bool,

    /// Log host and path for every request.
    #[serde(skip)]
    pub log_requests: bool,
}

/// One web server serving on a particular address.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSpec {
    /// Address to serve on, e.g. ":8080" or "127.0.0.1:8080".
    #[serde(rename = "Addr", default)]
    pub addr: String,

    /// Hosts served at this address.
    #[serde(rename = "Hosts", default)]
    pub hosts: Vec<HostSpec>,
}

/// The content areas served on a given hostname.
#[derive(Debug, Deserialize, Clone)]
pub struct HostSpec {
    #[serde(rename = "Hostname")]
    pub hostname: String,

    /// Virtual directories serving static files.
    #[serde(rename = "VDirs", default)]
    pub vdirs: Vec<VDirSpec>,

    /// Rendered article/blog areas.
    #[serde(rename = "Blogs", default)]
    pub blogs: Vec<BlogSpec>,

    /// Whether running code from the browser is enabled for this host.
    #[serde(rename = "PlayEnabled", default)]
    pub play_enabled: bool,

    /// Whether submitted code is constrained to the portable sandbox
    /// target instead of the host's native one.
    #[serde(rename = "NativeClient", default)]
    pub native_client: bool,
}

/// A virtual directory for serving static files.
#[derive(Debug, Deserialize, Clone)]
pub struct VDirSpec {
    /// Root of the vdir on the web server.
    #[serde(rename = "Root")]
    pub root: String,

    /// Folder on disk.
    #[serde(rename = "Folder")]
    pub folder: String,

    /// Parsed but excluded from dispatch when set.
    #[serde(rename = "Disabled", default)]
    pub disabled: bool,
}

/// A rendered article/blog area. The backing folder is expected to contain
/// `content/` and `template/` subfolders.
#[derive(Debug, Deserialize, Clone)]
pub struct BlogSpec {
    /// Root of the blog on the web server.
    #[serde(rename = "Root")]
    pub root: String,

    /// Folder on disk.
    #[serde(rename = "Folder")]
    pub folder: String,

    /// How many articles to show on the home page.
    #[serde(rename = "HomeArticles", default)]
    pub home_articles: i32,

    /// How many articles to include in the Atom feed.
    #[serde(rename = "FeedArticles", default)]
    pub feed_articles: i32,

    /// Title of the Atom feed.
    #[serde(rename = "FeedTitle", default)]
    pub feed_title: String,

    /// Parsed but excluded from dispatch when set.
    #[serde(rename = "Disabled", default)]
    pub disabled: bool,
}

impl HostSpec {
    /// Count of content areas that will actually be registered.
    pub fn enabled_area_count(&self) -> usize {
        self.vdirs.iter().filter(|v| !v.disabled).count()
            + self.blogs.iter().filter(|b| !b.disabled).count()
    }
}
