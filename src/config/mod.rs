//! Configuration module entry point
//!
//! Loads and validates the JSON site configuration. The validated model is
//! immutable for the remainder of the process; every later stage only reads
//! it.

mod types;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

pub use types::{BlogSpec, Config, HostSpec, ServerSpec, VDirSpec};

/// Configuration errors. All of these are fatal at startup: the process
/// exits before any listener starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read configuration file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("unable to parse configuration file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("no Hosts specified for server \"{addr}\"")]
    NoHosts { addr: String },

    #[error("invalid empty Hostname")]
    EmptyHostname,

    #[error("invalid {kind} {field} for host \"{hostname}\": empty")]
    EmptyField {
        kind: &'static str,
        field: &'static str,
        hostname: String,
    },

    #[error("invalid blog {field} for host \"{hostname}\": {value}")]
    BadArticleCount {
        field: &'static str,
        hostname: String,
        value: i32,
    },

    #[error("no enabled VDirs or Blogs for host \"{hostname}\"")]
    NoAreas { hostname: String },
}

/// Determine where the config file should be found based on the location
/// of the current executable, rewriting `/usr/bin/` or `/bin/` to `/etc/`.
pub fn locate_config_file(basename: &str) -> PathBuf {
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    let mut dir = exe_dir.to_string_lossy().into_owned();
    if !dir.ends_with('/') {
        dir.push('/');
    }
    if dir.starts_with("/usr/bin/") {
        dir = dir.replacen("/usr/bin/", "/etc/", 1);
    } else {
        dir = dir.replacen("/bin/", "/etc/", 1);
    }

    PathBuf::from(dir).join(basename)
}

impl Config {
    /// Load and validate the configuration file at the given location.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Self =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the topology and normalize whitespace in place.
    ///
    /// The trimmed values are written back into the stored specs so that
    /// the router builder always sees normalized roots, folders, and
    /// hostnames. A missing on-disk folder is only a warning: the content
    /// may be populated before first use.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        for server in &mut self.servers {
            server.addr = server.addr.trim().to_string();
            if server.addr.is_empty() {
                server.addr = ":8080".to_string();
            }
            if server.hosts.is_empty() {
                return Err(ConfigError::NoHosts {
                    addr: server.addr.clone(),
                });
            }

            for host in &mut server.hosts {
                host.hostname = host.hostname.trim().to_string();
                if host.hostname.is_empty() {
                    return Err(ConfigError::EmptyHostname);
                }

                for vdir in &mut host.vdirs {
                    vdir.root = vdir.root.trim().to_string();
                    vdir.folder = vdir.folder.trim().to_string();
                    validate_area("vdir", &vdir.root, &vdir.folder, &host.hostname)?;
                }

                for blog in &mut host.blogs {
                    blog.root = blog.root.trim().to_string();
                    blog.folder = blog.folder.trim().to_string();
                    validate_area("blog", &blog.root, &blog.folder, &host.hostname)?;
                    if blog.home_articles <= 0 {
                        return Err(ConfigError::BadArticleCount {
                            field: "HomeArticles",
                            hostname: host.hostname.clone(),
                            value: blog.home_articles,
                        });
                    }
                    if blog.feed_articles <= 0 {
                        return Err(ConfigError::BadArticleCount {
                            field: "FeedArticles",
                            hostname: host.hostname.clone(),
                            value: blog.feed_articles,
                        });
                    }
                }

                if host.enabled_area_count() == 0 {
                    return Err(ConfigError::NoAreas {
                        hostname: host.hostname.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn validate_area(
    kind: &'static str,
    root: &str,
    folder: &str,
    hostname: &str,
) -> Result<(), ConfigError> {
    if folder.is_empty() {
        return Err(ConfigError::EmptyField {
            kind,
            field: "Folder",
            hostname: hostname.to_string(),
        });
    }
    if root.is_empty() {
        return Err(ConfigError::EmptyField {
            kind,
            field: "Root",
            hostname: hostname.to_string(),
        });
    }
    if fs::metadata(folder).is_err() {
        warn!("cannot stat folder \"{folder}\" for host \"{hostname}\"");
    }
    Ok(())
}
