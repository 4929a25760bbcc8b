//! Router builder
//!
//! Walks a validated configuration exactly once and produces the complete,
//! immutable routing structure for every listening address. No handler is
//! constructed after this pass, and nothing here is consulted again once
//! the listeners start accepting connections.

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use super::dispatcher::PathDispatcher;
use super::vhost::HostSelector;
use crate::config::{Config, HostSpec};
use crate::docs::{DocConfig, DocError, DocHandler};
use crate::handler::{AssetHandler, ContentHandler, StaticHandler};
use crate::play::{self, SocketHandler};
use crate::slides::{SlideConfig, SlideHandler};

/// Prefix under which the embedded documentation assets are served.
pub const ASSET_PREFIX: &str = "/lib/docs/";

/// Path of the interactive execution socket. Exact match, no prefix.
pub const SOCKET_PATH: &str = "/socket";

const EXECUTION_WARNING: &str = "\
WARNING!  WARNING!  WARNING!
Interactive code execution is enabled on a non-loopback address.
Anyone who can reach this address and port can run code on this
machine as the serving user. Listen on localhost or disable play
for this host to make this warning go away.
WARNING!  WARNING!  WARNING!";

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("blog {root} on host {hostname}: {source}")]
    Doc {
        root: String,
        hostname: String,
        source: DocError,
    },
}

/// Build the host selector for every listening address in the
/// configuration.
pub fn build_servers(config: &Config) -> Result<HashMap<String, HostSelector>, BuildError> {
    let mut servers = HashMap::new();
    for server in &config.servers {
        let selector = servers
            .entry(server.addr.clone())
            .or_insert_with(HostSelector::new);
        for host in &server.hosts {
            let dispatcher = build_host(config, &server.addr, host)?;
            selector.insert(&host.hostname, dispatcher);
        }
    }
    Ok(servers)
}

/// Build the route table for one host: its blog areas (plus their slide
/// sub-areas), the shared asset bundle and execution socket when
/// applicable, and its static vdirs.
fn build_host(config: &Config, addr: &str, host: &HostSpec) -> Result<PathDispatcher, BuildError> {
    let mut dispatcher = PathDispatcher::new();

    if host.play_enabled {
        play::enable_playback();
    }

    for blog in &host.blogs {
        if blog.disabled {
            warn!(
                "skipping disabled blog {} on host {}",
                blog.root, host.hostname
            );
            continue;
        }

        let base = blog.root.trim_end_matches('/').to_string();
        let folder = Path::new(&blog.folder);
        let content_dir = folder.join("content");
        let template_dir = folder.join("template");

        let doc_config = DocConfig {
            hostname: host.hostname.clone(),
            base_path: base.clone(),
            home_articles: usize::try_from(blog.home_articles).unwrap_or(0),
            feed_articles: usize::try_from(blog.feed_articles).unwrap_or(0),
            feed_title: blog.feed_title.clone(),
            play_enabled: host.play_enabled,
            content_dir: content_dir.clone(),
            template_dir: template_dir.clone(),
        };
        let docs = DocHandler::new(doc_config, config.reload).map_err(|source| {
            BuildError::Doc {
                root: blog.root.clone(),
                hostname: host.hostname.clone(),
                source,
            }
        })?;
        dispatcher.register(
            &blog.root,
            ContentHandler::Docs(docs).logged(config.log_requests),
        );

        let slide_config = SlideConfig {
            content_dir,
            template_dir,
            base_path: format!("{base}/slides"),
            play_enabled: host.play_enabled,
        };
        dispatcher.register(
            &format!("{base}/slides/"),
            ContentHandler::Slides(SlideHandler::new(slide_config)).logged(config.log_requests),
        );
    }

    if !host.blogs.is_empty() {
        dispatcher.register(
            ASSET_PREFIX,
            ContentHandler::Assets(AssetHandler::new(ASSET_PREFIX)).logged(config.log_requests),
        );

        if host.play_enabled {
            let origin = socket_origin(addr, &host.hostname);
            if !is_loopback_host(&origin) && !host.native_client {
                warn!("{EXECUTION_WARNING}");
            }
            dispatcher.register(
                SOCKET_PATH,
                ContentHandler::Play(SocketHandler::new(&origin, host.native_client))
                    .logged(config.log_requests),
            );
        }
    }

    for vdir in &host.vdirs {
        if vdir.disabled {
            warn!(
                "skipping disabled vdir {} on host {}",
                vdir.root, host.hostname
            );
            continue;
        }
        dispatcher.register(
            &vdir.root,
            ContentHandler::Static(StaticHandler::new(&vdir.folder, &vdir.root))
                .logged(config.log_requests),
        );
    }

    Ok(dispatcher)
}

/// Derive the origin the execution socket trusts: the configured hostname
/// when present, the listening address's host otherwise, plus the listening
/// port (defaulting to 80).
pub(crate) fn socket_origin(addr: &str, hostname: &str) -> String {
    let (addr_host, port) = match addr.rsplit_once(':') {
        Some((host, port)) => (host, port),
        None => (addr, "80"),
    };
    let host = if hostname.is_empty() {
        if addr_host.is_empty() {
            "localhost"
        } else {
            addr_host
        }
    } else {
        hostname
    };
    format!("{host}:{port}")
}

/// Whether an origin's host part only resolves locally.
pub(crate) fn is_loopback_host(origin: &str) -> bool {
    let host = origin.rsplit_once(':').map_or(origin, |(h, _)| h);
    host.starts_with("127.") || host == "localhost" || host == "::1" || host == "[::1]"
}
