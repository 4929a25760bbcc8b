use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use served::{config, routing, server};

const CONFIG_BASENAME: &str = "served.config";

/// Multi-site web server for static files, blogs and slides.
#[derive(Debug, Parser)]
#[command(name = "served", version)]
struct Args {
    /// Path to the configuration file.
    #[arg(long, env = "SERVED_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Rebuild document areas on every request (slow; for local editing).
    #[arg(long)]
    reload: bool,

    /// Log host and path for every request.
    #[arg(long)]
    log: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config_path = match args.config {
        Some(path) => path,
        None => config::locate_config_file(CONFIG_BASENAME),
    };

    let mut cfg = config::Config::load(&config_path)?;
    cfg.reload = args.reload;
    cfg.log_requests = args.log;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(cfg))
}

async fn run(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let servers = routing::build_servers(&cfg)?;

    for (addr, selector) in servers {
        let socket_addr = server::resolve_addr(&addr)?;
        let listener = server::create_reusable_listener(socket_addr)?;
        info!("serving on http://{socket_addr}");
        tokio::spawn(server::serve(listener, Arc::new(selector)));
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}
