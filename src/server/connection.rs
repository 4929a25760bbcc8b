//! Connection handling
//!
//! One accept loop per listening address. Each accepted connection is
//! served on its own task; requests on it are routed through the address's
//! shared host selector. Connections are held open as long as the client
//! keeps them; there is no server-side timeout.

use std::convert::Infallible;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error};

use crate::routing::HostSelector;

/// Accept connections forever, dispatching every request through
/// `selector`.
pub async fn serve(listener: TcpListener, selector: Arc<HostSelector>) {
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("failed to accept connection: {e}");
                continue;
            }
        };

        let selector = Arc::clone(&selector);
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let selector = Arc::clone(&selector);
                async move { Ok::<_, Infallible>(selector.dispatch(req).await) }
            });

            let conn = http1::Builder::new()
                .serve_connection(io, service)
                .with_upgrades();
            if let Err(e) = conn.await {
                debug!("connection from {peer_addr} ended: {e}");
            }
        });
    }
}
