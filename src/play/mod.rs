//! Interactive execution socket module
//!
//! The playground collaborator boundary: a single WebSocket upgrade
//! endpoint through which snippets are submitted and run results streamed
//! back. Execution itself is delegated to an external runner process; this
//! module owns the handshake, the message protocol, and the runner
//! environment overlay.

use std::collections::HashMap;
use std::env;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{error, warn};

/// Environment variable naming the snippet runner executable.
const RUNNER_ENV: &str = "SERVED_PLAY_RUNNER";

/// Target handed to the runner when the portable sandbox is requested.
pub const PORTABLE_TARGET: &str = "wasm32-wasip1";

/// Process-wide switch permitting code-execution playback. Set once by the
/// router builder before any listener starts accepting connections.
static PLAY_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn enable_playback() {
    PLAY_ENABLED.store(true, Ordering::Relaxed);
}

pub fn playback_enabled() -> bool {
    PLAY_ENABLED.load(Ordering::Relaxed)
}

/// One message in either direction on the socket.
///
/// Client to server: `run` (body is the snippet) and `kill`. Server to
/// client: `stdout`, `stderr`, and `end`.
#[derive(Debug, Serialize, Deserialize)]
struct SocketMessage {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Kind")]
    kind: String,
    #[serde(rename = "Body", default)]
    body: String,
}

/// The upgrade endpoint for one host.
#[derive(Debug, Clone)]
pub struct SocketHandler {
    origin: String,
    native_client: bool,
}

impl SocketHandler {
    /// `origin` is the host:port this handler trusts in the browser's
    /// Origin header.
    pub fn new(origin: &str, native_client: bool) -> Self {
        Self {
            origin: origin.to_string(),
            native_client,
        }
    }

    /// Environment overlay applied to every runner invocation. The
    /// portable sandbox constrains execution to a fixed target instead of
    /// the host's native one.
    pub fn environ(&self) -> Vec<(String, String)> {
        if self.native_client {
            vec![("PLAY_TARGET".to_string(), PORTABLE_TARGET.to_string())]
        } else {
            Vec::new()
        }
    }

    pub fn handle<B>(&self, mut req: Request<B>) -> Response<Full<Bytes>> {
        if !playback_enabled() {
            return crate::http::build_404_response();
        }

        let origin_ok = req
            .headers()
            .get("origin")
            .and_then(|v| v.to_str().ok())
            .map(|o| o.split("://").last().unwrap_or(o) == self.origin)
            .unwrap_or(false);
        if !origin_ok {
            return crate::http::build_403_response("origin not allowed");
        }

        let is_upgrade = req
            .headers()
            .get("upgrade")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|u| u.eq_ignore_ascii_case("websocket"));
        let Some(key) = req
            .headers()
            .get("sec-websocket-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
        else {
            return crate::http::build_400_response("websocket upgrade required");
        };
        if !is_upgrade {
            return crate::http::build_400_response("websocket upgrade required");
        }

        let accept = derive_accept_key(key.as_bytes());
        let overlay = self.environ();
        let upgrade = hyper::upgrade::on(&mut req);
        tokio::spawn(async move {
            match upgrade.await {
                Ok(upgraded) => {
                    let ws = WebSocketStream::from_raw_socket(
                        TokioIo::new(upgraded),
                        Role::Server,
                        None,
                    )
                    .await;
                    if let Err(e) = run_session(ws, overlay).await {
                        warn!("socket session ended with error: {e}");
                    }
                }
                Err(e) => error!("socket upgrade failed: {e}"),
            }
        });

        Response::builder()
            .status(101)
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Sec-WebSocket-Accept", accept)
            .body(Full::new(Bytes::new()))
            .unwrap_or_else(|e| {
                error!("failed to build 101 response: {e}");
                Response::new(Full::new(Bytes::new()))
            })
    }
}

/// Pump one socket session: run commands start snippet tasks whose output
/// events are multiplexed back over the socket; kill aborts a running
/// snippet.
async fn run_session<S>(
    ws: WebSocketStream<S>,
    overlay: Vec<(String, String)>,
) -> Result<(), tokio_tungstenite::tungstenite::Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = ws.split();
    let (tx, mut rx) = mpsc::channel::<SocketMessage>(32);
    let mut runs: HashMap<String, AbortHandle> = HashMap::new();

    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                if let Ok(text) = serde_json::to_string(&event) {
                    sink.send(Message::text(text)).await?;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(msg) = serde_json::from_str::<SocketMessage>(&text) else {
                            warn!("ignoring malformed socket message");
                            continue;
                        };
                        match msg.kind.as_str() {
                            "run" => {
                                let task = tokio::spawn(run_snippet(
                                    msg.id.clone(),
                                    msg.body,
                                    overlay.clone(),
                                    tx.clone(),
                                ));
                                runs.insert(msg.id, task.abort_handle());
                            }
                            "kill" => {
                                if let Some(handle) = runs.remove(&msg.id) {
                                    handle.abort();
                                }
                            }
                            other => warn!("unknown socket command: {other}"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e),
                }
            }
        }
    }

    for (_, handle) in runs {
        handle.abort();
    }
    Ok(())
}

/// Run one snippet through the configured runner, streaming its output.
async fn run_snippet(
    id: String,
    body: String,
    overlay: Vec<(String, String)>,
    tx: mpsc::Sender<SocketMessage>,
) {
    let send = |kind: &str, body: String| {
        let tx = tx.clone();
        let id = id.clone();
        let kind = kind.to_string();
        async move {
            let _ = tx.send(SocketMessage { id, kind, body }).await;
        }
    };

    let Ok(runner) = env::var(RUNNER_ENV) else {
        send(
            "stderr",
            format!("interactive execution runner not configured (set {RUNNER_ENV})"),
        )
        .await;
        send("end", String::new()).await;
        return;
    };

    let mut child = match Command::new(&runner)
        .envs(overlay)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            send("stderr", format!("unable to start runner {runner}: {e}")).await;
            send("end", String::new()).await;
            return;
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(body.as_bytes()).await;
        // Dropping stdin closes the pipe so the runner sees EOF.
    }

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_task = pump_lines("stdout", stdout, id.clone(), tx.clone());
    let err_task = pump_lines("stderr", stderr, id.clone(), tx.clone());
    tokio::join!(out_task, err_task);

    let _ = child.wait().await;
    send("end", String::new()).await;
}

async fn pump_lines<R>(
    kind: &'static str,
    reader: Option<R>,
    id: String,
    tx: mpsc::Sender<SocketMessage>,
) where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else { return };
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let _ = tx
            .send(SocketMessage {
                id: id.clone(),
                kind: kind.to_string(),
                body: line,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upgrade_request(origin: &str) -> Request<()> {
        Request::builder()
            .uri("/socket")
            .header("origin", origin)
            .header("upgrade", "websocket")
            .header("connection", "Upgrade")
            .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
            .header("sec-websocket-version", "13")
            .body(())
            .unwrap()
    }

    #[tokio::test]
    async fn handshake_is_gated_on_origin_and_upgrade() {
        enable_playback();
        let handler = SocketHandler::new("127.0.0.1:8080", false);

        let resp = handler.handle(upgrade_request("http://evil.test"));
        assert_eq!(resp.status(), 403);

        let plain = Request::builder()
            .uri("/socket")
            .header("origin", "http://127.0.0.1:8080")
            .body(())
            .unwrap();
        assert_eq!(handler.handle(plain).status(), 400);

        let resp = handler.handle(upgrade_request("http://127.0.0.1:8080"));
        assert_eq!(resp.status(), 101);
        assert!(resp.headers().contains_key("Sec-WebSocket-Accept"));
    }

    #[test]
    fn portable_sandbox_sets_target_overlay() {
        let native = SocketHandler::new("127.0.0.1:8080", true);
        assert_eq!(
            native.environ(),
            vec![("PLAY_TARGET".to_string(), PORTABLE_TARGET.to_string())]
        );

        let host = SocketHandler::new("127.0.0.1:8080", false);
        assert!(host.environ().is_empty());
    }
}
