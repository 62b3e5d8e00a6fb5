// src/server/mod.rs

//! Live-reload development server.
//!
//! Serves the distribution directory over plain HTTP. HTML responses get a
//! small client script injected that connects to the WebSocket at
//! [`RELOAD_WS_PATH`] and reacts to [`ReloadMessage`]s.

pub mod inject;
pub mod reload;

use std::path::PathBuf;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tower::ServiceExt;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::config::ServerSection;
use crate::errors::{Result, SitepipeError};
use crate::tasks::{TaskContext, TaskHandle};

pub use inject::inject_script;
pub use reload::{ReloadHub, ReloadMessage};

pub const RELOAD_WS_PATH: &str = "/__sitepipe/ws";
pub const LIVERELOAD_SCRIPT_PATH: &str = "/__sitepipe/livereload.js";

const LIVERELOAD_JS: &str = include_str!("livereload.js");

#[derive(Debug, Clone)]
struct ServerState {
    dist: PathBuf,
    reload: ReloadHub,
}

/// Build the dev server router for `dist`.
pub fn create_router(dist: PathBuf, reload: ReloadHub) -> Router {
    Router::new()
        .route(RELOAD_WS_PATH, get(reload_socket))
        .route(LIVERELOAD_SCRIPT_PATH, get(client_script))
        .fallback(serve_site)
        .layer(TraceLayer::new_for_http())
        .with_state(ServerState { dist, reload })
}

/// Bind the configured address. Port `0` picks a free port.
pub async fn bind(server: &ServerSection) -> Result<TcpListener> {
    let addr = format!("{}:{}", server.host, server.port);
    TcpListener::bind(&addr)
        .await
        .map_err(|source| SitepipeError::PortBind { addr, source })
}

/// Body of the `serve` task: bind, report readiness, then serve until the
/// process exits.
pub async fn run(ctx: &TaskContext, handle: &TaskHandle) -> Result<()> {
    let listener = bind(&ctx.config.server).await?;
    let url = format!("http://{}/", listener.local_addr()?);

    info!(%url, dist = ?ctx.paths.dist, "dev server listening");
    handle.ready().await;

    if ctx.config.server.open {
        open_browser(&url);
    }

    let app = create_router(ctx.paths.dist.clone(), ctx.reload.clone());
    axum::serve(listener, app).await?;
    Ok(())
}

/// Best effort; a missing opener only gets a warning.
pub fn open_browser(url: &str) {
    let mut cmd = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(windows) {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        std::process::Command::new("xdg-open")
    };

    if let Err(err) = cmd.arg(url).spawn() {
        warn!(%url, error = %err, "could not open browser");
    }
}

async fn client_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        LIVERELOAD_JS,
    )
}

async fn serve_site(State(state): State<ServerState>, req: Request) -> Response {
    let response = match ServeDir::new(&state.dist).oneshot(req).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let (mut parts, body) = response.into_parts();
    let is_html = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));

    if parts.status != StatusCode::OK || !is_html {
        return Response::from_parts(parts, Body::new(body));
    }

    let bytes = match axum::body::to_bytes(Body::new(body), usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to read HTML response body");
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    };

    let html = inject_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

async fn reload_socket(ws: WebSocketUpgrade, State(state): State<ServerState>) -> Response {
    let rx = state.reload.subscribe();
    ws.on_upgrade(move |socket| forward_reloads(socket, rx))
}

async fn forward_reloads(socket: WebSocket, mut rx: broadcast::Receiver<ReloadMessage>) {
    let (mut sender, mut receiver) = socket.split();
    debug!("live-reload client connected");

    loop {
        tokio::select! {
            message = rx.recv() => {
                let message = match message {
                    Ok(message) => message,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "live-reload client lagged; forcing full reload");
                        ReloadMessage::Reload
                    }
                    Err(RecvError::Closed) => break,
                };
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(error = %err, "failed to encode reload message");
                        continue;
                    }
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    }

    debug!("live-reload client disconnected");
}
