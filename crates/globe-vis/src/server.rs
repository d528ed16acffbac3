//! Axum web server with WebSocket streaming for the render surface.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

use crate::assets::Texture;
use crate::diagnostics::{DiagnosticEntry, DiagnosticLog};
use crate::frame::SceneFrame;
use crate::readiness::Phase;
use globe_scene::{css_color, ArcId, SceneStats, ARC_COLOR, EARTH_RADIUS, GLOW_COLOR};
use globe_stream::ConnectionState;

/// Shared application state.
pub struct AppState {
    frames: watch::Receiver<SceneFrame>,
    texture: watch::Receiver<Option<Texture>>,
    diagnostics: DiagnosticLog,
}

impl AppState {
    pub fn new(
        frames: watch::Receiver<SceneFrame>,
        texture: watch::Receiver<Option<Texture>>,
        diagnostics: DiagnosticLog,
    ) -> Self {
        Self {
            frames,
            texture,
            diagnostics,
        }
    }
}

/// Render-surface server.
pub struct VisServer {
    state: Arc<AppState>,
}

impl VisServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Build the router for the server.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route("/earth", get(texture_handler))
            .route("/api/status", get(status_handler))
            .route("/api/scene", get(scene_handler))
            .route("/api/debug", get(debug_handler))
            .route("/ws", get(ws_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Serve on an already-bound listener until the future is dropped.
    pub async fn serve(self, listener: tokio::net::TcpListener) -> Result<(), std::io::Error> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Globe running on http://{}", addr);
        }
        axum::serve(listener, self.router()).await
    }
}

/// Serve the globe page.
async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn texture_handler(State(state): State<Arc<AppState>>) -> Response {
    let texture = state.texture.borrow().clone();
    match texture {
        Some(texture) => (
            [(header::CONTENT_TYPE, texture.content_type)],
            texture.bytes,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "texture not loaded").into_response(),
    }
}

/// Server status response.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    frame: u64,
    #[serde(flatten)]
    phase: Phase,
    connection: ConnectionState,
    active_arcs: usize,
    stats: SceneStats,
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let frame = state.frames.borrow();
    Json(StatusResponse {
        status: "ok",
        frame: frame.frame,
        phase: frame.phase.clone(),
        connection: frame.connection,
        active_arcs: frame.arcs.len(),
        stats: frame.stats,
    })
}

async fn scene_handler(State(state): State<Arc<AppState>>) -> Json<SceneFrame> {
    Json(state.frames.borrow().clone())
}

async fn debug_handler(State(state): State<Arc<AppState>>) -> Json<Vec<DiagnosticEntry>> {
    Json(state.diagnostics.entries())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Messages pushed to the page.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsMessage {
    /// Static scene parameters, sent once on connect
    Hello {
        radius: f32,
        color: String,
        glow_color: String,
    },
    /// Geometry for a new arc
    ArcAdded {
        id: ArcId,
        hash: String,
        value: u64,
        positions: Vec<f32>,
        normals: Vec<f32>,
        indices: Vec<u32>,
    },
    /// Arcs that left the scene
    ArcsRemoved { ids: Vec<ArcId> },
    /// Per-frame opacity update
    Frame {
        frame: u64,
        status: Phase,
        opacities: Vec<(ArcId, f32)>,
        stats: SceneStats,
    },
}

/// Turn a new frame into messages, given the arcs the page already has.
fn frame_messages(frame: &SceneFrame, known: &mut HashSet<ArcId>) -> Vec<WsMessage> {
    let mut messages = Vec::new();

    let current: HashSet<ArcId> = frame.arc_ids().collect();
    let mut removed: Vec<ArcId> = known.difference(&current).copied().collect();
    if !removed.is_empty() {
        removed.sort();
        known.retain(|id| current.contains(id));
        messages.push(WsMessage::ArcsRemoved { ids: removed });
    }

    for arc in &frame.arcs {
        if known.insert(arc.id) {
            messages.push(WsMessage::ArcAdded {
                id: arc.id,
                hash: arc.hash.clone(),
                value: arc.value,
                positions: arc.mesh.vertices.iter().flat_map(|v| v.position).collect(),
                normals: arc.mesh.vertices.iter().flat_map(|v| v.normal).collect(),
                indices: arc.mesh.indices.clone(),
            });
        }
    }

    messages.push(WsMessage::Frame {
        frame: frame.frame,
        status: frame.phase.clone(),
        opacities: frame.arcs.iter().map(|a| (a.id, a.opacity)).collect(),
        stats: frame.stats,
    });

    messages
}

async fn send_json(socket: &mut WebSocket, message: &WsMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::warn!("Failed to encode message: {}", e);
            true
        }
    }
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    tracing::debug!("Render surface connected");
    let mut frames = state.frames.clone();
    let mut known = HashSet::new();

    let hello = WsMessage::Hello {
        radius: EARTH_RADIUS,
        color: css_color(ARC_COLOR),
        glow_color: css_color(GLOW_COLOR),
    };
    if !send_json(&mut socket, &hello).await {
        return;
    }

    loop {
        let frame = frames.borrow_and_update().clone();
        for message in frame_messages(&frame, &mut known) {
            if !send_json(&mut socket, &message).await {
                return;
            }
        }

        tokio::select! {
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Render surface disconnected");
}
