use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tag_arena::config::ServerConfig;
use tag_arena::constants::TICK_MS;
use tag_arena::engine::{MatchEngine, MatchOptions};
use tag_arena::protocol::{parse_client_message, ParsedClientMessage};
use tag_arena::types::{DesiredRole, MatchMode};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::EnvFilter;

/// Longest gap a single step may cover, so a stalled task does not teleport agents.
const MAX_STEP_MS: u64 = 100;

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    CloseOnFull,
}

/// One browser connection driving one match.
struct Session {
    tx: mpsc::Sender<OutboundMessage>,
    engine: Option<MatchEngine>,
    summary_sent: bool,
    closed: bool,
}

type SharedSession = Arc<Mutex<Session>>;

#[derive(Clone)]
struct AppState {
    config: Arc<ServerConfig>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(error) = run().await {
        tracing::error!(%error, "server stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load()?;
    let listen_addr = config.listen_addr.clone();
    let static_dir = resolve_static_dir(config.static_dir.as_deref());
    let state = AppState {
        config: Arc::new(config),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = static_dir {
        let index_file = static_dir.join("index.html");
        tracing::info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        tracing::warn!("static file root not found, serving websocket only");
        app
    };

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(addr = %listen_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn resolve_static_dir(configured: Option<&str>) -> Option<PathBuf> {
    if let Some(raw) = configured {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }
    let candidates = [PathBuf::from("public"), PathBuf::from("dist")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);
    let session = Arc::new(Mutex::new(Session {
        tx: tx.clone(),
        engine: None,
        summary_sent: false,
        closed: false,
    }));
    tracing::info!("client connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });
    let ticker = start_tick_loop(session.clone());

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(&state, &session, raw.as_str()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(&state, &session, &text).await;
                } else {
                    send_error(&session, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
        if session.lock().await.closed {
            break;
        }
    }

    ticker.abort();
    session.lock().await.engine = None;
    drop(session);
    drop(tx);
    let _ = writer.await;
    tracing::info!("client disconnected");
}

async fn handle_client_message(state: &AppState, session: &SharedSession, raw: &str) {
    let Some(message) = parse_client_message(raw) else {
        send_error(session, "invalid message").await;
        return;
    };

    let mut guard = session.lock().await;
    match message {
        ParsedClientMessage::Start { mode, role, seed } => {
            let seed = seed.unwrap_or_else(rand::random::<u32>);
            start_match(state, &mut guard, mode, role, seed);
        }
        ParsedClientMessage::Ping { t } => {
            send_to_session(
                &mut guard,
                &json!({
                    "type": "pong",
                    "t": t,
                    "serverTime": chrono::Utc::now().timestamp_millis(),
                }),
                QueuePolicy::DropOnFull,
            );
        }
        other => {
            if guard.engine.is_none() {
                send_to_session(
                    &mut guard,
                    &error_message("no match in progress"),
                    QueuePolicy::CloseOnFull,
                );
                return;
            }
            let Some(engine) = guard.engine.as_mut() else {
                return;
            };
            match other {
                ParsedClientMessage::Intent(intent) => engine.set_intent(intent),
                ParsedClientMessage::Autopilot { enabled } => engine.set_autopilot(enabled),
                ParsedClientMessage::Pause => engine.pause(),
                ParsedClientMessage::Resume => engine.resume(),
                ParsedClientMessage::Quit => engine.quit(),
                ParsedClientMessage::Freeze => engine.freeze_all(),
                ParsedClientMessage::Start { .. } | ParsedClientMessage::Ping { .. } => {}
            }
        }
    }
}

fn start_match(
    state: &AppState,
    session: &mut Session,
    mode: MatchMode,
    role: DesiredRole,
    seed: u32,
) {
    let mut engine = match MatchEngine::new(
        state.config.match_config.clone(),
        seed,
        MatchOptions::default(),
    ) {
        Ok(engine) => engine,
        Err(error) => {
            tracing::error!(%error, "cannot start match");
            send_to_session(
                session,
                &error_message("invalid match configuration"),
                QueuePolicy::CloseOnFull,
            );
            return;
        }
    };
    engine.start_match(mode, role);
    let field = engine.field_init();
    session.engine = Some(engine);
    session.summary_sent = false;

    send_to_session(
        session,
        &json!({
            "type": "match_init",
            "seed": seed,
            "mode": mode,
            "modeLabel": mode.label(),
            "field": field,
        }),
        QueuePolicy::CloseOnFull,
    );
}

fn start_tick_loop(session: SharedSession) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        let mut last_tick = Instant::now();
        loop {
            interval.tick().await;
            let now = Instant::now();
            let dt_ms = (now.duration_since(last_tick).as_millis() as u64).min(MAX_STEP_MS);
            last_tick = now;

            let mut guard = session.lock().await;
            tick_session(&mut guard, dt_ms);
        }
    })
}

fn tick_session(session: &mut Session, dt_ms: u64) {
    if session.summary_sent {
        return;
    }
    let (snapshot, summary) = {
        let Some(engine) = session.engine.as_mut() else {
            return;
        };
        engine.step(dt_ms);
        let snapshot = engine.build_snapshot(true);
        let summary = engine.build_summary();
        (snapshot, summary)
    };

    send_to_session(
        session,
        &json!({
            "type": "state",
            "snapshot": snapshot,
        }),
        QueuePolicy::DropOnFull,
    );

    if let Some(summary) = summary {
        tracing::info!(reason = ?summary.reason, tags = summary.tag_count, "match over");
        send_to_session(
            session,
            &json!({
                "type": "match_over",
                "summary": summary,
            }),
            QueuePolicy::CloseOnFull,
        );
        session.summary_sent = true;
    }
}

fn send_to_session(session: &mut Session, message: &Value, policy: QueuePolicy) {
    if session.closed {
        return;
    }
    let failed = session
        .tx
        .try_send(OutboundMessage::Text(message.to_string()))
        .is_err();
    if failed && policy == QueuePolicy::CloseOnFull {
        tracing::warn!("outbound queue full, closing session");
        let _ = session.tx.try_send(OutboundMessage::Close {
            code: 1011,
            reason: "outbound queue overflow".to_string(),
        });
        session.closed = true;
    }
}

fn error_message(message: &str) -> Value {
    json!({
        "type": "error",
        "message": message,
    })
}

async fn send_error(session: &SharedSession, message: &str) {
    let mut guard = session.lock().await;
    send_to_session(&mut guard, &error_message(message), QueuePolicy::CloseOnFull);
}
