use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use futures::{SinkExt, StreamExt};
use melon_core::io::definitions::load_catalog;
use melon_core::{Command, EngineConfig, GameEngine, Outcome, Snapshot};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};

#[derive(Parser, Debug)]
#[command(name = "melond", about = "Melon economy streaming daemon")]
struct Args {
    /// Building and upgrade definitions (JSON). Uses the builtin catalog when omitted.
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// Engine policy document (JSON).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Cap on the time simulated at full rate by one tick.
    #[arg(long = "max-step-ms")]
    max_step_ms: Option<u64>,

    /// Trust clients to filter locked purchases.
    #[arg(long = "no-enforce-unlocks")]
    no_enforce_unlocks: bool,

    /// Enable catch-up beyond the step cap at this fraction of full rate.
    #[arg(long = "offline-rate", value_name = "RATE")]
    offline_rate: Option<f64>,

    /// Address to bind (defaults to 127.0.0.1).
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on for WebSocket clients.
    #[arg(long, default_value_t = 8787)]
    port: u16,

    /// Milliseconds to sleep between ticks.
    #[arg(long, default_value_t = 250u64)]
    tick_ms: u64,
}

#[derive(Clone)]
struct AppState {
    engine: Arc<Mutex<GameEngine>>,
    tx: broadcast::Sender<String>,
    origin: Instant,
}

impl AppState {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn publish(&self, snapshot: &Snapshot) {
        match snapshot.to_ndjson() {
            Ok(line) => {
                if self.tx.send(line).is_err() {
                    trace!(t = snapshot.t, "no subscribers for snapshot");
                }
            }
            Err(err) => error!(?err, "snapshot serialization failed"),
        }
    }
}

fn engine_config(args: &Args) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(args.config.as_deref())?;
    if let Some(max_step_ms) = args.max_step_ms {
        config.max_step_ms = Some(max_step_ms);
    }
    if args.no_enforce_unlocks {
        config.enforce_unlocks = false;
    }
    if let Some(rate) = args.offline_rate {
        config.offline_progress_enabled = true;
        config.offline_progress_rate = rate;
    }
    config.validate()?;
    Ok(config)
}

fn build_engine(args: &Args) -> Result<GameEngine> {
    let catalog = load_catalog(args.catalog.as_deref())?;
    let config = engine_config(args)?;
    Ok(GameEngine::new(catalog, config, 0))
}

/// Apply one client message. Ticks belong to the server clock.
fn apply_client_message(engine: &mut GameEngine, text: &str) -> Result<Outcome> {
    let command = Command::from_json(text)?;
    apply_client_command(engine, &command)
}

fn apply_client_command(engine: &mut GameEngine, command: &Command) -> Result<Outcome> {
    if let Command::Tick { .. } = command {
        bail!("tick is driven by the server clock");
    }
    let outcome = engine.apply(command);
    debug!(action = command.name(), ?outcome, "client command");
    Ok(outcome)
}

/// Status and body for a client command. Refused commands are a client error.
fn command_reply(result: &Result<Outcome>) -> (StatusCode, serde_json::Value) {
    match result {
        Ok(outcome) => (StatusCode::OK, json!({ "outcome": outcome })),
        Err(err) => (StatusCode::BAD_REQUEST, json!({ "error": format!("{err:#}") })),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();
    let engine = build_engine(&args)?;

    let (tx, _rx) = broadcast::channel::<String>(128);
    let state = AppState {
        engine: Arc::new(Mutex::new(engine)),
        tx,
        origin: Instant::now(),
    };

    let ticker = state.clone();
    let tick_ms = args.tick_ms;
    tokio::spawn(async move {
        loop {
            sleep(Duration::from_millis(tick_ms)).await;
            let snapshot = {
                let mut engine = ticker.engine.lock().await;
                engine.tick(ticker.now_ms());
                engine.snapshot()
            };
            ticker.publish(&snapshot);
        }
    });

    let app = Router::new()
        .route("/stream", get(ws_handler))
        .route("/snapshot", get(snapshot_handler))
        .route("/command", post(command_handler))
        .route("/reset", post(reset_handler))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.bind, args.port))?;

    info!(%addr, tick_ms, "starting melond");
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("melond stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(?err, "failed to listen for shutdown signal");
    }
}

async fn snapshot_handler(State(state): State<AppState>) -> Json<Snapshot> {
    let engine = state.engine.lock().await;
    Json(engine.snapshot())
}

async fn command_handler(
    State(state): State<AppState>,
    Json(command): Json<Command>,
) -> impl IntoResponse {
    let (result, snapshot) = {
        let mut engine = state.engine.lock().await;
        let result = apply_client_command(&mut engine, &command);
        let applied = matches!(result, Ok(Outcome::Applied));
        (result, applied.then(|| engine.snapshot()))
    };
    if let Some(snapshot) = snapshot {
        state.publish(&snapshot);
    }
    let (status, body) = command_reply(&result);
    (status, Json(body))
}

async fn reset_handler(State(state): State<AppState>) -> Json<Snapshot> {
    let snapshot = {
        let mut engine = state.engine.lock().await;
        engine.initialize(state.now_ms());
        engine.snapshot()
    };
    state.publish(&snapshot);
    Json(snapshot)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| async move { handle_socket(socket, state).await })
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let mut frames = state.tx.subscribe();
    let (reply_tx, mut reply_rx) = mpsc::channel::<String>(16);

    let mut writer = tokio::spawn(async move {
        loop {
            let line = tokio::select! {
                frame = frames.recv() => match frame {
                    Ok(line) => line,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "client lagging, dropped snapshots");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(line) => line,
                    None => break,
                },
            };
            if sink.send(Message::Text(line)).await.is_err() {
                debug!("websocket client disconnected");
                break;
            }
        }
    });

    let mut reader = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            let (reply, snapshot) = {
                let mut engine = state.engine.lock().await;
                let result = apply_client_message(&mut engine, &text);
                let applied = matches!(result, Ok(Outcome::Applied));
                let (_, reply) = command_reply(&result);
                (reply, applied.then(|| engine.snapshot()))
            };
            if let Some(snapshot) = snapshot {
                state.publish(&snapshot);
            }
            if reply_tx.send(reply.to_string()).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }
}
