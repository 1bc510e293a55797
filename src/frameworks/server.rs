// Framework bootstrap for the layout server runtime.

use crate::frameworks::{config, layout};
use crate::interface_adapters::net::{snapshot_handler, tick_serializer, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::sim::layout_task;
use crate::use_cases::types::{LayoutCommand, TickPayload};

use axum::{Router, extract::ws::Utf8Bytes, routing::get};
use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, watch};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state();

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/snapshot", get(snapshot_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Arc<AppState> {
    // Channel wiring for the layout loop.
    let (command_tx, command_rx) =
        mpsc::channel::<LayoutCommand>(config::COMMAND_CHANNEL_CAPACITY);
    let (tick_tx, _tick_rx) = broadcast::channel::<TickPayload>(config::TICK_BROADCAST_CAPACITY);
    let (tick_bytes_tx, _tick_bytes_rx) =
        broadcast::channel::<Utf8Bytes>(config::TICK_BROADCAST_CAPACITY);
    let (full_latest_tx, _full_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
    let shutdown = Arc::new(tokio::sync::Notify::new());

    // The registration feed: build the demo layout before the loop starts,
    // so the first full payload already carries the whole topology.
    let controller = layout::demo_layout(Instant::now());
    let tick_interval = config::tick_interval();
    tracing::debug!(
        tick_ms = tick_interval.as_millis() as u64,
        tracks = controller.track_count(),
        trains = controller.train_count(),
        "layout loaded"
    );

    // Spawn the authoritative layout loop.
    tokio::spawn(layout_task(
        controller,
        command_rx,
        tick_tx.clone(),
        tick_interval,
        shutdown.clone(),
    ));

    // Spawn the payload serializer in the adapter layer.
    tokio::spawn(tick_serializer(
        tick_tx.subscribe(),
        tick_bytes_tx.clone(),
        full_latest_tx.clone(),
    ));

    Arc::new(AppState {
        command_tx,
        tick_bytes_tx,
        full_latest_tx,
        shutdown,
    })
}
