use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::{broadcast, mpsc, watch};

use crate::use_cases::LayoutCommand;

#[derive(Clone)]
pub struct AppState {
    // Commands flowing from the network into the layout loop.
    pub command_tx: mpsc::Sender<LayoutCommand>,
    // Serialized tick payloads, shared across all connections.
    pub tick_bytes_tx: broadcast::Sender<Utf8Bytes>,
    // Latest serialized full payload, for bootstrap and lag recovery.
    pub full_latest_tx: watch::Sender<Utf8Bytes>,
    // Stops the layout task on shutdown.
    pub shutdown: Arc<tokio::sync::Notify>,
}
