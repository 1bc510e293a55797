use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage, TickPayloadDto};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{LayoutCommand, TickPayload};

use axum::{
    Json,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use futures_util::sink::SinkExt;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    CommandClosed,
    TickUpdatesClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

// Process-unique connection id for correlating logs of one WebSocket session.
fn conn_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Serializes each tick payload once and broadcasts the shared bytes; full
/// payloads are additionally retained for bootstrap and lag recovery.
pub async fn tick_serializer(
    mut tick_rx: broadcast::Receiver<TickPayload>,
    tick_bytes_tx: broadcast::Sender<Utf8Bytes>,
    full_latest_tx: watch::Sender<Utf8Bytes>,
) {
    loop {
        match tick_rx.recv().await {
            Ok(payload) => {
                let full = payload.is_full();
                let msg = ServerMessage::Tick(TickPayloadDto::from(payload));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize tick payload");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                if full {
                    let _ = full_latest_tx.send(bytes.clone());
                }
                let _ = tick_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "tick serializer lagged; skipping to latest");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("tick channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let conn_id = conn_id();
    let span = info_span!("conn", conn_id);
    let _enter = span.enter();

    let mut ctx = match bootstrap_connection(&mut socket, &state).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "bootstrap failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    info!("client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

struct ConnCtx {
    command_tx: mpsc::Sender<LayoutCommand>,
    tick_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    full_latest_rx: watch::Receiver<Utf8Bytes>,

    // Count lag recovery snapshots sent to this client.
    lag_recovery_count: u64,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,

    invalid_json: u32,

    last_command_full_log: Instant,
    last_tick_lag_log: Instant,
    last_invalid_command_log: Instant,

    close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
) -> Result<ConnCtx, NetError> {
    // Subscribe to updates *before* doing anything else (awaits) to not miss
    // payloads.
    let tick_bytes_rx = state.tick_bytes_tx.subscribe();
    let full_latest_rx = state.full_latest_tx.subscribe();

    // Initial sync: the latest retained full payload gives the consumer the
    // topology and train set immediately. It may be stale, so a fresh full
    // snapshot is also requested from the loop below.
    let latest = full_latest_rx.borrow().clone();
    if !latest.is_empty() {
        socket
            .send(Message::Text(latest))
            .await
            .map_err(NetError::Ws)?;
    }

    state
        .command_tx
        .send(LayoutCommand::FullSync)
        .await
        .map_err(|_| NetError::CommandClosed)?;

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        command_tx: state.command_tx.clone(),
        tick_bytes_rx,
        full_latest_rx,
        lag_recovery_count: 0,

        msgs_in: 0,
        msgs_out: 0,
        bytes_in: 0,
        bytes_out: 0,

        invalid_json: 0,

        last_command_full_log: now,
        last_tick_lag_log: now,
        last_invalid_command_log: now,

        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        command_tx,
        tick_bytes_rx,
        full_latest_rx,
        lag_recovery_count,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_command_full_log,
        last_tick_lag_log,
        last_invalid_command_log,
        close_frame,
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            // Incoming command from the consumer.
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    incoming,
                    command_tx,
                    msgs_in,
                    bytes_in,
                    invalid_json,
                    last_command_full_log,
                    last_invalid_command_log,
                    close_frame,
                ) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing tick payload.
            tick_msg = tick_bytes_rx.recv() => {
                match tick_msg {
                    Ok(bytes) => match forward_tick_bytes(bytes, socket, msgs_out, bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_tick_lag_log) {
                            warn!(missed = n, "tick stream lagged; sending full snapshot");
                        }

                        // Resync strategy: replay the latest full payload.
                        let latest = full_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            *lag_recovery_count += 1;
                            match forward_tick_bytes(latest, socket, msgs_out, bytes_out).await {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::TickUpdatesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    debug!(
        msgs_in = *msgs_in,
        msgs_out = *msgs_out,
        bytes_in = *bytes_in,
        bytes_out = *bytes_out,
        invalid_json = *invalid_json,
        lag_recovery_count = *lag_recovery_count,
        "connection stats"
    );
    info!("client disconnected");

    if let Some(err) = fatal { Err(err) } else { Ok(()) }
}

/// Drops commands whose numbers would poison the simulation. The core does
/// not range-validate values, but NaN/infinite speeds never reach it.
fn sanitize_command(command: &LayoutCommand) -> bool {
    match command {
        LayoutCommand::SetTrainSpeed { speed, .. } => speed.is_finite(),
        _ => true,
    }
}

fn process_command(
    command_tx: &mpsc::Sender<LayoutCommand>,
    command: LayoutCommand,
    last_command_full_log: &mut Instant,
    last_invalid_command_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    if !sanitize_command(&command) {
        if should_log(last_invalid_command_log) {
            warn!("invalid command values (NaN/inf); dropping");
        }
        return Ok(LoopControl::Continue);
    }

    match command_tx.try_send(command) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_cmd)) => {
            if should_log(last_command_full_log) {
                warn!("command channel full; dropping command");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_cmd)) => Err(NetError::CommandClosed),
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_incoming_ws(
    incoming: Option<Result<Message, axum::Error>>,
    command_tx: &mpsc::Sender<LayoutCommand>,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    invalid_json: &mut u32,
    last_command_full_log: &mut Instant,
    last_invalid_command_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => {
                        let command = match message {
                            ClientMessage::SetTrainSpeed(dto) => dto.into(),
                            ClientMessage::ReverseTrain(dto) => {
                                LayoutCommand::ReverseTrain { id: dto.id }
                            }
                            ClientMessage::SetSwitch(dto) => dto.into(),
                            ClientMessage::FullSync => LayoutCommand::FullSync,
                        };
                        process_command(
                            command_tx,
                            command,
                            last_command_full_log,
                            last_invalid_command_log,
                        )
                    }
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_command_log) {
                            warn!(
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_tick_bytes(
    tick_msg: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = tick_msg.len();
    match socket
        .send(Message::Text(tick_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send tick payload");
            LoopControl::Disconnect
        }
    }
}

/// Serves the latest full payload without touching the simulation. Returns
/// 503 until the layout task has produced its first full snapshot.
pub async fn snapshot_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let latest_rx = state.full_latest_tx.subscribe();
    let latest = latest_rx.borrow().clone();
    if latest.is_empty() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "no full snapshot produced yet".to_string(),
            }),
        )
            .into_response()
    } else {
        (
            [(header::CONTENT_TYPE, "application/json")],
            latest.as_str().to_owned(),
        )
            .into_response()
    }
}
