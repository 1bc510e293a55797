// The layout task: a fixed-step loop that owns the controller outright.
// Commands are serialized onto its timeline through the mpsc channel, so the
// simulation state needs no locking at all.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::use_cases::controller::LayoutController;
use crate::use_cases::types::{LayoutCommand, TickPayload};

pub async fn layout_task(
    mut controller: LayoutController,
    mut command_rx: mpsc::Receiver<LayoutCommand>,
    tick_tx: broadcast::Sender<TickPayload>,
    tick_interval: Duration,
    shutdown: Arc<tokio::sync::Notify>,
) {
    // Drive the fixed-step simulation at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);

    // The very first payload is a full snapshot; afterwards deltas, until a
    // consumer asks for a resync.
    let mut full_pending = true;

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                debug!("layout task shutting down");
                break;
            }
            _ = interval.tick() => {}
        }

        // Apply all pending commands before stepping, so a command takes
        // effect in the tick it arrived before.
        while let Ok(command) = command_rx.try_recv() {
            match command {
                LayoutCommand::SetTrainSpeed { id, speed, light } => {
                    controller.set_train_speed(id, speed, light);
                }
                LayoutCommand::ReverseTrain { id } => controller.reverse_train(id),
                LayoutCommand::SetSwitch { id, direction } => {
                    controller.change_switch_direction(id, direction);
                }
                LayoutCommand::FullSync => full_pending = true,
            }
        }

        controller.tick(tick_interval.as_secs_f32());

        let payload = controller.get_tick(!full_pending);
        full_pending = false;

        // Nobody listening is fine; the broadcast just drops the payload.
        let _ = tick_tx.send(payload);
    }
}
