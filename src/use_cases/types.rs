// Use-case level inputs/outputs for the layout loop.

use crate::domain::{Point, SwitchDirection, TrainTickState};

/// Mutations routed into the layout loop from external feeds.
#[derive(Debug, Clone)]
pub enum LayoutCommand {
    SetTrainSpeed { id: u64, speed: f32, light: bool },
    ReverseTrain { id: u64 },
    SetSwitch { id: u64, direction: SwitchDirection },
    /// Asks the loop to make its next payload a full snapshot.
    FullSync,
}

/// One tick's outbound state. `draw_track` distinguishes the two shapes: a
/// full payload carries every train and all track geometry, a delta only the
/// trains that changed since the last payload that included them.
#[derive(Debug, Clone)]
pub struct TickPayload {
    /// Milliseconds elapsed since the controller's launch epoch.
    pub time_ms: u64,
    pub trains: Vec<TrainTickState>,
    pub draw_track: bool,
    pub straight_tracks: Option<Vec<[Point; 2]>>,
    pub bezier_tracks: Option<Vec<[Point; 4]>>,
}

impl TickPayload {
    pub fn is_full(&self) -> bool {
        self.draw_track
    }
}
