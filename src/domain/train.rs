// Train kinematics: speed ramp toward a target, advance along track
// geometry with boundary hand-off, reversal and light state.

use std::collections::HashMap;

use crate::domain::track::{Link, Pose, SwitchDirection, Track, TrackEnd};
use crate::domain::tuning::{TrainDimensions, TrainTuning};

// Upper bound on boundary crossings in a single advance. A well-formed
// layout has strictly positive segment lengths, so the bound only matters
// for degenerate geometry.
const MAX_HANDOFFS: usize = 32;

/// Direction of travel across the occupied track, in path terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    AToB,
    BToA,
}

impl Orientation {
    fn flipped(self) -> Self {
        match self {
            Orientation::AToB => Orientation::BToA,
            Orientation::BToA => Orientation::AToB,
        }
    }
}

/// Where a train is on the layout: the occupied track, the switch leg when
/// the track is a switch, the distance from end A along that path, and the
/// direction of travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainPosition {
    pub track: u64,
    pub leg: SwitchDirection,
    pub offset: f32,
    pub orientation: Orientation,
}

impl TrainPosition {
    /// Placement on a plain track, facing end B.
    pub fn at(track: u64, offset: f32) -> Self {
        Self {
            track,
            leg: SwitchDirection::Straight,
            offset,
            orientation: Orientation::AToB,
        }
    }
}

/// Per-train slice of a tick payload. Full payloads populate every field;
/// delta payloads only the ones whose dirty flag was set.
#[derive(Debug, Clone)]
pub struct TrainTickState {
    pub id: u64,
    pub position: Option<Pose>,
    pub speed: Option<f32>,
    pub light: Option<bool>,
    pub reversed: Option<bool>,
    pub dimensions: Option<TrainDimensions>,
}

pub struct Train {
    id: u64,
    position: TrainPosition,
    speed: f32,
    target_speed: f32,
    light: bool,
    reversed: bool,
    dims: TrainDimensions,

    // Delta bookkeeping; cleared when a payload includes the train.
    position_dirty: bool,
    light_dirty: bool,
    orientation_dirty: bool,
}

impl Train {
    pub fn new(id: u64, position: TrainPosition, dims: TrainDimensions) -> Self {
        Self {
            id,
            position,
            speed: 0.0,
            target_speed: 0.0,
            light: false,
            reversed: false,
            dims,
            position_dirty: false,
            light_dirty: false,
            orientation_dirty: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn position(&self) -> TrainPosition {
        self.position
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn target_speed(&self) -> f32 {
        self.target_speed
    }

    pub fn light(&self) -> bool {
        self.light
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn set_target_speed(&mut self, target: f32) {
        self.target_speed = target;
    }

    /// Updates the light, marking it dirty only on an actual change so a
    /// no-op set never inflates the next delta.
    pub fn set_light(&mut self, light: bool) {
        if self.light != light {
            self.light_dirty = true;
        }
        self.light = light;
    }

    /// Moves speed toward the target by a linear ramp. Arrival is exact
    /// (no overshoot) and speed never drops below zero; a negative target
    /// behaves as a brake-to-stop.
    pub fn accelerate(&mut self, interval: f32, tuning: &TrainTuning) {
        if self.speed < self.target_speed {
            self.speed = (self.speed + tuning.acceleration * interval).min(self.target_speed);
        } else if self.speed > self.target_speed {
            self.speed = (self.speed - tuning.braking * interval).max(self.target_speed);
        }
        self.speed = self.speed.max(0.0);
    }

    /// Flips the direction of travel in place. Position is untouched; the
    /// orientation flag makes the reversal visible in the next delta.
    pub fn reverse(&mut self) {
        self.position.orientation = self.position.orientation.flipped();
        self.reversed = !self.reversed;
        self.orientation_dirty = true;
    }

    /// Advances the train by `speed * interval` along its path, spilling
    /// leftover distance across track joints. Reaching an unlinked end pins
    /// the train there.
    pub fn advance(&mut self, interval: f32, tracks: &HashMap<u64, Track>) {
        let distance = self.speed * interval;
        if distance <= 0.0 {
            return;
        }

        let before = self.position;
        let mut remaining = distance;

        for _ in 0..MAX_HANDOFFS {
            let Some(track) = tracks.get(&self.position.track) else {
                break;
            };
            let len = track.path_length(self.position.leg);

            let (room, boundary) = match self.position.orientation {
                Orientation::AToB => (
                    len - self.position.offset,
                    track.link_at(track.exit_end(self.position.leg)),
                ),
                Orientation::BToA => (self.position.offset, track.link_at(TrackEnd::A)),
            };

            if remaining < room {
                match self.position.orientation {
                    Orientation::AToB => self.position.offset += remaining,
                    Orientation::BToA => self.position.offset -= remaining,
                }
                break;
            }

            remaining -= room;
            let crossed = match boundary {
                Some(link) => self.enter(link, tracks),
                None => false,
            };
            if !crossed {
                // Open or broken joint: pin at the end that was reached.
                self.position.offset = match self.position.orientation {
                    Orientation::AToB => len,
                    Orientation::BToA => 0.0,
                };
                break;
            }
        }

        if self.position != before {
            self.position_dirty = true;
        }
    }

    /// Steps onto the far side of a joint. Entering a switch at its common
    /// end follows the direction set at that moment; entering at a leg exit
    /// travels that leg regardless of the direction (trailing-point moves
    /// are never rerouted).
    fn enter(&mut self, link: Link, tracks: &HashMap<u64, Track>) -> bool {
        let Some(target) = tracks.get(&link.track) else {
            return false;
        };
        self.position = match link.end {
            TrackEnd::A => TrainPosition {
                track: link.track,
                leg: target
                    .as_switch()
                    .map_or(SwitchDirection::Straight, |s| s.direction()),
                offset: 0.0,
                orientation: Orientation::AToB,
            },
            TrackEnd::B => TrainPosition {
                track: link.track,
                leg: SwitchDirection::Straight,
                offset: target.path_length(SwitchDirection::Straight),
                orientation: Orientation::BToA,
            },
            TrackEnd::DivergingB => TrainPosition {
                track: link.track,
                leg: SwitchDirection::Diverging,
                offset: target.path_length(SwitchDirection::Diverging),
                orientation: Orientation::BToA,
            },
        };
        true
    }

    /// World pose for consumers; the angle points in the direction of travel.
    pub fn pose(&self, tracks: &HashMap<u64, Track>) -> Pose {
        let Some(track) = tracks.get(&self.position.track) else {
            // Placement on a registered track is a construction-time invariant.
            return Pose {
                x: 0.0,
                y: 0.0,
                angle: 0.0,
            };
        };
        let mut pose = track.pose_at(self.position.leg, self.position.offset);
        if self.position.orientation == Orientation::BToA {
            pose.angle += std::f32::consts::PI;
        }
        pose
    }

    pub fn is_dirty(&self) -> bool {
        self.position_dirty || self.light_dirty || self.orientation_dirty
    }

    pub fn clear_dirty(&mut self) {
        self.position_dirty = false;
        self.light_dirty = false;
        self.orientation_dirty = false;
    }

    /// Serializes the train for a tick payload. Delta mode includes only the
    /// fields whose dirty flag is set; pose accompanies both position and
    /// orientation changes since either moves the rendered sprite.
    pub fn tick_state(&self, delta: bool, tracks: &HashMap<u64, Track>) -> TrainTickState {
        if delta {
            let moved = self.position_dirty || self.orientation_dirty;
            TrainTickState {
                id: self.id,
                position: moved.then(|| self.pose(tracks)),
                speed: None,
                light: self.light_dirty.then_some(self.light),
                reversed: self.orientation_dirty.then_some(self.reversed),
                dimensions: None,
            }
        } else {
            TrainTickState {
                id: self.id,
                position: Some(self.pose(tracks)),
                speed: Some(self.speed),
                light: Some(self.light),
                reversed: Some(self.reversed),
                dimensions: Some(self.dims),
            }
        }
    }
}
