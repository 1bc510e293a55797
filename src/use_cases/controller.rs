// The layout controller: owns every registered track and train, routes
// external commands to the right entity and turns simulation state into
// tick payloads.
//
// Malformed commands (unknown ids, a switch command aimed at a plain track)
// are logged and dropped rather than surfaced; commands may race with layout
// changes on an operator console, and the loop must keep running regardless.

use std::collections::HashMap;
use std::time::Instant;

use tracing::warn;

use crate::domain::{SwitchDirection, Track, TrackKind, Train, TrainTuning};
use crate::use_cases::types::TickPayload;

pub struct LayoutController {
    tracks: HashMap<u64, Track>,
    trains: HashMap<u64, Train>,
    tuning: TrainTuning,
    // Epoch for payload timestamps; passed in so tests can pre-date it.
    launch: Instant,
}

impl LayoutController {
    pub fn new(launch: Instant) -> Self {
        Self {
            tracks: HashMap::new(),
            trains: HashMap::new(),
            tuning: TrainTuning::default(),
            launch,
        }
    }

    /// Registers a train. A duplicate id is a recoverable mistake in the
    /// layout feed: the newer entry wins.
    pub fn register_train(&mut self, train: Train) {
        if self.trains.contains_key(&train.id()) {
            warn!(id = train.id(), "replacing duplicate train registration");
        }
        self.trains.insert(train.id(), train);
    }

    pub fn register_track(&mut self, track: Track) {
        if self.tracks.contains_key(&track.id()) {
            warn!(id = track.id(), "replacing duplicate track registration");
        }
        self.tracks.insert(track.id(), track);
    }

    pub fn set_train_speed(&mut self, id: u64, speed: f32, light: bool) {
        let Some(train) = self.trains.get_mut(&id) else {
            warn!(id, "speed command for unknown train");
            return;
        };
        train.set_target_speed(speed);
        train.set_light(light);
    }

    pub fn reverse_train(&mut self, id: u64) {
        let Some(train) = self.trains.get_mut(&id) else {
            warn!(id, "reverse command for unknown train");
            return;
        };
        train.reverse();
    }

    /// A command for an unknown id and one for a track that is not a switch
    /// get the same treatment: warn and drop.
    pub fn change_switch_direction(&mut self, id: u64, direction: SwitchDirection) {
        let Some(switch) = self.tracks.get_mut(&id).and_then(Track::as_switch_mut) else {
            warn!(id, "switch command for unknown or non-switch track");
            return;
        };
        switch.change_direction(direction);
    }

    /// One fixed simulation step: every train accelerates toward its target
    /// speed, then advances along the layout. Trains do not interact, so the
    /// order across trains is immaterial.
    pub fn tick(&mut self, interval_seconds: f32) {
        for train in self.trains.values_mut() {
            train.accelerate(interval_seconds, &self.tuning);
            train.advance(interval_seconds, &self.tracks);
        }
    }

    /// Assembles the outbound payload. Every included train has its dirty
    /// flags cleared, in both modes, so a full snapshot also resets the
    /// delta baseline.
    pub fn get_tick(&mut self, delta: bool) -> TickPayload {
        let mut trains = Vec::new();
        for train in self.trains.values_mut() {
            if !delta || train.is_dirty() {
                trains.push(train.tick_state(delta, &self.tracks));
                train.clear_dirty();
            }
        }

        let (straight_tracks, bezier_tracks) = if delta {
            (None, None)
        } else {
            let mut straights = Vec::new();
            let mut beziers = Vec::new();
            for track in self.tracks.values() {
                match track.kind() {
                    TrackKind::Straight(geometry) => straights.push(geometry.control_points()),
                    TrackKind::Bezier(geometry) => beziers.push(geometry.control_points()),
                    // Both switch legs are drawn, each in its natural list.
                    TrackKind::Switch(switch) => {
                        straights.push(switch.straight_leg().control_points());
                        beziers.push(switch.diverging_leg().control_points());
                    }
                }
            }
            (Some(straights), Some(beziers))
        };

        TickPayload {
            time_ms: self.launch.elapsed().as_millis() as u64,
            trains,
            draw_track: !delta,
            straight_tracks,
            bezier_tracks,
        }
    }

    pub fn train(&self, id: u64) -> Option<&Train> {
        self.trains.get(&id)
    }

    pub fn track(&self, id: u64) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn train_count(&self) -> usize {
        self.trains.len()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::track::{connect, BezierTrack, Point, StraightTrack, TrackEnd};
    use crate::domain::{TrainDimensions, TrainPosition};
    use std::time::Duration;

    // A long feeder with a switch at its far end, plus a free-standing train.
    fn controller_with_layout() -> LayoutController {
        let mut controller = LayoutController::new(Instant::now());

        let mut feeder = Track::straight(10, Point::new(0.0, 0.0), Point::new(500.0, 0.0));
        let mut junction = Track::switch(
            11,
            StraightTrack::new(Point::new(500.0, 0.0), Point::new(600.0, 0.0)),
            BezierTrack::new([
                Point::new(500.0, 0.0),
                Point::new(540.0, 0.0),
                Point::new(560.0, 30.0),
                Point::new(600.0, 30.0),
            ]),
        );
        connect(&mut feeder, TrackEnd::B, &mut junction, TrackEnd::A);
        controller.register_track(feeder);
        controller.register_track(junction);

        controller.register_train(Train::new(
            1,
            TrainPosition::at(10, 50.0),
            TrainDimensions::default(),
        ));
        controller
    }

    #[test]
    fn duplicate_registration_overwrites_the_existing_entry() {
        let mut controller = controller_with_layout();
        assert_eq!(controller.train_count(), 1);

        let mut replacement = Train::new(
            1,
            TrainPosition::at(10, 200.0),
            TrainDimensions::default(),
        );
        replacement.set_target_speed(42.0);
        controller.register_train(replacement);

        assert_eq!(controller.train_count(), 1);
        assert_eq!(controller.train(1).unwrap().target_speed(), 42.0);
    }

    #[test]
    fn when_train_id_is_unknown_then_commands_are_no_ops() {
        let mut controller = controller_with_layout();
        controller.set_train_speed(99, 5.0, true);
        controller.reverse_train(99);

        assert_eq!(controller.train_count(), 1);
        let train = controller.train(1).unwrap();
        assert_eq!(train.target_speed(), 0.0);
        assert!(!train.is_reversed());

        // No payload difference either: the delta stays empty.
        let payload = controller.get_tick(true);
        assert!(payload.trains.is_empty());
    }

    #[test]
    fn light_is_dirty_only_when_the_value_changes() {
        let mut controller = controller_with_layout();

        controller.set_train_speed(1, 0.0, true);
        let payload = controller.get_tick(true);
        assert_eq!(payload.trains.len(), 1);
        assert_eq!(payload.trains[0].light, Some(true));

        // Same light again: nothing to report.
        controller.set_train_speed(1, 0.0, true);
        let payload = controller.get_tick(true);
        assert!(payload.trains.is_empty());
    }

    #[test]
    fn full_payload_includes_everything_regardless_of_dirt() {
        let mut controller = controller_with_layout();
        let payload = controller.get_tick(false);

        assert!(payload.draw_track);
        assert_eq!(payload.trains.len(), 1);
        let train = &payload.trains[0];
        assert!(train.position.is_some());
        assert!(train.speed.is_some());
        assert!(train.dimensions.is_some());

        // Feeder plus the switch's straight leg; the diverging leg lands in
        // the bezier list.
        assert_eq!(payload.straight_tracks.as_ref().unwrap().len(), 2);
        assert_eq!(payload.bezier_tracks.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn delta_right_after_a_full_snapshot_is_empty() {
        let mut controller = controller_with_layout();
        let _ = controller.get_tick(false);
        controller.tick(0.0);

        let payload = controller.get_tick(true);
        assert!(payload.trains.is_empty());
        assert!(!payload.draw_track);
        assert!(payload.straight_tracks.is_none());
        assert!(payload.bezier_tracks.is_none());
    }

    #[test]
    fn switch_command_on_a_plain_track_changes_nothing() {
        let mut controller = controller_with_layout();
        controller.change_switch_direction(10, SwitchDirection::Diverging);
        assert!(controller.track(10).unwrap().as_switch().is_none());

        // The actual switch still routes; unknown ids are equally quiet.
        controller.change_switch_direction(11, SwitchDirection::Diverging);
        assert_eq!(
            controller.track(11).unwrap().as_switch().unwrap().direction(),
            SwitchDirection::Diverging
        );
        controller.change_switch_direction(99, SwitchDirection::Straight);
    }

    #[test]
    fn three_ticks_approach_the_target_and_integrate_position() {
        let mut controller = controller_with_layout();
        controller.set_train_speed(1, 5.0, false);

        let mut speeds = Vec::new();
        let mut travelled = 0.0;
        for _ in 0..3 {
            controller.tick(1.0);
            let train = controller.train(1).unwrap();
            speeds.push(train.speed());
            travelled += train.speed() * 1.0;
        }

        // Monotonic approach, never past the target.
        assert!(speeds.windows(2).all(|w| w[0] <= w[1]));
        assert!(speeds.iter().all(|&s| s <= 5.0));
        assert_eq!(*speeds.last().unwrap(), 5.0);

        // Position advanced by exactly the integral of speed over the ticks.
        let train = controller.train(1).unwrap();
        assert_eq!(train.position().offset, 50.0 + travelled);

        // The delta after the third tick carries the new position, no light.
        let payload = controller.get_tick(true);
        assert_eq!(payload.trains.len(), 1);
        assert_eq!(payload.trains[0].id, 1);
        assert!(payload.trains[0].position.is_some());
        assert!(payload.trains[0].light.is_none());
    }

    #[test]
    fn payload_time_is_measured_from_the_launch_epoch() {
        let mut controller =
            LayoutController::new(Instant::now() - Duration::from_millis(1500));
        let payload = controller.get_tick(true);
        assert!(payload.time_ms >= 1500);
    }
}
