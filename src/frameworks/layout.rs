// The built-in demo layout, standing in for an external layout feed.
//
// An oval on an 800x460 canvas, run clockwise: top straight, right curve,
// a switch opening a siding on the bottom run, bottom straight, left curve.
// The siding dead-ends, which also exercises the buffer-stop behavior.

use std::time::Instant;

use crate::domain::track::{BezierTrack, Point, StraightTrack, Track, TrackEnd, connect};
use crate::domain::{Train, TrainDimensions, TrainPosition};
use crate::use_cases::LayoutController;

pub const TOP_STRAIGHT: u64 = 10;
pub const RIGHT_CURVE: u64 = 11;
pub const BOTTOM_SWITCH: u64 = 12;
pub const BOTTOM_STRAIGHT: u64 = 13;
pub const LEFT_CURVE: u64 = 14;
pub const SIDING: u64 = 15;

pub const TRAIN_ONE: u64 = 1;
pub const TRAIN_TWO: u64 = 2;

pub fn demo_layout(launch: Instant) -> LayoutController {
    let mut controller = LayoutController::new(launch);

    let mut top = Track::straight(
        TOP_STRAIGHT,
        Point::new(150.0, 100.0),
        Point::new(650.0, 100.0),
    );
    let mut right = Track::bezier(
        RIGHT_CURVE,
        [
            Point::new(650.0, 100.0),
            Point::new(760.0, 100.0),
            Point::new(760.0, 300.0),
            Point::new(650.0, 300.0),
        ],
    );
    let mut junction = Track::switch(
        BOTTOM_SWITCH,
        StraightTrack::new(Point::new(650.0, 300.0), Point::new(350.0, 300.0)),
        BezierTrack::new([
            Point::new(650.0, 300.0),
            Point::new(550.0, 300.0),
            Point::new(480.0, 380.0),
            Point::new(400.0, 380.0),
        ]),
    );
    let mut bottom = Track::straight(
        BOTTOM_STRAIGHT,
        Point::new(350.0, 300.0),
        Point::new(150.0, 300.0),
    );
    let mut left = Track::bezier(
        LEFT_CURVE,
        [
            Point::new(150.0, 300.0),
            Point::new(40.0, 300.0),
            Point::new(40.0, 100.0),
            Point::new(150.0, 100.0),
        ],
    );
    let mut siding = Track::straight(SIDING, Point::new(400.0, 380.0), Point::new(150.0, 380.0));

    connect(&mut top, TrackEnd::B, &mut right, TrackEnd::A);
    connect(&mut right, TrackEnd::B, &mut junction, TrackEnd::A);
    connect(&mut junction, TrackEnd::B, &mut bottom, TrackEnd::A);
    connect(&mut bottom, TrackEnd::B, &mut left, TrackEnd::A);
    connect(&mut left, TrackEnd::B, &mut top, TrackEnd::A);
    // The siding hangs off the diverging leg and dead-ends at its far end.
    connect(&mut junction, TrackEnd::DivergingB, &mut siding, TrackEnd::A);

    controller.register_track(top);
    controller.register_track(right);
    controller.register_track(junction);
    controller.register_track(bottom);
    controller.register_track(left);
    controller.register_track(siding);

    controller.register_train(Train::new(
        TRAIN_ONE,
        TrainPosition::at(TOP_STRAIGHT, 50.0),
        TrainDimensions::default(),
    ));
    controller.register_train(Train::new(
        TRAIN_TWO,
        TrainPosition::at(BOTTOM_STRAIGHT, 100.0),
        TrainDimensions {
            length: 80.0,
            ..TrainDimensions::default()
        },
    ));

    controller
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_layout_registers_the_expected_entities() {
        let controller = demo_layout(Instant::now());
        assert_eq!(controller.track_count(), 6);
        assert_eq!(controller.train_count(), 2);
        assert!(
            controller
                .track(BOTTOM_SWITCH)
                .unwrap()
                .as_switch()
                .is_some()
        );
    }

    #[test]
    fn a_train_laps_the_oval_back_onto_the_top_straight() {
        let mut controller = demo_layout(Instant::now());
        controller.set_train_speed(TRAIN_ONE, 100.0, false);

        // The oval is well under 2500 px around; plenty of ticks to lap it.
        for _ in 0..250 {
            controller.tick(0.1);
        }

        let train = controller.train(TRAIN_ONE).unwrap();
        let occupied = train.position().track;
        assert!(
            [
                TOP_STRAIGHT,
                RIGHT_CURVE,
                BOTTOM_SWITCH,
                BOTTOM_STRAIGHT,
                LEFT_CURVE
            ]
            .contains(&occupied),
            "train left the oval: {occupied}"
        );
    }

    #[test]
    fn thrown_switch_routes_a_train_into_the_siding_dead_end() {
        let mut controller = demo_layout(Instant::now());
        controller.change_switch_direction(BOTTOM_SWITCH, crate::domain::SwitchDirection::Diverging);
        controller.set_train_speed(TRAIN_ONE, 100.0, false);

        for _ in 0..250 {
            controller.tick(0.1);
        }

        let train = controller.train(TRAIN_ONE).unwrap();
        assert_eq!(train.position().track, SIDING);
        // Pinned at the buffer stop at the siding's far end.
        assert_eq!(train.position().offset, 250.0);
    }
}
