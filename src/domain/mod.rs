// Domain layer: track geometry, train kinematics and their tuning.

pub mod track;
pub mod train;
pub mod tuning;

pub use track::{
    BezierTrack, Link, Point, Pose, StraightTrack, SwitchDirection, SwitchTrack, Track, TrackEnd,
    TrackKind,
};
pub use train::{Orientation, Train, TrainPosition, TrainTickState};
pub use tuning::{TrainDimensions, TrainTuning};
