/// Physical tuning for trains.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer
/// sizes, etc.).

#[derive(Debug, Clone, Copy)]
pub struct TrainTuning {
    /// Speed gained per second while below the target speed, in px/s^2.
    pub acceleration: f32,

    /// Speed shed per second while above the target speed, in px/s^2.
    /// Braking is stronger than traction, as on the real thing.
    pub braking: f32,
}

impl Default for TrainTuning {
    fn default() -> Self {
        Self {
            acceleration: 30.0,
            braking: 60.0,
        }
    }
}

/// Renderer-facing train dimensions; the simulation never reads these.
#[derive(Debug, Clone, Copy)]
pub struct TrainDimensions {
    /// Body length in pixels.
    pub length: f32,

    /// Body width in pixels.
    pub width: f32,

    /// Distance from the leading edge to the first axle, in pixels.
    pub wheel_offset: f32,
}

impl Default for TrainDimensions {
    fn default() -> Self {
        Self {
            length: 60.0,
            width: 20.0,
            wheel_offset: 10.0,
        }
    }
}
