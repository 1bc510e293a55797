// Wire protocol DTOs and conversions for the public layout server messages.
// Both directions derive both serde traits: the same definitions serve the
// server and any Rust reference client, including the integration tests.

use serde::{Deserialize, Serialize};

use crate::domain::{Point, Pose, SwitchDirection, TrainDimensions, TrainTickState};
use crate::use_cases::{LayoutCommand, TickPayload};

/// Messages the server sends to connected consumers over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Snapshot (full or delta) of the layout for a given tick.
    Tick(TickPayloadDto),
}

/// Messages a consumer sends to the server over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    SetTrainSpeed(SetTrainSpeedDto),
    ReverseTrain(TrainRefDto),
    SetSwitch(SetSwitchDto),
    // Request a fresh full payload on the broadcast stream.
    FullSync,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTrainSpeedDto {
    pub id: u64,
    pub speed: f32,
    #[serde(default)]
    pub light: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainRefDto {
    pub id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSwitchDto {
    pub id: u64,
    pub direction: SwitchDirectionDto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchDirectionDto {
    Straight,
    Diverging,
}

impl From<SwitchDirectionDto> for SwitchDirection {
    fn from(direction: SwitchDirectionDto) -> Self {
        match direction {
            SwitchDirectionDto::Straight => SwitchDirection::Straight,
            SwitchDirectionDto::Diverging => SwitchDirection::Diverging,
        }
    }
}

impl From<SetTrainSpeedDto> for LayoutCommand {
    fn from(dto: SetTrainSpeedDto) -> Self {
        LayoutCommand::SetTrainSpeed {
            id: dto.id,
            speed: dto.speed,
            light: dto.light,
        }
    }
}

impl From<SetSwitchDto> for LayoutCommand {
    fn from(dto: SetSwitchDto) -> Self {
        LayoutCommand::SetSwitch {
            id: dto.id,
            direction: dto.direction.into(),
        }
    }
}

/// Snapshot of the layout sent to consumers on each tick. Field names stay
/// camelCase on the wire for the browser-side renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickPayloadDto {
    pub time_ms: u64,
    pub trains: Vec<TrainStateDto>,
    pub draw_track: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub straight_tracks: Option<Vec<[PointDto; 2]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bezier_tracks: Option<Vec<[PointDto; 4]>>,
}

impl From<TickPayload> for TickPayloadDto {
    fn from(payload: TickPayload) -> Self {
        Self {
            time_ms: payload.time_ms,
            trains: payload.trains.iter().map(TrainStateDto::from).collect(),
            draw_track: payload.draw_track,
            straight_tracks: payload
                .straight_tracks
                .map(|tracks| tracks.into_iter().map(|p| p.map(PointDto::from)).collect()),
            bezier_tracks: payload
                .bezier_tracks
                .map(|tracks| tracks.into_iter().map(|p| p.map(PointDto::from)).collect()),
        }
    }
}

/// Per-train state in a tick payload; absent fields were unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainStateDto {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<PoseDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reversed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<TrainDimensionsDto>,
}

impl From<&TrainTickState> for TrainStateDto {
    fn from(state: &TrainTickState) -> Self {
        Self {
            id: state.id,
            position: state.position.map(PoseDto::from),
            speed: state.speed,
            light: state.light,
            reversed: state.reversed,
            dimensions: state.dimensions.map(TrainDimensionsDto::from),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoseDto {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

impl From<Pose> for PoseDto {
    fn from(pose: Pose) -> Self {
        Self {
            x: pose.x,
            y: pose.y,
            angle: pose.angle,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointDto {
    pub x: f32,
    pub y: f32,
}

impl From<Point> for PointDto {
    fn from(point: Point) -> Self {
        Self {
            x: point.x,
            y: point.y,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainDimensionsDto {
    pub length: f32,
    pub width: f32,
    pub wheel_offset: f32,
}

impl From<TrainDimensions> for TrainDimensionsDto {
    fn from(dims: TrainDimensions) -> Self {
        Self {
            length: dims.length,
            width: dims.width,
            wheel_offset: dims.wheel_offset,
        }
    }
}
