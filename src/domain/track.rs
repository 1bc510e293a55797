// Track geometry and layout topology.
//
// Geometry is immutable after construction; the only mutable piece of track
// state is a switch's direction. Connectivity between tracks is wired once by
// the registration feed and never changes afterwards.

/// A point in layout coordinates (pixels, y grows downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn distance(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A sampled location on a track: world position plus the tangent angle of
/// the path at that location, in radians, pointing from end A toward end B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

/// Which onward path a switch routes facing-point moves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchDirection {
    Straight,
    Diverging,
}

/// The ends of a track where a neighbor can attach. Plain tracks have `A` and
/// `B`; a switch's common entry is `A`, its straight leg exits at `B` and its
/// diverging leg at `DivergingB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEnd {
    A,
    B,
    DivergingB,
}

/// One side of a joint: the neighboring track and which of its ends abuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub track: u64,
    pub end: TrackEnd,
}

#[derive(Debug, Clone, Copy, Default)]
struct TrackLinks {
    a: Option<Link>,
    b: Option<Link>,
    diverging_b: Option<Link>,
}

/// A straight segment between two control points.
#[derive(Debug, Clone)]
pub struct StraightTrack {
    points: [Point; 2],
}

impl StraightTrack {
    pub fn new(a: Point, b: Point) -> Self {
        Self { points: [a, b] }
    }

    pub fn control_points(&self) -> [Point; 2] {
        self.points
    }

    pub fn length(&self) -> f32 {
        self.points[0].distance(self.points[1])
    }

    pub fn pose_at(&self, distance: f32) -> Pose {
        let [a, b] = self.points;
        let len = self.length();
        let t = if len > f32::EPSILON {
            (distance / len).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Pose {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
            angle: (b.y - a.y).atan2(b.x - a.x),
        }
    }
}

// Sample count for the arc-length table; enough that chord error stays well
// under a pixel for track-sized curves.
const ARC_SAMPLES: usize = 32;

/// A cubic bezier segment: two endpoints and two control handles.
///
/// An arc-length table is built once at construction so distance lookups are
/// uniform in track length rather than in the curve parameter.
#[derive(Debug, Clone)]
pub struct BezierTrack {
    points: [Point; 4],
    // arc[i] = path length from A to the sample at t = i / ARC_SAMPLES.
    arc: Vec<f32>,
}

impl BezierTrack {
    pub fn new(points: [Point; 4]) -> Self {
        let mut arc = Vec::with_capacity(ARC_SAMPLES + 1);
        arc.push(0.0);
        let mut prev = points[0];
        let mut cumulative = 0.0f32;
        for i in 1..=ARC_SAMPLES {
            let t = i as f32 / ARC_SAMPLES as f32;
            let p = eval_cubic(&points, t);
            cumulative += prev.distance(p);
            arc.push(cumulative);
            prev = p;
        }
        Self { points, arc }
    }

    pub fn control_points(&self) -> [Point; 4] {
        self.points
    }

    pub fn length(&self) -> f32 {
        *self.arc.last().unwrap_or(&0.0)
    }

    pub fn pose_at(&self, distance: f32) -> Pose {
        let target = distance.clamp(0.0, self.length());
        let idx = self
            .arc
            .partition_point(|&len| len < target)
            .clamp(1, ARC_SAMPLES);

        let len_before = self.arc[idx - 1];
        let len_after = self.arc[idx];
        let frac = if (len_after - len_before).abs() > f32::EPSILON {
            (target - len_before) / (len_after - len_before)
        } else {
            0.0
        };

        let t = ((idx - 1) as f32 + frac) / ARC_SAMPLES as f32;
        let p = eval_cubic(&self.points, t);
        let d = eval_cubic_derivative(&self.points, t);
        Pose {
            x: p.x,
            y: p.y,
            angle: d.y.atan2(d.x),
        }
    }
}

/// B(t) = (1-t)^3 P0 + 3(1-t)^2 t P1 + 3(1-t) t^2 P2 + t^3 P3
fn eval_cubic(p: &[Point; 4], t: f32) -> Point {
    let inv = 1.0 - t;
    let inv2 = inv * inv;
    let t2 = t * t;
    Point {
        x: inv2 * inv * p[0].x + 3.0 * inv2 * t * p[1].x + 3.0 * inv * t2 * p[2].x + t2 * t * p[3].x,
        y: inv2 * inv * p[0].y + 3.0 * inv2 * t * p[1].y + 3.0 * inv * t2 * p[2].y + t2 * t * p[3].y,
    }
}

/// B'(t) = 3(1-t)^2 (P1-P0) + 6(1-t) t (P2-P1) + 3 t^2 (P3-P2)
fn eval_cubic_derivative(p: &[Point; 4], t: f32) -> Point {
    let inv = 1.0 - t;
    Point {
        x: 3.0 * inv * inv * (p[1].x - p[0].x)
            + 6.0 * inv * t * (p[2].x - p[1].x)
            + 3.0 * t * t * (p[3].x - p[2].x),
        y: 3.0 * inv * inv * (p[1].y - p[0].y)
            + 6.0 * inv * t * (p[2].y - p[1].y)
            + 3.0 * t * t * (p[3].y - p[2].y),
    }
}

/// A switch: a straight leg and a diverging bezier leg sharing the common
/// entry point at end A, plus the direction selecting which leg facing-point
/// moves take.
#[derive(Debug, Clone)]
pub struct SwitchTrack {
    straight: StraightTrack,
    diverging: BezierTrack,
    direction: SwitchDirection,
}

impl SwitchTrack {
    pub fn new(straight: StraightTrack, diverging: BezierTrack) -> Self {
        Self {
            straight,
            diverging,
            direction: SwitchDirection::Straight,
        }
    }

    pub fn direction(&self) -> SwitchDirection {
        self.direction
    }

    /// Stores the new direction. Idempotent; does not check train occupancy.
    pub fn change_direction(&mut self, direction: SwitchDirection) {
        self.direction = direction;
    }

    pub fn straight_leg(&self) -> &StraightTrack {
        &self.straight
    }

    pub fn diverging_leg(&self) -> &BezierTrack {
        &self.diverging
    }
}

#[derive(Debug, Clone)]
pub enum TrackKind {
    Straight(StraightTrack),
    Bezier(BezierTrack),
    Switch(SwitchTrack),
}

/// A layout segment with a stable, externally assigned identity.
#[derive(Debug, Clone)]
pub struct Track {
    id: u64,
    kind: TrackKind,
    links: TrackLinks,
}

impl Track {
    pub fn straight(id: u64, a: Point, b: Point) -> Self {
        Self {
            id,
            kind: TrackKind::Straight(StraightTrack::new(a, b)),
            links: TrackLinks::default(),
        }
    }

    pub fn bezier(id: u64, points: [Point; 4]) -> Self {
        Self {
            id,
            kind: TrackKind::Bezier(BezierTrack::new(points)),
            links: TrackLinks::default(),
        }
    }

    pub fn switch(id: u64, straight: StraightTrack, diverging: BezierTrack) -> Self {
        Self {
            id,
            kind: TrackKind::Switch(SwitchTrack::new(straight, diverging)),
            links: TrackLinks::default(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> &TrackKind {
        &self.kind
    }

    /// Capability query used by command routing: `None` for non-switches.
    pub fn as_switch(&self) -> Option<&SwitchTrack> {
        match &self.kind {
            TrackKind::Switch(switch) => Some(switch),
            _ => None,
        }
    }

    pub fn as_switch_mut(&mut self) -> Option<&mut SwitchTrack> {
        match &mut self.kind {
            TrackKind::Switch(switch) => Some(switch),
            _ => None,
        }
    }

    /// Length of the traversal path across this track. `leg` selects the
    /// switch leg and is ignored for plain tracks.
    pub fn path_length(&self, leg: SwitchDirection) -> f32 {
        match &self.kind {
            TrackKind::Straight(track) => track.length(),
            TrackKind::Bezier(track) => track.length(),
            TrackKind::Switch(switch) => match leg {
                SwitchDirection::Straight => switch.straight.length(),
                SwitchDirection::Diverging => switch.diverging.length(),
            },
        }
    }

    /// Pose at `distance` from end A along the traversal path.
    pub fn pose_at(&self, leg: SwitchDirection, distance: f32) -> Pose {
        match &self.kind {
            TrackKind::Straight(track) => track.pose_at(distance),
            TrackKind::Bezier(track) => track.pose_at(distance),
            TrackKind::Switch(switch) => match leg {
                SwitchDirection::Straight => switch.straight.pose_at(distance),
                SwitchDirection::Diverging => switch.diverging.pose_at(distance),
            },
        }
    }

    /// The exit end reached by travelling A-to-B along the given leg.
    pub fn exit_end(&self, leg: SwitchDirection) -> TrackEnd {
        match &self.kind {
            TrackKind::Switch(_) if leg == SwitchDirection::Diverging => TrackEnd::DivergingB,
            _ => TrackEnd::B,
        }
    }

    pub fn link_at(&self, end: TrackEnd) -> Option<Link> {
        match end {
            TrackEnd::A => self.links.a,
            TrackEnd::B => self.links.b,
            TrackEnd::DivergingB => self.links.diverging_b,
        }
    }

    /// Registration-time wiring; see [`connect`] for joining both sides.
    pub fn set_link(&mut self, end: TrackEnd, link: Link) {
        match end {
            TrackEnd::A => self.links.a = Some(link),
            TrackEnd::B => self.links.b = Some(link),
            TrackEnd::DivergingB => self.links.diverging_b = Some(link),
        }
    }
}

/// Joins two track ends symmetrically so a train can cross in either
/// direction.
pub fn connect(left: &mut Track, left_end: TrackEnd, right: &mut Track, right_end: TrackEnd) {
    left.set_link(
        left_end,
        Link {
            track: right.id(),
            end: right_end,
        },
    );
    right.set_link(
        right_end,
        Link {
            track: left.id(),
            end: left_end,
        },
    );
}
