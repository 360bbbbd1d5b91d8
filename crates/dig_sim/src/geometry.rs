//! Grid positions, cardinal orientations and the canonical-frame rotation.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, TAU};
use std::fmt;
use std::ops::{Add, Sub};

/// Integer grid coordinate. `y` grows downward.
///
/// Ordering is row-major (y first, then x) so that ordered collections of
/// positions iterate the grid the same way the dense cell buffer does.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// One step in `orientation`.
    #[must_use]
    pub fn step(self, orientation: Orientation) -> Self {
        let (dx, dy) = orientation.vector();
        Self::new(self.x + dx, self.y + dy)
    }

    /// One step against `orientation`.
    #[must_use]
    pub fn step_back(self, orientation: Orientation) -> Self {
        let (dx, dy) = orientation.vector();
        Self::new(self.x - dx, self.y - dy)
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        self.distance_to(other.x as f32, other.y as f32)
    }

    #[must_use]
    pub fn distance_to(self, x: f32, y: f32) -> f32 {
        (self.x as f32 - x).hypot(self.y as f32 - y)
    }

    /// The four orthogonal neighbors in [`Orientation::EDGES`] order.
    pub fn orthogonal_neighbors(self) -> impl Iterator<Item = Position> {
        Orientation::EDGES.into_iter().map(move |o| self.step(o))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for Position {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The side of a cell an agent stands on. Only the four cardinals exist.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Up,
    Down,
    Left,
    Right,
}

impl Orientation {
    /// Edge probing order used when listing the open sides of a cell.
    pub const EDGES: [Orientation; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Scan order used when repairing a stale orientation.
    pub const REPAIR_ORDER: [Orientation; 4] = [Self::Down, Self::Left, Self::Up, Self::Right];

    #[must_use]
    pub const fn vector(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    #[must_use]
    pub fn from_vector(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(Self::Up),
            (0, 1) => Some(Self::Down),
            (-1, 0) => Some(Self::Left),
            (1, 0) => Some(Self::Right),
            _ => None,
        }
    }

    /// Buckets an angle (radians, screen space) into one of four quarter
    /// slices centered on the cardinals.
    #[must_use]
    pub fn from_angle(angle: f32) -> Self {
        let normalized = (angle - FRAC_PI_4).rem_euclid(TAU);
        match (normalized / FRAC_PI_2) as u32 {
            0 => Self::Down,
            1 => Self::Left,
            2 => Self::Up,
            _ => Self::Right,
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self {
            Self::Up => '↑',
            Self::Down => '↓',
            Self::Left => '←',
            Self::Right => '→',
        };
        write!(f, "{arrow}")
    }
}

/// Rotates `position` into the frame where `orientation` points up.
///
/// Used only to compare leftness/rightness of walk candidates; stored
/// positions are never rotated. `width` and `height` are the grid size.
#[must_use]
pub fn to_canonical_frame(
    position: Position,
    orientation: Orientation,
    width: i32,
    height: i32,
) -> Position {
    let Position { x, y } = position;
    match orientation {
        Orientation::Up => position,
        // 180°
        Orientation::Down => Position::new(width - 1 - x, height - 1 - y),
        // 90° clockwise
        Orientation::Left => Position::new(height - 1 - y, x),
        // 90° counter-clockwise
        Orientation::Right => Position::new(y, width - 1 - x),
    }
}
