//! Playfield geometry: axis-aligned rectangles, bearings and angle helpers.
//!
//! Screen space: origin at the top-left corner, `+x` right, `+y` down.
//! Angles are in degrees, measured from `+x` toward `+y`, so 90° points
//! straight down the screen and -90° straight up.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Bearing used whenever an aim vector degenerates to zero length.
pub const DEFAULT_BEARING: Vec2 = Vec2::Y;

/// Angle (degrees) of [`DEFAULT_BEARING`].
pub const DOWN_DEG: f32 = 90.0;

/// Below this length a vector is treated as zero.
const DEGENERATE_LEN: f32 = 1e-4;

/// Axis-aligned rectangle stored as center + half extents.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub center: Vec2,
    pub half: Vec2,
}

impl Rect {
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        Self {
            center,
            half: size.abs() * 0.5,
        }
    }

    pub fn min(&self) -> Vec2 {
        self.center - self.half
    }

    pub fn max(&self) -> Vec2 {
        self.center + self.half
    }

    pub fn left(&self) -> f32 {
        self.center.x - self.half.x
    }

    pub fn right(&self) -> f32 {
        self.center.x + self.half.x
    }

    pub fn top(&self) -> f32 {
        self.center.y - self.half.y
    }

    pub fn bottom(&self) -> f32 {
        self.center.y + self.half.y
    }

    /// Strict overlap: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        let delta = (self.center - other.center).abs();
        let reach = self.half + other.half;
        delta.x < reach.x && delta.y < reach.y
    }

    /// Same center, extents multiplied by `ratio`.
    pub fn scaled(&self, ratio: f32) -> Rect {
        Rect {
            center: self.center,
            half: self.half * ratio.max(0.0),
        }
    }

    /// Move the rectangle the least amount needed to lie inside `bounds`.
    /// A rectangle larger than `bounds` is centered on that axis.
    pub fn clamped_inside(&self, bounds: &Rect) -> Rect {
        let lo = bounds.min() + self.half;
        let hi = bounds.max() - self.half;
        let axis = |v: f32, lo: f32, hi: f32, mid: f32| if lo > hi { mid } else { v.clamp(lo, hi) };
        Rect {
            center: Vec2::new(
                axis(self.center.x, lo.x, hi.x, bounds.center.x),
                axis(self.center.y, lo.y, hi.y, bounds.center.y),
            ),
            half: self.half,
        }
    }
}

/// The rectangle projectiles and items live in. Top-left corner is `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Playfield {
    pub width: f32,
    pub height: f32,
}

impl Playfield {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_center_size(self.center(), Vec2::new(self.width, self.height))
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// True when `body` has fully left the field and `velocity` does not
    /// carry it back in. A body sitting just outside an edge but heading
    /// inward (e.g. freshly spawned above the top) is kept.
    pub fn has_left(&self, body: &Rect, velocity: Vec2) -> bool {
        (body.right() < 0.0 && velocity.x <= 0.0)
            || (body.left() > self.width && velocity.x >= 0.0)
            || (body.bottom() < 0.0 && velocity.y <= 0.0)
            || (body.top() > self.height && velocity.y >= 0.0)
    }
}

/// Unit vector from `from` toward `to`, or [`DEFAULT_BEARING`] when the two
/// points coincide.
pub fn bearing(from: Vec2, to: Vec2) -> Vec2 {
    let delta = to - from;
    if delta.length() < DEGENERATE_LEN {
        DEFAULT_BEARING
    } else {
        delta.normalize()
    }
}

/// Angle (degrees) of the bearing from `from` toward `to`.
pub fn bearing_deg(from: Vec2, to: Vec2) -> f32 {
    angle_of(bearing(from, to))
}

/// Unit vector for an angle in degrees.
pub fn unit_from_deg(deg: f32) -> Vec2 {
    Vec2::from_angle(deg.to_radians())
}

pub fn angle_of(dir: Vec2) -> f32 {
    dir.y.atan2(dir.x).to_degrees()
}

/// Wrap an angle into `[0, 360)`.
pub fn wrap_deg(deg: f32) -> f32 {
    deg.rem_euclid(360.0)
}
