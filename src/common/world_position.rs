use serde::{Deserialize, Serialize};

/// Translation of a world-anchored pose, as reported by the tracking collaborator.
///
/// `x` is the horizontal axis, `y` the vertical axis (up), `z` depth.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WorldPosition {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in world space.
    pub fn distance(&self, other: &WorldPosition) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn vertical_distance(&self, other: &WorldPosition) -> f32 {
        (self.y - other.y).abs()
    }

    /// `true` when `x` lies inside the interval spanned by `self.x * (1 - ratio)` and
    /// `self.x * (1 + ratio)`, bounds included.
    pub fn within_horizontal_ratio(&self, x: f32, ratio: f32) -> bool {
        let a = self.x * (1. - ratio);
        let b = self.x * (1. + ratio);
        x >= a.min(b) && x <= a.max(b)
    }
}
