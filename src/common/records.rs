use serde::{Deserialize, Serialize};
use crate::common::{ScreenBox, WorldPosition};

/// Marker for a printed price label. Only used to avoid counting the same label twice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub bbox: ScreenBox,
    pub world_position: WorldPosition,
}

/// One distinct vertical shelf band. `id` stays `0` until the layout pass numbers the bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShelfRecord {
    pub bbox: ScreenBox,
    pub world_position: WorldPosition,
    pub id: u32,
}

/// Horizontal zone bounded by two paired endpoint markers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BayRecord {
    pub id: u32,
    pub endpoint_left: Option<WorldPosition>,
    pub endpoint_right: Option<WorldPosition>,
}

impl BayRecord {
    pub fn new(id: u32, left: WorldPosition, right: WorldPosition) -> Self {
        Self {
            id,
            endpoint_left: Some(left),
            endpoint_right: Some(right),
        }
    }

    /// Both horizontal endpoint coordinates, if both endpoints are known.
    pub fn horizontal_span(&self) -> Option<(f32, f32)> {
        match (self.endpoint_left, self.endpoint_right) {
            (Some(l), Some(r)) => Some((l.x, r.x)),
            _ => None,
        }
    }

    /// Strict containment of a horizontal coordinate between the two endpoints.
    pub fn contains_x(&self, x: f32) -> Option<bool> {
        self.horizontal_span().map(|(l, r)| x > l && x < r)
    }
}
