use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in screen pixels.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize, PartialOrd)]
pub struct ScreenBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub w: f32,
    pub h: f32,
}

impl ScreenBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            w: x2 - x1,
            h: y2 - y1,
        }
    }

    pub fn left(&self) -> f32 {
        self.x1
    }

    pub fn top(&self) -> f32 {
        self.y1
    }

    pub fn right(&self) -> f32 {
        self.x2
    }

    pub fn bottom(&self) -> f32 {
        self.y2
    }

    pub fn width(&self) -> f32 {
        self.w
    }

    pub fn height(&self) -> f32 {
        self.h
    }

    /// Returns the center x-coordinate of the bounding box.
    pub fn cx(&self) -> f32 {
        (self.x1 + self.x2) / 2.
    }

    /// Returns the center y-coordinate of the bounding box.
    pub fn cy(&self) -> f32 {
        (self.y1 + self.y2) / 2.
    }

    /// Computes the area of the bounding box. Degenerate boxes have zero area.
    pub fn area(&self) -> f32 {
        self.w.max(0.) * self.h.max(0.)
    }

    /// Computes the intersection area between this bounding box and another.
    pub fn intersect(&self, other: &ScreenBox) -> f32 {
        let left = self.x1.max(other.x1);
        let right = self.x2.min(other.x2);
        let top = self.y1.max(other.y1);
        let bottom = self.y2.min(other.y2);
        (right - left).max(0.) * (bottom - top).max(0.)
    }

    /// Computes the union area between this bounding box and another.
    pub fn union(&self, other: &ScreenBox) -> f32 {
        self.area() + other.area() - self.intersect(other)
    }

    /// Intersection over union. Zero when the boxes do not overlap.
    pub fn iou(&self, other: &ScreenBox) -> f32 {
        let inter = self.intersect(other);
        if inter <= 0. {
            return 0.;
        }
        let union = self.union(other);
        if union <= 0. {
            return 0.;
        }
        inter / union
    }

    /// Rescales both axes independently, e.g. from model space into screen space.
    pub fn scale_xy(self, sx: f32, sy: f32) -> Self {
        Self::new(self.x1 * sx, self.y1 * sy, self.x2 * sx, self.y2 * sy)
    }

    /// Sets the bounding box's coordinates using `(x1, y1, x2, y2)` and calculates width and height.
    pub fn with_x1y1_x2y2(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;

        self.w = x2 - x1;
        self.h = y2 - y1;
        self
    }
}
