//! Plain geometry shared by the render tracker, viewport and editor.
//!
//! Bounding boxes are stored the way the detection model reports them:
//! `(x, y)` is the box **center** in original image pixels.

use serde::{Deserialize, Serialize};

/// Smallest side, in image pixels, a contour may be resized or drawn to.
pub const MIN_BOX_SIDE: f64 = 10.0;

/// Geometry deltas at or below this are treated as "no change".
pub const GEOMETRY_EPSILON: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// Axis-aligned rectangle given by its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Normalized rectangle spanned by two arbitrary corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Square of side `2 * radius` centered on `p`.
    pub fn around(p: Point, radius: f64) -> Self {
        Self {
            x: p.x - radius,
            y: p.y - radius,
            width: radius * 2.0,
            height: radius * 2.0,
        }
    }
}

/// Center-based box in original image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a box from its four edges.
    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        let width = right - left;
        let height = bottom - top;
        Self {
            x: left + width / 2.0,
            y: top + height / 2.0,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.x - self.width / 2.0
    }

    pub fn top(&self) -> f64 {
        self.y - self.height / 2.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn position_differs(&self, other: &Self) -> bool {
        (self.x - other.x).abs() > GEOMETRY_EPSILON || (self.y - other.y).abs() > GEOMETRY_EPSILON
    }

    pub fn size_differs(&self, other: &Self) -> bool {
        (self.width - other.width).abs() > GEOMETRY_EPSILON
            || (self.height - other.height).abs() > GEOMETRY_EPSILON
    }

    pub fn differs(&self, other: &Self) -> bool {
        self.position_differs(other) || self.size_differs(other)
    }

    pub fn fits_within(&self, bounds: Size) -> bool {
        self.left() >= 0.0
            && self.top() >= 0.0
            && self.right() <= bounds.width
            && self.bottom() <= bounds.height
    }

    /// Keep the size (capped to the image) and move the center so that the
    /// box lies inside `[0, width] x [0, height]`.
    pub fn confined_to(&self, bounds: Size) -> Self {
        let width = self.width.min(bounds.width);
        let height = self.height.min(bounds.height);
        Self {
            x: clamp_center(self.x, width / 2.0, bounds.width),
            y: clamp_center(self.y, height / 2.0, bounds.height),
            width,
            height,
        }
    }
}

/// Clamp a center coordinate so that `[v - half, v + half]` stays in `[0, extent]`.
/// When `extent - half < half` the lower bound wins.
fn clamp_center(v: f64, half: f64, extent: f64) -> f64 {
    v.min(extent - half).max(half)
}
