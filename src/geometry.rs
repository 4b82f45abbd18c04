//! Axis-aligned pixel boxes and overlap geometry.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates, corners inclusive of `(x1, y1)`.
///
/// Well-formed boxes satisfy `x1 <= x2` and `y1 <= y2`. Constructors do not
/// enforce this; use [`BoundingBox::is_well_formed`] at trust boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn is_well_formed(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2
    }

    pub fn width(&self) -> i64 {
        i64::from(self.x2) - i64::from(self.x1)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.y2) - i64::from(self.y1)
    }

    /// Signed area from the raw corners. Negative for inverted boxes.
    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Area of the overlap with `other`, zero when the boxes are disjoint.
    pub fn intersection_area(&self, other: &BoundingBox) -> i64 {
        let left = self.x1.max(other.x1);
        let top = self.y1.max(other.y1);
        let right = self.x2.min(other.x2);
        let bottom = self.y2.min(other.y2);

        let w = (i64::from(right) - i64::from(left)).max(0);
        let h = (i64::from(bottom) - i64::from(top)).max(0);
        w * h
    }

    /// Corners as fractions of a `width` x `height` frame, `[x1, y1, x2, y2]`.
    ///
    /// `None` when either dimension is zero.
    pub fn normalized(&self, width: u32, height: u32) -> Option<[f64; 4]> {
        if width == 0 || height == 0 {
            return None;
        }
        let (w, h) = (f64::from(width), f64::from(height));
        Some([
            f64::from(self.x1) / w,
            f64::from(self.y1) / h,
            f64::from(self.x2) / w,
            f64::from(self.y2) / h,
        ])
    }

    /// Inverse of [`BoundingBox::normalized`]. Scaled corners are truncated
    /// toward zero and saturate at the `i32` range.
    pub fn from_normalized(coords: [f64; 4], width: u32, height: u32) -> Self {
        let (w, h) = (f64::from(width), f64::from(height));
        let [x1, y1, x2, y2] = coords;
        Self::new(
            (x1 * w) as i32,
            (y1 * h) as i32,
            (x2 * w) as i32,
            (y2 * h) as i32,
        )
    }
}

/// Intersection-over-union of two boxes.
///
/// Returns exactly `0.0` when the union area is zero. Both boxes must be
/// well-formed; inverted corners yield negative areas and a meaningless ratio.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let intersection = a.intersection_area(b);
    let union = a.area() + b.area() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}
