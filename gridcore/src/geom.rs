//! Integer pixel geometry.
use cgmath::{Point2, Vector2};

use crate::sections::Size;

/// An axis-aligned rectangle in pixel coordinates, represented by its
/// minimum (inclusive) and maximum (exclusive) corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub min: Point2<Size>,
    pub max: Point2<Size>,
}

impl Rect {
    pub fn new(min: Point2<Size>, max: Point2<Size>) -> Self {
        Self { min, max }
    }

    /// Construct a rectangle from its origin and size.
    pub fn with_size(origin: Point2<Size>, size: Vector2<Size>) -> Self {
        Self {
            min: origin,
            max: origin + size,
        }
    }

    pub fn from_xywh(x: Size, y: Size, width: Size, height: Size) -> Self {
        Self {
            min: Point2::new(x, y),
            max: Point2::new(x + width, y + height),
        }
    }

    pub fn zero() -> Self {
        Self::from_xywh(0, 0, 0, 0)
    }

    pub fn x(&self) -> Size {
        self.min.x
    }

    pub fn y(&self) -> Size {
        self.min.y
    }

    pub fn width(&self) -> Size {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> Size {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Vector2<Size> {
        self.max - self.min
    }

    /// A rectangle is empty if it covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    /// The intersection of two rectangles. The result may be empty.
    pub fn intersection(&self, other: &Rect) -> Rect {
        Rect {
            min: Point2::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y)),
            max: Point2::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y)),
        }
    }

    pub fn translate(&self, d: Vector2<Size>) -> Rect {
        Rect {
            min: self.min + d,
            max: self.max + d,
        }
    }

    pub fn contains_point(&self, p: Point2<Size>) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }
}
