use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the rectangle consolidation core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// A rectangle whose top-left corner is not above and to the left of its bottom-right corner.
    #[error("invalid geometry: ({x1}, {y1})-({x2}, {y2}) is not a well-formed rectangle")]
    InvalidGeometry { x1: i32, y1: i32, x2: i32, y2: i32 },
    /// Two merged rectangles still overlap, so a detection could be counted twice.
    #[error("merged regions {first} and {second} overlap")]
    OverlappingRegions { first: Rect, second: Rect },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle given by its top-left and bottom-right corners.
///
/// A `Rect` can only be built through [`Rect::new`] (or deserialised through the same check), so
/// `x1 <= x2` and `y1 <= y2` always hold. Rectangles are never mutated; [`Rect::union`] returns a
/// new one.
///
/// Serialised as `[[x1, y1], [x2, y2]]`, the point layout used by the annotation files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[[i32; 2]; 2]", into = "[[i32; 2]; 2]")]
pub struct Rect {
    top_left: Point,
    bottom_right: Point,
}

impl Rect {
    pub fn new(
        top_left: impl Into<Point>,
        bottom_right: impl Into<Point>,
    ) -> Result<Self, GeometryError> {
        let top_left = top_left.into();
        let bottom_right = bottom_right.into();

        if top_left.x > bottom_right.x || top_left.y > bottom_right.y {
            return Err(GeometryError::InvalidGeometry {
                x1: top_left.x,
                y1: top_left.y,
                x2: bottom_right.x,
                y2: bottom_right.y,
            });
        }

        Ok(Self {
            top_left,
            bottom_right,
        })
    }

    /// Widened so a box spanning the whole `i32` range cannot overflow.
    pub fn width(&self) -> i64 {
        i64::from(self.bottom_right.x) - i64::from(self.top_left.x)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.bottom_right.y) - i64::from(self.top_left.y)
    }

    /// Inclusive intersection test: rectangles sharing only an edge or a corner overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        !(self.bottom_right.x < other.top_left.x
            || other.bottom_right.x < self.top_left.x
            || self.bottom_right.y < other.top_left.y
            || other.bottom_right.y < self.top_left.y)
    }

    /// The smallest rectangle enclosing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            top_left: Point::new(
                self.top_left.x.min(other.top_left.x),
                self.top_left.y.min(other.top_left.y),
            ),
            bottom_right: Point::new(
                self.bottom_right.x.max(other.bottom_right.x),
                self.bottom_right.y.max(other.bottom_right.y),
            ),
        }
    }

    /// Whether `other` lies entirely inside `self` (edges included).
    pub fn contains(&self, other: &Rect) -> bool {
        self.top_left.x <= other.top_left.x
            && self.top_left.y <= other.top_left.y
            && self.bottom_right.x >= other.bottom_right.x
            && self.bottom_right.y >= other.bottom_right.y
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})-({}, {})",
            self.top_left.x, self.top_left.y, self.bottom_right.x, self.bottom_right.y
        )
    }
}

impl TryFrom<[[i32; 2]; 2]> for Rect {
    type Error = GeometryError;

    fn try_from([[x1, y1], [x2, y2]]: [[i32; 2]; 2]) -> Result<Self, Self::Error> {
        Rect::new((x1, y1), (x2, y2))
    }
}

impl From<Rect> for [[i32; 2]; 2] {
    fn from(rect: Rect) -> Self {
        [
            [rect.top_left.x, rect.top_left.y],
            [rect.bottom_right.x, rect.bottom_right.y],
        ]
    }
}
