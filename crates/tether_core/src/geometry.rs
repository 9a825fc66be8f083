//! Scroll geometry shared by the page model and the canvas
//!
//! Values carry no coordinate-space tag. Callers track whether a point is in
//! page pixels or scene units.

use std::ops::{Add, AddAssign, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A 2D offset, either in page pixels or canvas scene units
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollPoint {
    pub x: f64,
    pub y: f64,
}

impl ScrollPoint {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when both axes are exactly zero
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Component-wise comparison within `tolerance`
    pub fn approx_eq(self, other: Self, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }

    /// Scale both axes
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl Add for ScrollPoint {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for ScrollPoint {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for ScrollPoint {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for ScrollPoint {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl From<(f64, f64)> for ScrollPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Width and height of a box
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in client (viewport) coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn top_left(&self) -> ScrollPoint {
        ScrollPoint::new(self.left, self.top)
    }

    pub fn bottom_right(&self) -> ScrollPoint {
        ScrollPoint::new(self.left + self.width, self.top + self.height)
    }

    /// Zero-width or zero-height rects are not rendered and never hit
    pub fn has_area(&self) -> bool {
        self.width != 0.0 && self.height != 0.0
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_arithmetic() {
        let a = ScrollPoint::new(10.0, -4.0);
        let b = ScrollPoint::new(2.5, 1.0);

        assert_eq!(a + b, ScrollPoint::new(12.5, -3.0));
        assert_eq!(a - b, ScrollPoint::new(7.5, -5.0));
        assert_eq!(-a, ScrollPoint::new(-10.0, 4.0));
        assert!((a - a).is_zero());
    }

    #[test]
    fn test_rect_area() {
        assert!(Rect::new(0.0, 0.0, 10.0, 10.0).has_area());
        assert!(!Rect::new(5.0, 5.0, 0.0, 10.0).has_area());
        assert_eq!(
            Rect::new(5.0, 5.0, 10.0, 20.0).bottom_right(),
            ScrollPoint::new(15.0, 25.0)
        );
    }
}
