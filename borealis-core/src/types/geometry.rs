//! Integer geometry types used for scanout rectangles.

use serde::{Deserialize, Serialize};

/// A point with integer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PointInt {
    pub x: i32,
    pub y: i32,
}

impl PointInt {
    pub const ZERO: PointInt = PointInt { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A size with unsigned integer dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SizeInt {
    pub width: u32,
    pub height: u32,
}

impl SizeInt {
    pub const ZERO: SizeInt = SizeInt {
        width: 0,
        height: 0,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An axis-aligned rectangle with integer position and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RectInt {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl RectInt {
    pub const ZERO: RectInt = RectInt {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn position(&self) -> PointInt {
        PointInt::new(self.x, self.y)
    }

    pub fn size(&self) -> SizeInt {
        SizeInt::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether this rectangle lies entirely within `bounds`.
    pub fn contained_in(&self, bounds: &RectInt) -> bool {
        if self.is_empty() || bounds.is_empty() {
            return false;
        }
        self.x >= bounds.x
            && self.y >= bounds.y
            && self.x.saturating_add(self.width as i32)
                <= bounds.x.saturating_add(bounds.width as i32)
            && self.y.saturating_add(self.height as i32)
                <= bounds.y.saturating_add(bounds.height as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_is_empty() {
        assert!(RectInt::new(0, 0, 0, 10).is_empty());
        assert!(RectInt::new(0, 0, 10, 0).is_empty());
        assert!(!RectInt::new(0, 0, 1, 1).is_empty());
    }

    #[test]
    fn test_rect_contained_in() {
        let bounds = RectInt::new(0, 0, 1920, 1080);
        assert!(RectInt::new(0, 0, 1920, 1080).contained_in(&bounds));
        assert!(RectInt::new(100, 100, 200, 200).contained_in(&bounds));
        assert!(!RectInt::new(1800, 0, 200, 100).contained_in(&bounds));
        assert!(!RectInt::new(-1, 0, 10, 10).contained_in(&bounds));
    }

    #[test]
    fn test_empty_rect_never_contained() {
        let bounds = RectInt::new(0, 0, 100, 100);
        assert!(!RectInt::ZERO.contained_in(&bounds));
    }

    #[test]
    fn test_point_and_size_accessors() {
        let rect = RectInt::new(5, -3, 64, 32);
        assert_eq!(rect.position(), PointInt::new(5, -3));
        assert_eq!(rect.size(), SizeInt::new(64, 32));
    }
}
