use std::ops::{Add, Sub};

/// Integer pixel position.
///
/// Ordering is lexicographic on `(x, y)`; use [`PixelCoordinate::le_both`]
/// for rectangle containment checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PixelCoordinate {
    pub x: i64,
    pub y: i64,
}

impl PixelCoordinate {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Component-wise `<=`.
    pub fn le_both(&self, other: &PixelCoordinate) -> bool {
        self.x <= other.x && self.y <= other.y
    }

    /// Clamp into `[0, width-1] x [0, height-1]`.
    pub fn clip(self, width: usize, height: usize) -> Self {
        Self {
            x: self.x.clamp(0, width.saturating_sub(1) as i64),
            y: self.y.clamp(0, height.saturating_sub(1) as i64),
        }
    }

    /// True when inside an image of the given size.
    pub fn is_inside(&self, width: usize, height: usize) -> bool {
        self.x >= 0 && self.y >= 0 && (self.x as usize) < width && (self.y as usize) < height
    }
}

impl Add for PixelCoordinate {
    type Output = PixelCoordinate;

    fn add(self, rhs: PixelCoordinate) -> PixelCoordinate {
        PixelCoordinate::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for PixelCoordinate {
    type Output = PixelCoordinate;

    fn sub(self, rhs: PixelCoordinate) -> PixelCoordinate {
        PixelCoordinate::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<(i64, i64)> for PixelCoordinate {
    fn from((x, y): (i64, i64)) -> Self {
        Self::new(x, y)
    }
}
