//! Pixel geometry for screenshots and diff regions.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count (width * height).
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned pixel rectangle, right and bottom edges exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Bounds {
    /// Left column
    pub x: u32,
    /// Top row
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Bounds {
    /// Create new bounds.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A 1x1 box covering a single pixel.
    pub fn pixel(x: u32, y: u32) -> Self {
        Self::new(x, y, 1, 1)
    }

    /// Grow the box to also cover pixel `(x, y)`.
    pub fn include(&mut self, x: u32, y: u32) {
        let right = self.right().max(x + 1);
        let bottom = self.bottom().max(y + 1);
        self.x = self.x.min(x);
        self.y = self.y.min(y);
        self.width = right - self.x;
        self.height = bottom - self.y;
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Check if a pixel lies within these bounds.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Area in pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{}) {}x{}", self.x, self.y, self.width, self.height)
    }
}
