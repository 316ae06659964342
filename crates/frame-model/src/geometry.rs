//! Frame geometry: detector boxes and crop rectangles.
//!
//! All coordinates are in source-frame pixels with `(0, 0)` at the top-left
//! corner. Boxes come from the detector as floating point values; crops are
//! planned in sub-pixel space (`CropRegion`) and emitted as whole pixels
//! (`CropRectangle`).

use serde::{Deserialize, Serialize};

/// Dimensions of a video frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width / height.
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Rectangle covering the whole frame.
    pub fn full_rect(&self) -> CropRectangle {
        CropRectangle {
            x1: 0,
            y1: 0,
            x2: self.width,
            y2: self.height,
        }
    }
}

impl From<(u32, u32)> for FrameSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned face box as reported by a detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// True when all four coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }

    /// True when the box is narrower or shorter than one pixel.
    pub fn is_degenerate(&self) -> bool {
        self.width() < 1.0 || self.height() < 1.0
    }

    /// Widen a degenerate box to at least 1×1, keeping its top-left corner.
    pub fn normalized(&self) -> Self {
        Self {
            x1: self.x1,
            y1: self.y1,
            x2: self.x2.max(self.x1 + 1.0),
            y2: self.y2.max(self.y1 + 1.0),
        }
    }
}

/// A crop in sub-pixel source coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CropRegion {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Region of the given size with its top-left corner at `(x1, y1)`.
    pub fn from_origin_size(x1: f64, y1: f64, width: f64, height: f64) -> Self {
        Self::new(x1, y1, x1 + width, y1 + height)
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn coords(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// True when all four coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.coords().iter().all(|c| c.is_finite())
    }

    /// Largest absolute per-coordinate difference to `other`.
    ///
    /// A NaN difference counts as infinitely far.
    pub fn max_delta(&self, other: &CropRegion) -> f64 {
        self.coords()
            .iter()
            .zip(other.coords().iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, |max, d| if d.is_nan() { f64::INFINITY } else { max.max(d) })
    }

    /// Per-coordinate blend: `a * (1 - t) + b * t`.
    pub fn lerp(a: &CropRegion, b: &CropRegion, t: f64) -> CropRegion {
        let t = t.clamp(0.0, 1.0);
        let [ax1, ay1, ax2, ay2] = a.coords();
        let [bx1, by1, bx2, by2] = b.coords();
        CropRegion {
            x1: ax1 * (1.0 - t) + bx1 * t,
            y1: ay1 * (1.0 - t) + by1 * t,
            x2: ax2 * (1.0 - t) + bx2 * t,
            y2: ay2 * (1.0 - t) + by2 * t,
        }
    }

    /// Snap to whole pixels inside `frame`.
    ///
    /// Width and height are rounded independently of position so the aspect
    /// ratio survives rounding to within one pixel; the origin is then
    /// rounded and slid back inside the frame if needed.
    pub fn to_pixels(&self, frame: FrameSize) -> CropRectangle {
        let w = round_len(self.width(), frame.width);
        let h = round_len(self.height(), frame.height);
        let x1 = place_start(self.x1, w, frame.width);
        let y1 = place_start(self.y1, h, frame.height);
        CropRectangle::from_origin_size(x1, y1, w, h)
    }
}

fn round_len(len: f64, extent: u32) -> u32 {
    let upper = extent.max(1);
    if !len.is_finite() {
        return upper;
    }
    (len.round().max(1.0) as u32).min(upper)
}

fn place_start(start: f64, len: u32, extent: u32) -> u32 {
    let max_start = extent.saturating_sub(len);
    let start = start.round();
    if start.is_nan() || start <= 0.0 {
        0
    } else {
        (start as u32).min(max_start)
    }
}

/// A crop in whole source-frame pixels, `x2`/`y2` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropRectangle {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropRectangle {
    pub const fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_origin_size(x1: u32, y1: u32, width: u32, height: u32) -> Self {
        Self::new(x1, y1, x1 + width, y1 + height)
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn aspect(&self) -> f64 {
        self.width() as f64 / self.height() as f64
    }

    /// Whether the rectangle lies entirely inside `frame`.
    pub fn is_within(&self, frame: FrameSize) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2 && self.x2 <= frame.width && self.y2 <= frame.height
    }

    /// Whether the rectangle covers the entire frame.
    pub fn is_full(&self, frame: FrameSize) -> bool {
        *self == frame.full_rect()
    }

    /// Overlap with the frame, or `None` when nothing overlaps.
    pub fn intersect(&self, frame: FrameSize) -> Option<CropRectangle> {
        let rect = CropRectangle {
            x1: self.x1.min(frame.width),
            y1: self.y1.min(frame.height),
            x2: self.x2.min(frame.width),
            y2: self.y2.min(frame.height),
        };
        (!rect.is_empty()).then_some(rect)
    }
}
