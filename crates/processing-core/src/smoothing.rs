//! Jitter-gated exponential smoothing of crop regions.
//!
//! A new raw crop is ignored while every coordinate stays within the jitter
//! threshold of the stored crop; otherwise the stored crop moves toward it by
//! the smoothing factor:
//!
//! ```text
//! new_i = prev_i * (1 - alpha) + raw_i * alpha
//! ```
//!
//! Blending happens in sub-pixel space: per-step rounding to whole pixels
//! stalls once `alpha * |raw - prev| < 0.5`.

use autoframe_frame_model::geometry::CropRegion;

/// What a smoothing step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmoothStep {
    /// No prior crop; the raw crop was taken as-is.
    Adopted,
    /// Raw crop within the jitter threshold; the stored crop was kept.
    Held,
    /// Stored crop moved toward the raw crop.
    Blended,
}

/// Jitter-gated EMA over the four crop coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSmoother {
    alpha: f64,
    jitter_threshold: f64,
}

impl CropSmoother {
    /// `alpha` must be in `(0, 1]` and `jitter_threshold` non-negative;
    /// both are checked by `FramingConfig::validate`.
    pub fn new(alpha: f64, jitter_threshold: f64) -> Self {
        Self {
            alpha,
            jitter_threshold,
        }
    }

    /// Whether `raw` counts as jitter around `current`.
    pub fn is_jitter(&self, current: &CropRegion, raw: &CropRegion) -> bool {
        current.max_delta(raw) <= self.jitter_threshold
    }

    /// Advance one frame. Returns the crop to store and emit.
    pub fn step(&self, current: Option<&CropRegion>, raw: &CropRegion) -> (CropRegion, SmoothStep) {
        match current {
            None => (*raw, SmoothStep::Adopted),
            Some(current) if self.is_jitter(current, raw) => (*current, SmoothStep::Held),
            Some(current) => (
                CropRegion::lerp(current, raw, self.alpha),
                SmoothStep::Blended,
            ),
        }
    }
}
