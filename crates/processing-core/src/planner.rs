//! Crop planning: the face-box-to-crop algorithm.
//!
//! Turns the per-frame face box into a stable, aspect-correct crop of the
//! source frame.
//!
//! # Algorithm
//!
//! 1. **Margins**: expand the box by per-edge percentages of its size.
//! 2. **Aspect**: grow exactly one dimension so width / height matches the
//!    output aspect ratio.
//! 3. **Center**: center of the expanded box, shifted down by
//!    `vertical_shift × box height`.
//! 4. **Fit**: scale down (aspect preserved) if the crop is larger than the
//!    frame, then slide it inside the frame bounds.
//! 5. **Smooth**: jitter-gated EMA against the stored crop
//!    (see [`crate::smoothing`]).

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use autoframe_common::config::{FramingConfig, LossPolicy};
use autoframe_common::error::{AutoframeError, AutoframeResult};
use autoframe_frame_model::geometry::{BoundingBox, CropRectangle, CropRegion, FrameSize};

use crate::smoothing::{CropSmoother, SmoothStep};

/// The planner's decision for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Framing {
    /// No face: show the whole frame scaled to the output size.
    FullFrame,
    /// Show this region of the source frame.
    Crop(CropRectangle),
}

impl Framing {
    /// The crop rectangle, if any.
    pub fn crop(&self) -> Option<CropRectangle> {
        match self {
            Framing::FullFrame => None,
            Framing::Crop(rect) => Some(*rect),
        }
    }

    pub fn is_full_frame(&self) -> bool {
        matches!(self, Framing::FullFrame)
    }
}

/// Mutable tracking state of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerState {
    frame: FrameSize,
    current: Option<CropRegion>,
}

impl PlannerState {
    pub fn new(frame: FrameSize) -> Self {
        Self {
            frame,
            current: None,
        }
    }

    /// Source frame dimensions the state was planned for.
    pub fn frame(&self) -> FrameSize {
        self.frame
    }

    /// The stored (smoothed) crop in sub-pixel coordinates.
    pub fn current(&self) -> Option<CropRegion> {
        self.current
    }

    /// The stored crop snapped to whole pixels.
    pub fn current_rect(&self) -> Option<CropRectangle> {
        self.current.map(|region| region.to_pixels(self.frame))
    }

    pub fn is_tracking(&self) -> bool {
        self.current.is_some()
    }
}

/// Stabilized crop planner.
#[derive(Debug, Clone)]
pub struct CropPlanner {
    config: FramingConfig,
    smoother: CropSmoother,
    state: PlannerState,
}

impl CropPlanner {
    /// Create a planner for frames of size `frame`.
    ///
    /// Fails with a configuration error for invalid settings or an empty
    /// frame; nothing is validated per frame afterwards.
    pub fn new(config: FramingConfig, frame: FrameSize) -> AutoframeResult<Self> {
        config.validate()?;
        check_frame(frame)?;

        let smoother = CropSmoother::new(config.smoothing_factor, config.jitter_threshold);
        Ok(Self {
            config,
            smoother,
            state: PlannerState::new(frame),
        })
    }

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    pub fn frame_size(&self) -> FrameSize {
        self.state.frame
    }

    /// Start a new session for a different frame size.
    pub fn reinitialize(&mut self, frame: FrameSize) -> AutoframeResult<()> {
        check_frame(frame)?;
        debug!(from = %self.state.frame, to = %frame, "planner reinitialized");
        self.state = PlannerState::new(frame);
        Ok(())
    }

    /// Forget the stored crop; the next box is adopted without smoothing.
    pub fn reset(&mut self) {
        self.state.current = None;
    }

    /// Plan the crop for the next frame.
    pub fn update(&mut self, bbox: Option<BoundingBox>) -> Framing {
        let Some(bbox) = bbox else {
            if self.config.loss_policy == LossPolicy::Reset && self.state.current.is_some() {
                debug!("face lost; stored crop cleared");
                self.state.current = None;
            }
            return Framing::FullFrame;
        };

        if !bbox.is_finite() {
            warn!(?bbox, "ignoring non-finite face box");
            return self.held_framing();
        }

        // Finite coordinates can still overflow once subtracted.
        let raw = self.raw_region(&bbox);
        if !raw.is_finite() {
            warn!(?bbox, "ignoring face box with overflowing extent");
            return self.held_framing();
        }

        let (next, step) = self.smoother.step(self.state.current.as_ref(), &raw);
        self.state.current = Some(next);

        let rect = next.to_pixels(self.state.frame);
        debug!(
            ?step,
            x1 = rect.x1,
            y1 = rect.y1,
            x2 = rect.x2,
            y2 = rect.y2,
            "crop planned"
        );
        if step == SmoothStep::Adopted {
            debug!("tracking started");
        }
        Framing::Crop(rect)
    }

    fn held_framing(&self) -> Framing {
        self.state
            .current_rect()
            .map_or(Framing::FullFrame, Framing::Crop)
    }

    /// Unsmoothed crop for `bbox` in whole pixels.
    pub fn raw_crop(&self, bbox: &BoundingBox) -> CropRectangle {
        self.raw_region(bbox).to_pixels(self.state.frame)
    }

    /// Unsmoothed crop for `bbox` in sub-pixel coordinates.
    ///
    /// The result has the exact output aspect ratio and lies inside the frame.
    pub fn raw_region(&self, bbox: &BoundingBox) -> CropRegion {
        let bbox = if bbox.is_degenerate() {
            debug!(?bbox, "degenerate face box widened to 1x1");
            bbox.normalized()
        } else {
            *bbox
        };

        let box_w = bbox.width();
        let box_h = bbox.height();
        let margins = &self.config.margins;

        let left = bbox.x1 - box_w * margins.left / 100.0;
        let right = bbox.x2 + box_w * margins.right / 100.0;
        let top = bbox.y1 - box_h * margins.top / 100.0;
        let bottom = bbox.y2 + box_h * margins.bottom / 100.0;

        let mut crop_w = right - left;
        let mut crop_h = bottom - top;

        let target_aspect = self.config.output_aspect();
        if crop_w / crop_h > target_aspect {
            crop_h = crop_w / target_aspect;
        } else {
            crop_w = crop_h * target_aspect;
        }

        let center_x = (left + right) / 2.0;
        let center_y = (top + bottom) / 2.0 + box_h * self.config.vertical_shift;

        let frame_w = self.state.frame.width as f64;
        let frame_h = self.state.frame.height as f64;

        // Larger than the frame: shrink until the constraining side spans it.
        let scale = (frame_w / crop_w).min(frame_h / crop_h).min(1.0);
        crop_w *= scale;
        crop_h *= scale;

        let x1 = slide_into(center_x - crop_w / 2.0, crop_w, frame_w);
        let y1 = slide_into(center_y - crop_h / 2.0, crop_h, frame_h);

        CropRegion::from_origin_size(x1, y1, crop_w, crop_h)
    }
}

/// Clamp a span start so `[start, start + len]` stays inside `[0, extent]`.
fn slide_into(start: f64, len: f64, extent: f64) -> f64 {
    start.min((extent - len).max(0.0)).max(0.0)
}

fn check_frame(frame: FrameSize) -> AutoframeResult<()> {
    if frame.is_empty() {
        return Err(AutoframeError::config(format!(
            "frame size must be positive, got {frame}"
        )));
    }
    Ok(())
}
