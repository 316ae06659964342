//! Detection cadence and box memory.
//!
//! The detector runs every `stride` frames while the planner runs on every
//! frame, so the scheduler remembers the most recent box between detection
//! runs. Results are tagged with the frame they were computed for; a result
//! older than the last accepted one is dropped, so out-of-order completions
//! from background workers never roll the box back.

use tracing::debug;

use autoframe_common::config::DetectionConfig;
use autoframe_common::error::AutoframeResult;
use autoframe_frame_model::detection::FrameIndex;
use autoframe_frame_model::geometry::BoundingBox;

/// Decides when to detect and which box the planner sees.
#[derive(Debug, Clone)]
pub struct DetectionScheduler {
    stride: u32,
    hold_last_box: bool,
    frame_index: FrameIndex,
    last_box: Option<BoundingBox>,
    last_result_frame: Option<FrameIndex>,
}

impl DetectionScheduler {
    pub fn new(config: &DetectionConfig) -> AutoframeResult<Self> {
        config.validate()?;
        Ok(Self {
            stride: config.stride,
            hold_last_box: config.hold_last_box,
            frame_index: 0,
            last_box: None,
            last_result_frame: None,
        })
    }

    /// Index of the frame currently being processed.
    pub fn frame_index(&self) -> FrameIndex {
        self.frame_index
    }

    /// Whether the detector should run on the current frame.
    pub fn is_detection_frame(&self) -> bool {
        self.frame_index % self.stride as u64 == 0
    }

    /// Box the planner will receive for the current frame.
    pub fn last_box(&self) -> Option<BoundingBox> {
        self.last_box
    }

    /// Record a detection result computed for frame `detected_at`.
    ///
    /// Returns `false` when the result is stale and was discarded. An empty
    /// result clears the remembered box unless `hold_last_box` is set.
    pub fn record(&mut self, detected_at: FrameIndex, bbox: Option<BoundingBox>) -> bool {
        if let Some(latest) = self.last_result_frame {
            if detected_at <= latest {
                debug!(detected_at, latest, "stale detection discarded");
                return false;
            }
        }
        self.last_result_frame = Some(detected_at);

        match bbox {
            Some(bbox) => self.last_box = Some(bbox),
            None if self.hold_last_box => {
                debug!(detected_at, "no face detected; holding last box");
            }
            None => {
                if self.last_box.take().is_some() {
                    debug!(detected_at, "no face detected; box cleared");
                }
            }
        }
        true
    }

    /// Finish the current frame: returns its box and moves to the next frame.
    pub fn advance(&mut self) -> Option<BoundingBox> {
        self.frame_index += 1;
        self.last_box
    }

    /// Forget the remembered box but keep counting frames.
    pub fn clear_box(&mut self) {
        self.last_box = None;
    }

    /// Forget the box and restart the frame counter.
    pub fn reset(&mut self) {
        self.frame_index = 0;
        self.last_box = None;
        self.last_result_frame = None;
    }
}
