//! Autoframe Render Engine
//!
//! Turns source frames and planner decisions into the fixed-size output
//! stream.
//!
//! # Pipeline Architecture
//!
//! ```text
//! frame ──┬── Detect (every `stride` frames, inline or worker pool)
//!         │         │
//!         │         ▼
//!         │    Scheduler (last box, stale results dropped)
//!         │         │
//!         │         ▼
//!         │    CropPlanner (margins, aspect, fit, smoothing)
//!         │         │
//!         └─────────┴── Composite (crop + resize)
//!                              │
//!                              ├── Debug overlay (optional)
//!                              ▼
//!                        output image
//! ```

pub mod compositor;
pub mod overlay;
pub mod pipeline;
pub mod sequence;
pub mod worker;

pub use compositor::FrameCompositor;
pub use pipeline::{FaceDetector, FrameOutput, FramePipeline, PipelineStats};
pub use worker::{DetectionResult, DetectionWorker};
