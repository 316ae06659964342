//! Autoframe Processing Core — the crop planner
//!
//! Turns per-frame face detections into stable framing decisions:
//! - **Planner:** margin, aspect and frame-bounds rules for a single box
//! - **Smoothing:** jitter suppression and EMA between frames
//! - **Scheduler:** detection cadence and last-box memory
//!
//! This crate is pure computation — no I/O, no pixel buffers.
//! All inputs are data; all outputs are data.

pub mod planner;
pub mod scheduler;
pub mod smoothing;

pub use planner::{CropPlanner, Framing, PlannerState};
pub use scheduler::DetectionScheduler;
pub use smoothing::{CropSmoother, SmoothStep};
