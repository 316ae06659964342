//! Autoframe Frame Model
//!
//! Defines the data contracts shared by the planner, the compositor and the
//! CLI:
//! - **Geometry:** frame sizes, detector boxes, and crop rectangles
//! - **Detections:** scored boxes per frame and their JSONL encoding
//!
//! All coordinates are source-frame pixels.

pub mod detection;
pub mod geometry;

pub use detection::*;
pub use geometry::*;
