//! Replays recorded detector output as a face detector.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use image::RgbImage;

use autoframe_common::error::AutoframeResult;
use autoframe_frame_model::detection::{parse_detections, Detection, DetectionRecord, FrameIndex};
use autoframe_render_engine::FaceDetector;

/// Detections keyed by frame index. Cloning shares the records.
#[derive(Debug, Clone, Default)]
pub struct ReplayDetector {
    records: Arc<HashMap<FrameIndex, Vec<Detection>>>,
}

impl ReplayDetector {
    pub fn from_records(records: Vec<DetectionRecord>) -> Self {
        let mut by_frame: HashMap<FrameIndex, Vec<Detection>> = HashMap::new();
        for record in records {
            by_frame
                .entry(record.frame_index)
                .or_default()
                .extend(record.detections);
        }
        Self {
            records: Arc::new(by_frame),
        }
    }

    /// Load a JSONL detection file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read detections {}", path.display()))?;
        let records = parse_detections(&content)
            .with_context(|| format!("failed to parse detections {}", path.display()))?;
        Ok(Self::from_records(records))
    }

    /// Detections recorded for `frame_index`.
    pub fn detections(&self, frame_index: FrameIndex) -> &[Detection] {
        self.records
            .get(&frame_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of frames with a record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One past the highest recorded frame index.
    pub fn frame_span(&self) -> FrameIndex {
        self.records.keys().max().map_or(0, |last| last + 1)
    }
}

impl FaceDetector for ReplayDetector {
    fn detect(
        &mut self,
        _frame: &RgbImage,
        frame_index: FrameIndex,
        _confidence_threshold: f32,
    ) -> AutoframeResult<Vec<Detection>> {
        Ok(self.detections(frame_index).to_vec())
    }

    fn name(&self) -> &str {
        "replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSONL: &str = r#"# recorded by an external detector
{"frame":0,"detections":[{"x1":100.0,"y1":80.0,"x2":180.0,"y2":190.0,"confidence":0.93}]}
{"frame":3,"detections":[]}
{"frame":6,"detections":[{"x1":1.0,"y1":2.0,"x2":3.0,"y2":4.0,"confidence":0.2},{"x1":110.0,"y1":82.0,"x2":190.0,"y2":192.0,"confidence":0.88}]}
"#;

    fn replay() -> ReplayDetector {
        ReplayDetector::from_records(parse_detections(JSONL).unwrap())
    }

    #[test]
    fn detections_are_keyed_by_frame() {
        let replay = replay();
        assert_eq!(replay.len(), 3);
        assert_eq!(replay.frame_span(), 7);
        assert_eq!(replay.detections(0).len(), 1);
        assert!(replay.detections(3).is_empty());
        assert!(replay.detections(4).is_empty());
        assert_eq!(replay.detections(6).len(), 2);
    }

    #[test]
    fn detect_returns_recorded_faces() {
        let mut replay = replay();
        let frame = RgbImage::new(4, 4);
        let faces = replay.detect(&frame, 6, 0.5).unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[1].confidence, 0.88);
    }

    #[test]
    fn empty_replay_spans_nothing() {
        let replay = ReplayDetector::default();
        assert_eq!(replay.frame_span(), 0);
        assert!(replay.detections(0).is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = ReplayDetector::load(Path::new("/nonexistent/detections.jsonl")).unwrap_err();
        assert!(err.to_string().contains("failed to read detections"));
    }
}
