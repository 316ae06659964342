//! Detector output records.
//!
//! Detections are exchanged as JSONL, one record per detected frame:
//!
//! ```text
//! {"frame":0,"detections":[{"x1":100.0,"y1":80.0,"x2":180.0,"y2":190.0,"confidence":0.93}]}
//! ```
//!
//! Lines starting with `#` are treated as comments.

use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// Zero-based index of a frame in the video stream.
pub type FrameIndex = u64;

/// A single face detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(flatten)]
    pub bbox: BoundingBox,

    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
}

/// All detections reported for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    #[serde(rename = "frame")]
    pub frame_index: FrameIndex,

    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32) -> Self {
        Self { bbox, confidence }
    }
}

/// Pick the highest-confidence detection at or above `threshold`.
///
/// Detections with a NaN confidence never qualify. Ties keep the earliest.
pub fn select_best(detections: &[Detection], threshold: f32) -> Option<Detection> {
    detections
        .iter()
        .filter(|d| d.confidence >= threshold)
        .fold(None, |best: Option<&Detection>, d| match best {
            Some(b) if b.confidence >= d.confidence => Some(b),
            _ => Some(d),
        })
        .copied()
}

/// Parse detection records from JSONL content (one JSON object per line).
pub fn parse_detections(jsonl: &str) -> Result<Vec<DetectionRecord>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Serialize detection records to JSONL format.
pub fn serialize_detections(records: &[DetectionRecord]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for record in records {
        output.push_str(&serde_json::to_string(record)?);
        output.push('\n');
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f64, conf: f32) -> Detection {
        Detection::new(BoundingBox::new(x1, 0.0, x1 + 10.0, 10.0), conf)
    }

    #[test]
    fn test_select_best_prefers_highest_confidence() {
        let dets = vec![det(0.0, 0.6), det(10.0, 0.9), det(20.0, 0.7)];
        let best = select_best(&dets, 0.5).unwrap();
        assert_eq!(best.bbox.x1, 10.0);
    }

    #[test]
    fn test_select_best_applies_threshold() {
        let dets = vec![det(0.0, 0.3), det(10.0, 0.49)];
        assert!(select_best(&dets, 0.5).is_none());
        assert!(select_best(&[], 0.0).is_none());
    }

    #[test]
    fn test_select_best_ignores_nan_and_keeps_first_tie() {
        let dets = vec![det(0.0, f32::NAN), det(10.0, 0.8), det(20.0, 0.8)];
        assert_eq!(select_best(&dets, 0.0).unwrap().bbox.x1, 10.0);
    }

    #[test]
    fn test_json_format() {
        let record = DetectionRecord {
            frame_index: 12,
            detections: vec![Detection::new(
                BoundingBox::new(1.0, 2.0, 3.0, 4.0),
                0.5,
            )],
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"frame\":12"));
        assert!(json.contains("\"x1\":1.0"));
        assert!(json.contains("\"confidence\":0.5"));
        assert!(!json.contains("bbox"));
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let jsonl = "# produced by yolov8n-face\n\n\
            {\"frame\":0,\"detections\":[{\"x1\":10,\"y1\":20,\"x2\":50,\"y2\":80,\"confidence\":0.9}]}\n\
            {\"frame\":3}\n";
        let records = parse_detections(jsonl).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].frame_index, 0);
        assert_eq!(records[0].detections[0].bbox.y2, 80.0);
        assert!(records[1].detections.is_empty());
    }

    #[test]
    fn test_jsonl_roundtrip() {
        let records = vec![
            DetectionRecord {
                frame_index: 0,
                detections: vec![det(5.0, 0.75)],
            },
            DetectionRecord {
                frame_index: 3,
                detections: vec![],
            },
        ];
        let jsonl = serialize_detections(&records).unwrap();
        assert_eq!(parse_detections(&jsonl).unwrap(), records);
    }

    #[test]
    fn test_parse_rejects_malformed_line() {
        assert!(parse_detections("{\"frame\":\"zero\"}").is_err());
    }
}
