//! Print the framing decision for every frame without rendering.

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;

use autoframe_common::config::AppConfig;
use autoframe_common::error::AutoframeResult;
use autoframe_frame_model::detection::{select_best, FrameIndex};
use autoframe_frame_model::geometry::{BoundingBox, FrameSize};
use autoframe_processing_core::{CropPlanner, DetectionScheduler, Framing};

use crate::overrides::ConfigOverrides;
use crate::replay::ReplayDetector;

/// One output line: the frame, its framing, and the face box used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanLine {
    pub frame: FrameIndex,
    #[serde(flatten)]
    pub framing: Framing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face: Option<BoundingBox>,
}

pub fn run(
    detections: PathBuf,
    frame_width: u32,
    frame_height: u32,
    frames: Option<u64>,
    overrides: &ConfigOverrides,
    mut config: AppConfig,
) -> anyhow::Result<()> {
    overrides.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let replay = ReplayDetector::load(&detections)?;
    let count = frames.unwrap_or_else(|| replay.frame_span());
    tracing::info!(records = replay.len(), frames = count, "planning");

    let lines = plan_frames(
        &replay,
        &config,
        FrameSize::new(frame_width, frame_height),
        count,
    )?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_lines(lines, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Drive scheduler and planner over `count` frames of recorded detections.
///
/// Lines are planned lazily, one per call to `next`.
pub fn plan_frames<'a>(
    replay: &'a ReplayDetector,
    config: &AppConfig,
    frame: FrameSize,
    count: u64,
) -> AutoframeResult<impl Iterator<Item = PlanLine> + 'a> {
    let mut planner = CropPlanner::new(config.framing.clone(), frame)?;
    let mut scheduler = DetectionScheduler::new(&config.detection)?;
    let threshold = config.detection.confidence_threshold;

    Ok((0..count).map(move |_| {
        let frame_index = scheduler.frame_index();
        if scheduler.is_detection_frame() {
            let best = select_best(replay.detections(frame_index), threshold);
            scheduler.record(frame_index, best.map(|d| d.bbox));
        }
        let face = scheduler.advance();
        PlanLine {
            frame: frame_index,
            framing: planner.update(face),
            face,
        }
    }))
}

/// Write each line as JSON as soon as it is planned. Returns the line count.
pub fn write_lines<W: Write>(
    lines: impl IntoIterator<Item = PlanLine>,
    out: &mut W,
) -> anyhow::Result<u64> {
    let mut written = 0;
    for line in lines {
        serde_json::to_writer(&mut *out, &line)?;
        writeln!(out)?;
        written += 1;
    }
    Ok(written)
}
