//! Per-frame pipeline: detect → plan → composite.
//!
//! The pipeline owns the tracking state of one stream. Detection runs either
//! inline on the calling thread or on a [`DetectionWorker`]; planning and
//! compositing always run inline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbImage;
use tracing::{info, warn};

use autoframe_common::config::AppConfig;
use autoframe_common::error::{AutoframeError, AutoframeResult};
use autoframe_frame_model::detection::{select_best, Detection, FrameIndex};
use autoframe_frame_model::geometry::{BoundingBox, FrameSize};
use autoframe_processing_core::{CropPlanner, DetectionScheduler, Framing};

use crate::compositor::FrameCompositor;
use crate::worker::DetectionWorker;

/// Frames between two timing reports.
pub const STATS_INTERVAL: u64 = 300;

/// A face detector.
///
/// Implementations return every face they find; the pipeline keeps the
/// most confident one at or above the threshold.
pub trait FaceDetector: Send {
    fn detect(
        &mut self,
        frame: &RgbImage,
        frame_index: FrameIndex,
        confidence_threshold: f32,
    ) -> AutoframeResult<Vec<Detection>>;

    /// Detector name for logs.
    fn name(&self) -> &str;
}

impl<D: FaceDetector + ?Sized> FaceDetector for Box<D> {
    fn detect(
        &mut self,
        frame: &RgbImage,
        frame_index: FrameIndex,
        confidence_threshold: f32,
    ) -> AutoframeResult<Vec<Detection>> {
        (**self).detect(frame, frame_index, confidence_threshold)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// One rendered frame and the decisions behind it.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub frame_index: FrameIndex,
    pub image: RgbImage,
    pub framing: Framing,
    /// Face box the planner used, in source coordinates.
    pub bbox: Option<BoundingBox>,
}

/// Counters and accumulated stage timings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    pub frames: u64,
    pub detection_runs: u64,
    pub detector_errors: u64,
    pub dropped_submissions: u64,
    pub reinitializations: u64,
    pub detect_time: Duration,
    pub plan_time: Duration,
    pub render_time: Duration,
}

impl PipelineStats {
    fn ms_per_frame(&self, total: Duration) -> String {
        let frames = self.frames.max(1) as f64;
        format!("{:.2}", total.as_secs_f64() * 1000.0 / frames)
    }

    pub fn log(&self) {
        info!(
            frames = self.frames,
            detection_runs = self.detection_runs,
            detector_errors = self.detector_errors,
            dropped_submissions = self.dropped_submissions,
            detect_ms_per_frame = self.ms_per_frame(self.detect_time),
            plan_ms_per_frame = self.ms_per_frame(self.plan_time),
            render_ms_per_frame = self.ms_per_frame(self.render_time),
            "pipeline timings"
        );
    }
}

enum DetectorMode {
    Inline(Box<dyn FaceDetector>),
    Background(DetectionWorker),
}

/// Stabilized auto-framing of one video stream.
pub struct FramePipeline {
    planner: CropPlanner,
    scheduler: DetectionScheduler,
    compositor: FrameCompositor,
    detection: DetectorMode,
    confidence_threshold: f32,
    session_start: FrameIndex,
    stats: PipelineStats,
}

impl FramePipeline {
    /// Pipeline that runs `detector` on the calling thread.
    pub fn new(
        config: &AppConfig,
        frame: FrameSize,
        detector: Box<dyn FaceDetector>,
    ) -> AutoframeResult<Self> {
        Self::build(config, frame, DetectorMode::Inline(detector))
    }

    /// Pipeline that hands detection to `worker`.
    pub fn with_worker(
        config: &AppConfig,
        frame: FrameSize,
        worker: DetectionWorker,
    ) -> AutoframeResult<Self> {
        Self::build(config, frame, DetectorMode::Background(worker))
    }

    fn build(config: &AppConfig, frame: FrameSize, detection: DetectorMode) -> AutoframeResult<Self> {
        config.validate()?;
        let planner = CropPlanner::new(config.framing.clone(), frame)?;
        let scheduler = DetectionScheduler::new(&config.detection)?;
        let compositor = FrameCompositor::from_config(&config.framing)?;

        let mode = match &detection {
            DetectorMode::Inline(detector) => format!("inline ({})", detector.name()),
            DetectorMode::Background(worker) => format!("{} workers", worker.workers()),
        };
        info!(
            frame = %frame,
            output = %compositor.output_size(),
            stride = config.detection.stride,
            detection = %mode,
            "pipeline started"
        );

        Ok(Self {
            planner,
            scheduler,
            compositor,
            detection,
            confidence_threshold: config.detection.confidence_threshold,
            session_start: 0,
            stats: PipelineStats::default(),
        })
    }

    pub fn planner(&self) -> &CropPlanner {
        &self.planner
    }

    pub fn compositor(&self) -> &FrameCompositor {
        &self.compositor
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Process the next frame of the stream.
    ///
    /// Only an empty frame is an error; detector failures and missing faces
    /// degrade to a held or full-frame crop.
    pub fn process(&mut self, frame: &RgbImage) -> AutoframeResult<FrameOutput> {
        let size = FrameSize::from(frame.dimensions());
        if size.is_empty() {
            return Err(AutoframeError::frame_unavailable(format!(
                "frame {} is empty",
                self.scheduler.frame_index()
            )));
        }
        if size != self.planner.frame_size() {
            info!(
                from = %self.planner.frame_size(),
                to = %size,
                "frame size changed; tracking restarted"
            );
            self.planner.reinitialize(size)?;
            self.scheduler.clear_box();
            self.session_start = self.scheduler.frame_index();
            self.stats.reinitializations += 1;
        }

        let frame_index = self.scheduler.frame_index();

        let detect_start = Instant::now();
        self.detect(frame, frame_index);
        let bbox = self.scheduler.advance();
        self.stats.detect_time += detect_start.elapsed();

        let plan_start = Instant::now();
        let framing = self.planner.update(bbox);
        self.stats.plan_time += plan_start.elapsed();

        let render_start = Instant::now();
        let image = self.compositor.render(frame, framing);
        self.stats.render_time += render_start.elapsed();

        self.stats.frames += 1;
        if self.stats.frames % STATS_INTERVAL == 0 {
            self.stats.log();
        }

        Ok(FrameOutput {
            frame_index,
            image,
            framing,
            bbox,
        })
    }

    fn detect(&mut self, frame: &RgbImage, frame_index: FrameIndex) {
        match &mut self.detection {
            DetectorMode::Inline(detector) => {
                if !self.scheduler.is_detection_frame() {
                    return;
                }
                self.stats.detection_runs += 1;
                match detector.detect(frame, frame_index, self.confidence_threshold) {
                    Ok(detections) => {
                        let best = select_best(&detections, self.confidence_threshold);
                        self.scheduler.record(frame_index, best.map(|d| d.bbox));
                    }
                    Err(e) => {
                        self.stats.detector_errors += 1;
                        warn!(
                            frame = frame_index,
                            detector = detector.name(),
                            error = %e,
                            "detection failed; keeping last box"
                        );
                    }
                }
            }
            DetectorMode::Background(worker) => {
                if let Some(result) = worker.take_latest() {
                    if result.frame_index >= self.session_start {
                        self.scheduler.record(result.frame_index, result.bbox);
                    }
                }
                if self.scheduler.is_detection_frame() {
                    self.stats.detection_runs += 1;
                    if !worker.submit(frame_index, Arc::new(frame.clone())) {
                        self.stats.dropped_submissions += 1;
                    }
                }
            }
        }
    }

    /// Stop background detection and report the final statistics.
    pub async fn shutdown(self) -> PipelineStats {
        if let DetectorMode::Background(worker) = self.detection {
            worker.shutdown().await;
        }
        self.stats.log();
        self.stats
    }
}
