//! Background face detection.
//!
//! Frames are handed to a pool of blocking worker tasks through a bounded
//! queue. Submission never waits: when the queue is full the frame is simply
//! not detected. Each result is tagged with the frame it was computed for and
//! published through a `watch` channel only if it is newer than the result
//! already there, so a slow worker can never roll the box back.

use std::sync::{Arc, Mutex, PoisonError};

use image::RgbImage;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use autoframe_common::error::{AutoframeError, AutoframeResult};
use autoframe_frame_model::detection::{select_best, FrameIndex};
use autoframe_frame_model::geometry::BoundingBox;

use crate::pipeline::FaceDetector;

/// Best box found for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionResult {
    pub frame_index: FrameIndex,
    pub bbox: Option<BoundingBox>,
}

struct DetectionJob {
    frame_index: FrameIndex,
    frame: Arc<RgbImage>,
}

type LatestResult = Option<DetectionResult>;

/// Pool of detectors running on tokio's blocking threads.
pub struct DetectionWorker {
    jobs: Option<mpsc::Sender<DetectionJob>>,
    results: watch::Receiver<LatestResult>,
    tasks: Vec<JoinHandle<()>>,
}

impl DetectionWorker {
    /// Run a single detector in the background.
    pub fn spawn<D>(handle: &Handle, detector: D, confidence_threshold: f32) -> Self
    where
        D: FaceDetector + 'static,
    {
        Self::start(handle, vec![detector], confidence_threshold)
    }

    /// Run one worker per detector. Fails when `detectors` is empty.
    pub fn spawn_pool<D>(
        handle: &Handle,
        detectors: Vec<D>,
        confidence_threshold: f32,
    ) -> AutoframeResult<Self>
    where
        D: FaceDetector + 'static,
    {
        if detectors.is_empty() {
            return Err(AutoframeError::config(
                "detection worker pool needs at least one detector",
            ));
        }
        Ok(Self::start(handle, detectors, confidence_threshold))
    }

    fn start<D>(handle: &Handle, detectors: Vec<D>, confidence_threshold: f32) -> Self
    where
        D: FaceDetector + 'static,
    {
        let (job_tx, job_rx) = mpsc::channel(detectors.len());
        let (result_tx, result_rx) = watch::channel(None);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let result_tx = Arc::new(result_tx);

        let tasks = detectors
            .into_iter()
            .enumerate()
            .map(|(id, detector)| {
                let jobs = Arc::clone(&job_rx);
                let results = Arc::clone(&result_tx);
                handle.spawn_blocking(move || {
                    run_worker(id, detector, &jobs, &results, confidence_threshold)
                })
            })
            .collect::<Vec<_>>();

        debug!(workers = tasks.len(), "detection workers started");
        Self {
            jobs: Some(job_tx),
            results: result_rx,
            tasks,
        }
    }

    pub fn workers(&self) -> usize {
        self.tasks.len()
    }

    /// Queue `frame` for detection. Returns `false` when every worker is busy
    /// and the frame was dropped.
    pub fn submit(&self, frame_index: FrameIndex, frame: Arc<RgbImage>) -> bool {
        let Some(jobs) = &self.jobs else {
            return false;
        };
        match jobs.try_send(DetectionJob { frame_index, frame }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(frame = frame_index, "detection workers busy; frame skipped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(frame = frame_index, "detection workers have stopped");
                false
            }
        }
    }

    /// Most recent published result.
    pub fn latest(&self) -> Option<DetectionResult> {
        *self.results.borrow()
    }

    /// Result published since the previous call, if any.
    pub fn take_latest(&mut self) -> Option<DetectionResult> {
        match self.results.has_changed() {
            Ok(true) => *self.results.borrow_and_update(),
            _ => None,
        }
    }

    /// Wait for the next published result. `None` once all workers stopped.
    pub async fn next_result(&mut self) -> Option<DetectionResult> {
        self.results.changed().await.ok()?;
        *self.results.borrow_and_update()
    }

    /// Independent view of the published results.
    pub fn subscribe(&self) -> watch::Receiver<LatestResult> {
        self.results.clone()
    }

    /// Stop accepting frames and wait for in-flight detections to finish.
    pub async fn shutdown(mut self) {
        self.jobs = None;
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "detection worker panicked");
            }
        }
        debug!("detection workers stopped");
    }
}

fn run_worker<D: FaceDetector>(
    id: usize,
    mut detector: D,
    jobs: &Mutex<mpsc::Receiver<DetectionJob>>,
    results: &watch::Sender<LatestResult>,
    confidence_threshold: f32,
) {
    loop {
        let job = {
            let mut rx = jobs.lock().unwrap_or_else(PoisonError::into_inner);
            rx.blocking_recv()
        };
        let Some(job) = job else {
            break;
        };

        let detections = match detector.detect(&job.frame, job.frame_index, confidence_threshold) {
            Ok(detections) => detections,
            Err(e) => {
                warn!(
                    worker = id,
                    frame = job.frame_index,
                    detector = detector.name(),
                    error = %e,
                    "detection failed"
                );
                continue;
            }
        };

        let result = DetectionResult {
            frame_index: job.frame_index,
            bbox: select_best(&detections, confidence_threshold).map(|d| d.bbox),
        };
        results.send_if_modified(|latest| match latest {
            Some(current) if current.frame_index >= result.frame_index => {
                debug!(
                    worker = id,
                    frame = result.frame_index,
                    latest = current.frame_index,
                    "stale detection discarded"
                );
                false
            }
            _ => {
                *latest = Some(result);
                true
            }
        });
    }
    debug!(worker = id, "detection worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoframe_frame_model::detection::Detection;
    use std::sync::mpsc as std_mpsc;

    fn face(frame_index: FrameIndex) -> BoundingBox {
        let x = frame_index as f64 * 10.0;
        BoundingBox::new(x, 20.0, x + 40.0, 70.0)
    }

    fn frame() -> Arc<RgbImage> {
        Arc::new(RgbImage::new(16, 16))
    }

    /// Finds a face whose position encodes the frame index. Frame 0 waits
    /// for the gate when one is set; odd frames fail when `fail_odd` is set.
    #[derive(Clone)]
    struct IndexDetector {
        gate: Option<Arc<Mutex<std_mpsc::Receiver<()>>>>,
        fail_odd: bool,
        confidence: f32,
    }

    impl IndexDetector {
        fn new() -> Self {
            Self {
                gate: None,
                fail_odd: false,
                confidence: 0.9,
            }
        }
    }

    impl FaceDetector for IndexDetector {
        fn detect(
            &mut self,
            _frame: &RgbImage,
            frame_index: FrameIndex,
            _confidence_threshold: f32,
        ) -> AutoframeResult<Vec<Detection>> {
            if frame_index == 0 {
                if let Some(gate) = &self.gate {
                    let _ = gate.lock().unwrap().recv();
                }
            }
            if self.fail_odd && frame_index % 2 == 1 {
                return Err(AutoframeError::detection("model exploded"));
            }
            Ok(vec![Detection::new(face(frame_index), self.confidence)])
        }

        fn name(&self) -> &str {
            "index"
        }
    }

    #[tokio::test]
    async fn publishes_results() {
        let mut worker = DetectionWorker::spawn(&Handle::current(), IndexDetector::new(), 0.5);
        assert!(worker.submit(3, frame()));

        let result = worker.next_result().await.unwrap();
        assert_eq!(result.frame_index, 3);
        assert_eq!(result.bbox, Some(face(3)));
        assert_eq!(worker.latest(), Some(result));
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn low_confidence_yields_empty_result() {
        let detector = IndexDetector {
            confidence: 0.2,
            ..IndexDetector::new()
        };
        let mut worker = DetectionWorker::spawn(&Handle::current(), detector, 0.5);
        worker.submit(1, frame());

        let result = worker.next_result().await.unwrap();
        assert_eq!(result.frame_index, 1);
        assert_eq!(result.bbox, None);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn slow_older_result_never_replaces_newer() {
        let (release, gate) = std_mpsc::channel();
        let detector = IndexDetector {
            gate: Some(Arc::new(Mutex::new(gate))),
            ..IndexDetector::new()
        };
        let mut worker =
            DetectionWorker::spawn_pool(&Handle::current(), vec![detector.clone(), detector], 0.5)
                .unwrap();
        let results = worker.subscribe();

        assert!(worker.submit(0, frame()));
        assert!(worker.submit(3, frame()));
        assert_eq!(worker.next_result().await.unwrap().frame_index, 3);

        release.send(()).unwrap();
        worker.shutdown().await;

        let latest = *results.borrow();
        let latest = latest.unwrap();
        assert_eq!(latest.frame_index, 3);
        assert_eq!(latest.bbox, Some(face(3)));
    }

    #[tokio::test]
    async fn submission_is_dropped_when_busy() {
        let (release, gate) = std_mpsc::channel();
        let detector = IndexDetector {
            gate: Some(Arc::new(Mutex::new(gate))),
            ..IndexDetector::new()
        };
        let worker = DetectionWorker::spawn(&Handle::current(), detector, 0.5);

        // One frame in flight plus one queued at most.
        let accepted = (0..4).filter(|&i| worker.submit(i, frame())).count();
        assert!((1..=2).contains(&accepted));

        release.send(()).unwrap();
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn failed_detection_is_not_published() {
        let detector = IndexDetector {
            fail_odd: true,
            ..IndexDetector::new()
        };
        let mut worker =
            DetectionWorker::spawn_pool(&Handle::current(), vec![detector.clone(), detector], 0.5)
                .unwrap();

        assert!(worker.submit(1, frame()));
        assert!(worker.submit(2, frame()));
        let result = worker.next_result().await.unwrap();
        assert_eq!(result.frame_index, 2);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn results_end_after_shutdown() {
        let worker = DetectionWorker::spawn(&Handle::current(), IndexDetector::new(), 0.5);
        let mut results = worker.subscribe();
        worker.shutdown().await;
        assert!(results.changed().await.is_err());
    }

    #[tokio::test]
    async fn empty_pool_is_rejected() {
        let err = DetectionWorker::spawn_pool::<IndexDetector>(&Handle::current(), vec![], 0.5)
            .err()
            .unwrap();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn take_latest_reports_each_result_once() {
        let mut worker = DetectionWorker::spawn(&Handle::current(), IndexDetector::new(), 0.5);
        let mut results = worker.subscribe();
        worker.submit(2, frame());
        results.changed().await.unwrap();

        assert_eq!(worker.take_latest().map(|r| r.frame_index), Some(2));
        assert_eq!(worker.take_latest(), None);
        worker.shutdown().await;
    }
}
