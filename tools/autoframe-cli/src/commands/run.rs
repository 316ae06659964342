//! Render an image sequence framed on the detected face.

use std::path::PathBuf;

use anyhow::Context;
use tokio::runtime::Handle;
use tracing::warn;

use autoframe_frame_model::geometry::FrameSize;
use autoframe_render_engine::overlay::draw_face_box;
use autoframe_render_engine::sequence::{list_frames, load_frame, save_frame};
use autoframe_render_engine::{DetectionWorker, FramePipeline};

use crate::overrides::ConfigOverrides;
use crate::replay::ReplayDetector;
use crate::LoadedConfig;

pub struct RunArgs {
    pub frames: PathBuf,
    pub detections: PathBuf,
    pub output: PathBuf,
    pub overlay: bool,
    pub workers: Option<usize>,
}

pub async fn run(
    args: RunArgs,
    overrides: &ConfigOverrides,
    loaded: LoadedConfig,
) -> anyhow::Result<()> {
    let LoadedConfig {
        mut config,
        from_file,
    } = loaded;

    let frames = list_frames(&args.frames)
        .with_context(|| format!("failed to list frames in {}", args.frames.display()))?;
    let Some(first) = frames.first() else {
        anyhow::bail!("no frames found in {}", args.frames.display());
    };
    let source = FrameSize::from(
        load_frame(first)
            .with_context(|| format!("failed to read first frame {}", first.display()))?
            .dimensions(),
    );

    let replay = ReplayDetector::load(&args.detections)?;
    if replay.is_empty() {
        warn!(path = %args.detections.display(), "no detections recorded; output will be full frame");
    }

    overrides.apply(&mut config);
    if !from_file || overrides.width.is_some() || overrides.height.is_some() {
        let output = overrides.output_size(source);
        config.framing.output_width = output.width;
        config.framing.output_height = output.height;
    }
    if let Some(workers) = args.workers {
        config.detection.workers = workers;
    }
    config.validate().context("invalid configuration")?;

    println!(
        "Rendering {} frames ({source}) to {} at {}x{}",
        frames.len(),
        args.output.display(),
        config.framing.output_width,
        config.framing.output_height
    );

    let threshold = config.detection.confidence_threshold;
    let mut pipeline = if config.detection.workers > 0 {
        let detectors = vec![replay; config.detection.workers];
        let worker = DetectionWorker::spawn_pool(&Handle::current(), detectors, threshold)?;
        FramePipeline::with_worker(&config, source, worker)?
    } else {
        FramePipeline::new(&config, source, Box::new(replay))?
    };

    let mut rendered = 0u64;
    let mut cropped = 0u64;
    for path in &frames {
        let frame = match load_frame(path) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "frame unavailable; stopping");
                break;
            }
        };

        let mut output = match pipeline.process(&frame) {
            Ok(output) => output,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "frame unavailable; stopping");
                break;
            }
        };

        if args.overlay {
            if let Some(bbox) = output.bbox {
                let source = FrameSize::from(frame.dimensions());
                let projected = pipeline.compositor().project(&bbox, output.framing, source);
                draw_face_box(&mut output.image, &projected);
            }
        }

        save_frame(&output.image, &args.output, output.frame_index)?;
        rendered += 1;
        if !output.framing.is_full_frame() {
            cropped += 1;
        }
    }

    let stats = pipeline.shutdown().await;
    println!(
        "Rendered {rendered} frames ({cropped} framed on a face, {} detection runs, {} skipped)",
        stats.detection_runs, stats.dropped_submissions
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoframe_common::config::AppConfig;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("autoframe-run-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_inputs(dir: &Path, frames: u64) -> (PathBuf, PathBuf) {
        let frames_dir = dir.join("frames");
        for i in 0..frames {
            let image = RgbImage::from_pixel(160, 90, Rgb([(i * 20) as u8, 40, 60]));
            save_frame(&image, &frames_dir, i).unwrap();
        }
        let detections = dir.join("faces.jsonl");
        std::fs::write(
            &detections,
            r#"{"frame":0,"detections":[{"x1":60,"y1":20,"x2":100,"y2":70,"confidence":0.9}]}"#,
        )
        .unwrap();
        (frames_dir, detections)
    }

    fn defaults() -> LoadedConfig {
        LoadedConfig {
            config: AppConfig::default(),
            from_file: false,
        }
    }

    #[tokio::test]
    async fn renders_every_frame_at_source_size() {
        let dir = scratch("inline");
        let (frames, detections) = write_inputs(&dir, 5);
        let output = dir.join("out");

        run(
            RunArgs {
                frames,
                detections,
                output: output.clone(),
                overlay: true,
                workers: None,
            },
            &ConfigOverrides::default(),
            defaults(),
        )
        .await
        .unwrap();

        let rendered = list_frames(&output).unwrap();
        assert_eq!(rendered.len(), 5);
        assert_eq!(load_frame(&rendered[4]).unwrap().dimensions(), (160, 90));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn explicit_width_keeps_source_aspect() {
        let dir = scratch("width");
        let (frames, detections) = write_inputs(&dir, 2);
        let output = dir.join("out");
        let overrides = ConfigOverrides {
            width: Some(80),
            ..Default::default()
        };

        run(
            RunArgs {
                frames,
                detections,
                output: output.clone(),
                overlay: false,
                workers: Some(1),
            },
            &overrides,
            defaults(),
        )
        .await
        .unwrap();

        let rendered = list_frames(&output).unwrap();
        assert_eq!(rendered.len(), 2);
        assert_eq!(load_frame(&rendered[0]).unwrap().dimensions(), (80, 45));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn empty_frame_directory_is_an_error() {
        let dir = scratch("empty");
        let detections = dir.join("faces.jsonl");
        std::fs::write(&detections, "").unwrap();

        let result = run(
            RunArgs {
                frames: dir.clone(),
                detections,
                output: dir.join("out"),
                overlay: false,
                workers: None,
            },
            &ConfigOverrides::default(),
            defaults(),
        )
        .await;
        assert!(result.is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
