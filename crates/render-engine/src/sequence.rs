//! Image sequences on disk: the frame source and the render sink.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;

use autoframe_common::error::{AutoframeError, AutoframeResult};
use autoframe_frame_model::detection::FrameIndex;

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Image files in `dir`, sorted by file name.
pub fn list_frames(dir: &Path) -> AutoframeResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AutoframeError::FileNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut frames: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_frame_file(path))
        .collect();
    frames.sort();
    Ok(frames)
}

/// Decode one frame as 8-bit RGB.
pub fn load_frame(path: &Path) -> AutoframeResult<RgbImage> {
    let image = image::open(path).map_err(|e| {
        AutoframeError::frame_unavailable(format!("{}: {e}", path.display()))
    })?;
    Ok(image.to_rgb8())
}

/// Write a rendered frame as `frame_NNNNNN.png` inside `dir`.
pub fn save_frame(image: &RgbImage, dir: &Path, index: FrameIndex) -> AutoframeResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(frame_file_name(index));
    image
        .save(&path)
        .map_err(|e| AutoframeError::render(format!("{}: {e}", path.display())))?;
    Ok(path)
}

pub fn frame_file_name(index: FrameIndex) -> String {
    format!("frame_{index:06}.png")
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
