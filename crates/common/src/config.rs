//! Application configuration.
//!
//! Every section carries serde defaults so partial JSON files load, and a
//! `validate()` method so invalid values are rejected once at start-up
//! instead of on every frame.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AutoframeError, AutoframeResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Crop planning and output settings.
    pub framing: FramingConfig,

    /// Detection cadence and filtering.
    pub detection: DetectionConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Extra space around the detected face, as a percentage of box size.
///
/// `left`/`right` are relative to box width, `top`/`bottom` to box height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

/// What the planner does with its stored crop when the face is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossPolicy {
    /// Keep the stored crop so smoothing resumes from it on reacquisition.
    #[default]
    Hold,
    /// Forget the stored crop; the next detection is adopted verbatim.
    Reset,
}

/// Resampling filter used when scaling crops to the output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Lanczos3,
}

/// Crop planning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Margins added around the face box.
    pub margins: Margins,

    /// EMA weight α of the newest raw crop, in `(0, 1]`.
    pub smoothing_factor: f64,

    /// Per-coordinate delta τ (pixels) treated as jitter and suppressed.
    pub jitter_threshold: f64,

    /// Output image width in pixels.
    pub output_width: u32,

    /// Output image height in pixels.
    pub output_height: u32,

    /// Vertical shift of the crop center as a fraction of box height.
    /// Positive values move the crop down, placing the face higher.
    pub vertical_shift: f64,

    /// Stored-crop behavior when no box is available.
    pub loss_policy: LossPolicy,

    /// Resampling filter for the compositor.
    pub resize_filter: ResizeFilter,
}

/// Detection scheduling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Run the detector every `stride` frames.
    pub stride: u32,

    /// Minimum detector confidence for a box to be used.
    pub confidence_threshold: f32,

    /// Keep tracking the last box when a detection run finds nothing.
    pub hold_last_box: bool,

    /// Background detection workers. `0` runs detection inline.
    pub workers: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "autoframe=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Margins {
    /// The same margin on every edge.
    pub const fn uniform(percent: f64) -> Self {
        Self {
            top: percent,
            bottom: percent,
            left: percent,
            right: percent,
        }
    }

    fn validate(&self) -> AutoframeResult<()> {
        for (edge, value) in [
            ("top", self.top),
            ("bottom", self.bottom),
            ("left", self.left),
            ("right", self.right),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AutoframeError::config(format!(
                    "{edge} margin must be a non-negative percentage, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(5.0)
    }
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            margins: Margins::default(),
            smoothing_factor: 0.1,
            jitter_threshold: 20.0,
            output_width: 1280,
            output_height: 720,
            vertical_shift: 0.0,
            loss_policy: LossPolicy::default(),
            resize_filter: ResizeFilter::default(),
        }
    }
}

impl FramingConfig {
    /// Output aspect ratio (width / height).
    pub fn output_aspect(&self) -> f64 {
        self.output_width as f64 / self.output_height as f64
    }

    pub fn validate(&self) -> AutoframeResult<()> {
        if self.output_width == 0 || self.output_height == 0 {
            return Err(AutoframeError::config(format!(
                "output size must be positive, got {}x{}",
                self.output_width, self.output_height
            )));
        }
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(AutoframeError::config(format!(
                "smoothing factor must be in (0, 1], got {}",
                self.smoothing_factor
            )));
        }
        if !self.jitter_threshold.is_finite() || self.jitter_threshold < 0.0 {
            return Err(AutoframeError::config(format!(
                "jitter threshold must be a non-negative pixel count, got {}",
                self.jitter_threshold
            )));
        }
        if !self.vertical_shift.is_finite() {
            return Err(AutoframeError::config("vertical shift must be finite"));
        }
        self.margins.validate()
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            stride: 3,
            confidence_threshold: 0.5,
            hold_last_box: false,
            workers: 0,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> AutoframeResult<()> {
        if self.stride == 0 {
            return Err(AutoframeError::config("detection stride must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(AutoframeError::config(format!(
                "confidence threshold must be in [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Missing or malformed files are errors.
    pub fn load_from(path: &Path) -> AutoframeResult<Self> {
        if !path.exists() {
            return Err(AutoframeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save config as pretty JSON to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> AutoframeResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Validate every section.
    pub fn validate(&self) -> AutoframeResult<()> {
        self.framing.validate()?;
        self.detection.validate()
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("autoframe").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("autoframe-config-{}-{name}", std::process::id()))
            .join("config.json")
    }

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.framing.margins, Margins::uniform(5.0));
        assert_eq!(config.framing.smoothing_factor, 0.1);
        assert_eq!(config.framing.jitter_threshold, 20.0);
        assert_eq!(config.detection.stride, 3);
        assert_eq!(config.detection.confidence_threshold, 0.5);
        assert_eq!(config.framing.loss_policy, LossPolicy::Hold);
    }

    #[test]
    fn rejects_zero_output_size() {
        let config = FramingConfig {
            output_width: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn rejects_smoothing_out_of_range() {
        for alpha in [0.0, -0.5, 1.5, f64::NAN] {
            let config = FramingConfig {
                smoothing_factor: alpha,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "alpha {alpha} accepted");
        }

        let config = FramingConfig {
            smoothing_factor: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_negative_jitter_and_margins() {
        let config = FramingConfig {
            jitter_threshold: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = FramingConfig {
            margins: Margins {
                bottom: -3.0,
                ..Margins::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bottom"));
    }

    #[test]
    fn rejects_bad_detection_settings() {
        let config = DetectionConfig {
            stride: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DetectionConfig {
            confidence_threshold: 1.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let raw = r#"{
            "framing": { "smoothing_factor": 0.25, "margins": { "bottom": 20.0 } },
            "detection": { "hold_last_box": true }
        }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.framing.smoothing_factor, 0.25);
        assert_eq!(config.framing.margins.bottom, 20.0);
        assert_eq!(config.framing.margins.top, 5.0);
        assert_eq!(config.framing.output_width, 1280);
        assert!(config.detection.hold_last_box);
        assert_eq!(config.detection.stride, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn enums_use_snake_case() {
        let raw = r#"{ "loss_policy": "reset", "resize_filter": "catmull_rom" }"#;
        let framing: FramingConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(framing.loss_policy, LossPolicy::Reset);
        assert_eq!(framing.resize_filter, ResizeFilter::CatmullRom);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let path = temp_path("roundtrip");
        let mut config = AppConfig::default();
        config.framing.vertical_shift = 0.2;
        config.detection.workers = 2;

        config.save_to(&path).unwrap();
        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn load_from_missing_file_fails() {
        let path = temp_path("missing");
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, AutoframeError::FileNotFound { .. }));
    }
}
