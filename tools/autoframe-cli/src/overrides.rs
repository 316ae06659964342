//! Command-line overrides for config file values.

use clap::Args;

use autoframe_common::config::{AppConfig, LossPolicy, ResizeFilter};
use autoframe_frame_model::geometry::FrameSize;

#[derive(Debug, Clone, Default, Args)]
pub struct ConfigOverrides {
    /// Margin on every edge, as a percentage of the face box size
    #[arg(long)]
    pub margin: Option<f64>,

    /// Top margin (percent of box height)
    #[arg(long)]
    pub margin_top: Option<f64>,

    /// Bottom margin (percent of box height)
    #[arg(long)]
    pub margin_bottom: Option<f64>,

    /// Left margin (percent of box width)
    #[arg(long)]
    pub margin_left: Option<f64>,

    /// Right margin (percent of box width)
    #[arg(long)]
    pub margin_right: Option<f64>,

    /// Smoothing factor in (0, 1]; lower is steadier
    #[arg(long)]
    pub smoothing: Option<f64>,

    /// Crop movement (pixels) ignored as jitter
    #[arg(long)]
    pub jitter: Option<f64>,

    /// Output width
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height
    #[arg(long)]
    pub height: Option<u32>,

    /// Shift the crop center down by this fraction of the face height
    #[arg(long, allow_hyphen_values = true)]
    pub vertical_shift: Option<f64>,

    /// What to do with the crop when the face is lost: hold|reset
    #[arg(long, value_parser = parse_loss_policy)]
    pub loss_policy: Option<LossPolicy>,

    /// Resampling filter: nearest|triangle|catmull-rom|lanczos3
    #[arg(long, value_parser = parse_resize_filter)]
    pub filter: Option<ResizeFilter>,

    /// Run the detector every N frames
    #[arg(long)]
    pub stride: Option<u32>,

    /// Minimum detector confidence
    #[arg(long)]
    pub confidence: Option<f32>,

    /// Keep the last face box when a detection run finds nothing
    /// (`--hold-last-box false` turns a configured hold off)
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub hold_last_box: Option<bool>,
}

impl ConfigOverrides {
    /// Apply every flag that was given on top of `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        let framing = &mut config.framing;
        if let Some(margin) = self.margin {
            framing.margins.top = margin;
            framing.margins.bottom = margin;
            framing.margins.left = margin;
            framing.margins.right = margin;
        }
        set(&mut framing.margins.top, self.margin_top);
        set(&mut framing.margins.bottom, self.margin_bottom);
        set(&mut framing.margins.left, self.margin_left);
        set(&mut framing.margins.right, self.margin_right);
        set(&mut framing.smoothing_factor, self.smoothing);
        set(&mut framing.jitter_threshold, self.jitter);
        set(&mut framing.output_width, self.width);
        set(&mut framing.output_height, self.height);
        set(&mut framing.vertical_shift, self.vertical_shift);
        set(&mut framing.loss_policy, self.loss_policy);
        set(&mut framing.resize_filter, self.filter);

        let detection = &mut config.detection;
        set(&mut detection.stride, self.stride);
        set(&mut detection.confidence_threshold, self.confidence);
        set(&mut detection.hold_last_box, self.hold_last_box);
    }

    /// Output size for a `source` stream when the config file did not set one.
    ///
    /// A single given dimension keeps the source aspect ratio.
    pub fn output_size(&self, source: FrameSize) -> FrameSize {
        match (self.width, self.height) {
            (Some(width), Some(height)) => FrameSize::new(width, height),
            (Some(width), None) => {
                let height = (width as f64 / source.aspect()).round().max(1.0) as u32;
                FrameSize::new(width, height)
            }
            (None, Some(height)) => {
                let width = (height as f64 * source.aspect()).round().max(1.0) as u32;
                FrameSize::new(width, height)
            }
            (None, None) => source,
        }
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn parse_loss_policy(s: &str) -> Result<LossPolicy, String> {
    match s.to_ascii_lowercase().as_str() {
        "hold" => Ok(LossPolicy::Hold),
        "reset" => Ok(LossPolicy::Reset),
        other => Err(format!("unknown loss policy '{other}' (expected hold or reset)")),
    }
}

fn parse_resize_filter(s: &str) -> Result<ResizeFilter, String> {
    match s.to_ascii_lowercase().replace('_', "-").as_str() {
        "nearest" => Ok(ResizeFilter::Nearest),
        "triangle" | "bilinear" => Ok(ResizeFilter::Triangle),
        "catmull-rom" | "bicubic" => Ok(ResizeFilter::CatmullRom),
        "lanczos3" => Ok(ResizeFilter::Lanczos3),
        other => Err(format!("unknown resize filter '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_leave_config_untouched() {
        let mut config = AppConfig::default();
        ConfigOverrides::default().apply(&mut config);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn edge_margin_wins_over_uniform_margin() {
        let overrides = ConfigOverrides {
            margin: Some(10.0),
            margin_top: Some(30.0),
            ..Default::default()
        };
        let mut config = AppConfig::default();
        overrides.apply(&mut config);

        let margins = config.framing.margins;
        assert_eq!(margins.top, 30.0);
        assert_eq!(margins.bottom, 10.0);
        assert_eq!(margins.left, 10.0);
        assert_eq!(margins.right, 10.0);
    }

    #[test]
    fn detection_flags_apply() {
        let overrides = ConfigOverrides {
            stride: Some(1),
            confidence: Some(0.8),
            hold_last_box: Some(true),
            loss_policy: Some(LossPolicy::Reset),
            ..Default::default()
        };
        let mut config = AppConfig::default();
        overrides.apply(&mut config);

        assert_eq!(config.detection.stride, 1);
        assert_eq!(config.detection.confidence_threshold, 0.8);
        assert!(config.detection.hold_last_box);
        assert_eq!(config.framing.loss_policy, LossPolicy::Reset);
    }

    #[derive(Debug, clap::Parser)]
    struct Flags {
        #[command(flatten)]
        overrides: ConfigOverrides,
    }

    fn parse(args: &[&str]) -> ConfigOverrides {
        use clap::Parser;
        Flags::try_parse_from(std::iter::once("autoframe").chain(args.iter().copied()))
            .unwrap()
            .overrides
    }

    #[test]
    fn hold_last_box_flag_can_switch_either_way() {
        assert_eq!(parse(&[]).hold_last_box, None);
        assert_eq!(parse(&["--hold-last-box"]).hold_last_box, Some(true));
        assert_eq!(
            parse(&["--hold-last-box", "--stride", "2"]).hold_last_box,
            Some(true)
        );

        let mut config = AppConfig::default();
        config.detection.hold_last_box = true;
        parse(&["--hold-last-box=false"]).apply(&mut config);
        assert!(!config.detection.hold_last_box);

        parse(&["--hold-last-box", "true"]).apply(&mut config);
        assert!(config.detection.hold_last_box);
    }

    #[test]
    fn output_size_follows_source() {
        let source = FrameSize::new(1920, 1080);
        let none = ConfigOverrides::default();
        assert_eq!(none.output_size(source), source);

        let width_only = ConfigOverrides {
            width: Some(640),
            ..Default::default()
        };
        assert_eq!(width_only.output_size(source), FrameSize::new(640, 360));

        let height_only = ConfigOverrides {
            height: Some(720),
            ..Default::default()
        };
        assert_eq!(height_only.output_size(source), FrameSize::new(1280, 720));
    }

    #[test]
    fn value_parsers() {
        assert_eq!(parse_loss_policy("Reset"), Ok(LossPolicy::Reset));
        assert!(parse_loss_policy("forget").is_err());
        assert_eq!(parse_resize_filter("catmull_rom"), Ok(ResizeFilter::CatmullRom));
        assert_eq!(parse_resize_filter("lanczos3"), Ok(ResizeFilter::Lanczos3));
        assert!(parse_resize_filter("sinc").is_err());
    }
}
