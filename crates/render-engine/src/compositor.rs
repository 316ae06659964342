//! Frame compositor: turns a framing decision into a fixed-size image.
//!
//! The source frame is never modified. A crop is cut out of it with
//! `crop_imm` and resampled to the output size; a full-frame decision
//! stretches the whole frame to the output size.

use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::warn;

use autoframe_common::config::{FramingConfig, ResizeFilter};
use autoframe_common::error::{AutoframeError, AutoframeResult};
use autoframe_frame_model::geometry::{BoundingBox, CropRectangle, FrameSize};
use autoframe_processing_core::Framing;

/// Renders framing decisions at a fixed output size.
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    output: FrameSize,
    filter: FilterType,
}

impl FrameCompositor {
    pub fn new(output_width: u32, output_height: u32, filter: ResizeFilter) -> AutoframeResult<Self> {
        let output = FrameSize::new(output_width, output_height);
        if output.is_empty() {
            return Err(AutoframeError::config(format!(
                "output size must be positive, got {output}"
            )));
        }
        Ok(Self {
            output,
            filter: filter_type(filter),
        })
    }

    /// Compositor for the output size and filter of a framing config.
    pub fn from_config(config: &FramingConfig) -> AutoframeResult<Self> {
        Self::new(
            config.output_width,
            config.output_height,
            config.resize_filter,
        )
    }

    pub fn output_size(&self) -> FrameSize {
        self.output
    }

    /// Render `framing` of `frame` at the output size.
    pub fn render(&self, frame: &RgbImage, framing: Framing) -> RgbImage {
        let source = FrameSize::from(frame.dimensions());

        let rect = match framing {
            Framing::FullFrame => return self.scale(frame),
            Framing::Crop(rect) if rect.is_full(source) => return self.scale(frame),
            Framing::Crop(rect) => rect,
        };

        let Some(visible) = rect.intersect(source) else {
            warn!(?rect, frame = %source, "crop outside frame; rendering full frame");
            return self.scale(frame);
        };

        let cropped =
            imageops::crop_imm(frame, visible.x1, visible.y1, visible.width(), visible.height())
                .to_image();
        self.scale(&cropped)
    }

    /// Map `bbox` from source coordinates into output coordinates for the
    /// image `render` produces from the same framing.
    pub fn project(&self, bbox: &BoundingBox, framing: Framing, source: FrameSize) -> BoundingBox {
        let rect = framing
            .crop()
            .and_then(|rect| rect.intersect(source))
            .unwrap_or_else(|| source.full_rect());
        project_box(bbox, &rect, self.output)
    }

    fn scale(&self, image: &RgbImage) -> RgbImage {
        if image.dimensions() == (self.output.width, self.output.height) {
            return image.clone();
        }
        imageops::resize(image, self.output.width, self.output.height, self.filter)
    }
}

fn project_box(bbox: &BoundingBox, source: &CropRectangle, output: FrameSize) -> BoundingBox {
    let sx = output.width as f64 / source.width() as f64;
    let sy = output.height as f64 / source.height() as f64;
    let (ox, oy) = (source.x1 as f64, source.y1 as f64);
    BoundingBox::new(
        (bbox.x1 - ox) * sx,
        (bbox.y1 - oy) * sy,
        (bbox.x2 - ox) * sx,
        (bbox.y2 - oy) * sy,
    )
}

fn filter_type(filter: ResizeFilter) -> FilterType {
    match filter {
        ResizeFilter::Nearest => FilterType::Nearest,
        ResizeFilter::Triangle => FilterType::Triangle,
        ResizeFilter::CatmullRom => FilterType::CatmullRom,
        ResizeFilter::Lanczos3 => FilterType::Lanczos3,
    }
}
