//! Debug overlay: the tracked face drawn on top of a rendered frame.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use autoframe_frame_model::geometry::BoundingBox;

pub const OVERLAY_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const LINE_WIDTH: u32 = 2;
const TAB_WIDTH: u32 = 48;
const TAB_HEIGHT: u32 = 12;

/// Draw `bbox` (in image coordinates) as a hollow rectangle with a filled
/// label tab on its top edge.
///
/// Boxes that fall entirely outside the image are skipped.
pub fn draw_face_box(image: &mut RgbImage, bbox: &BoundingBox) {
    let Some(rect) = clip_to_image(bbox, image.width(), image.height()) else {
        return;
    };

    for inset in 0..LINE_WIDTH {
        let w = rect.width().saturating_sub(2 * inset);
        let h = rect.height().saturating_sub(2 * inset);
        if w == 0 || h == 0 {
            break;
        }
        let ring = Rect::at(rect.left() + inset as i32, rect.top() + inset as i32).of_size(w, h);
        draw_hollow_rect_mut(image, ring, OVERLAY_COLOR);
    }

    // Tab sits above the box, or just inside it when the box touches the top.
    let tab_top = if rect.top() >= TAB_HEIGHT as i32 {
        rect.top() - TAB_HEIGHT as i32
    } else {
        rect.top()
    };
    let tab = Rect::at(rect.left(), tab_top).of_size(TAB_WIDTH.min(rect.width()), TAB_HEIGHT);
    draw_filled_rect_mut(image, tab, OVERLAY_COLOR);
}

fn clip_to_image(bbox: &BoundingBox, width: u32, height: u32) -> Option<Rect> {
    if !bbox.is_finite() || width == 0 || height == 0 {
        return None;
    }
    let (w, h) = (width as f64, height as f64);
    let x1 = bbox.x1.max(0.0).round();
    let y1 = bbox.y1.max(0.0).round();
    let x2 = bbox.x2.min(w).round();
    let y2 = bbox.y2.min(h).round();
    if x2 - x1 < 1.0 || y2 - y1 < 1.0 {
        return None;
    }
    Some(Rect::at(x1 as i32, y1 as i32).of_size((x2 - x1) as u32, (y2 - y1) as u32))
}
