//! Aspect-preserving placement of a raster image inside a target box

use crate::coords::PdfRect;
use crate::error::CoreError;

/// Largest rectangle with the image's aspect ratio that fits inside `target`,
/// centered within it
///
/// Works in whatever coordinate space `target` is expressed in; the offset is
/// applied relative to `target.x` / `target.y`.
pub fn fit_centered(image_w: f64, image_h: f64, target: &PdfRect) -> Result<PdfRect, CoreError> {
    if !(target.width > 0.0) || !(target.height > 0.0) {
        return Err(CoreError::InvalidBoxDimensions {
            width: target.width,
            height: target.height,
        });
    }

    let image_ratio = image_w / image_h;
    let box_ratio = target.width / target.height;

    let (draw_w, draw_h) = if image_ratio > box_ratio {
        // Relatively wider than the box: width-limited
        (target.width, target.width / image_ratio)
    } else {
        (target.height * image_ratio, target.height)
    };

    Ok(PdfRect {
        x: target.x + (target.width - draw_w) / 2.0,
        y: target.y + (target.height - draw_h) / 2.0,
        width: draw_w,
        height: draw_h,
    })
}
