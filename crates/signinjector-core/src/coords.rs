//! Coordinate transformation from rendered page pixels to PDF points
//!
//! Browsers measure a placed field in CSS pixels with the origin at the
//! top-left of the rendered page. PDF content uses points (1/72 inch) with
//! the origin at the bottom-left. Everything that crosses that boundary goes
//! through [`to_pdf_points`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Axis-aligned box in PDF point space (bottom-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Axis-aligned box in rendered pixel space (top-left origin, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// On-screen footprint of a rendered page
///
/// Re-derived whenever the displayed page size changes; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedGeometry {
    pub width_px: f64,
    pub height_px: f64,
}

/// Intrinsic page size in PDF points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePoints {
    pub width_pts: f64,
    pub height_pts: f64,
}

impl PagePoints {
    pub fn letter() -> Self {
        Self {
            width_pts: 612.0,
            height_pts: 792.0,
        }
    }

    pub fn a4() -> Self {
        Self {
            width_pts: 595.0,
            height_pts: 842.0,
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn require_positive(name: &str, value: f64) -> Result<(), CoreError> {
    // `!(v > 0)` also rejects NaN
    if !(value > 0.0) {
        return Err(CoreError::InvalidGeometry(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Convert a box measured on the rendered page into PDF points
///
/// The y axis is flipped: the distance from the bottom edge of the rendered
/// page to the bottom edge of the box becomes the PDF y coordinate. All four
/// output values are rounded to 3 decimal places.
pub fn to_pdf_points(
    pixel_box: &PixelBox,
    rendered: &RenderedGeometry,
    page: &PagePoints,
) -> Result<PdfRect, CoreError> {
    require_positive("widthPx", rendered.width_px)?;
    require_positive("heightPx", rendered.height_px)?;
    require_positive("widthPts", page.width_pts)?;
    require_positive("heightPts", page.height_pts)?;

    let x_pts = (pixel_box.x / rendered.width_px) * page.width_pts;
    let w_pts = (pixel_box.width / rendered.width_px) * page.width_pts;
    let h_pts = (pixel_box.height / rendered.height_px) * page.height_pts;

    let y_from_bottom_px = rendered.height_px - (pixel_box.y + pixel_box.height);
    let y_pts = (y_from_bottom_px / rendered.height_px) * page.height_pts;

    Ok(PdfRect {
        x: round3(x_pts),
        y: round3(y_pts),
        width: round3(w_pts),
        height: round3(h_pts),
    })
}
