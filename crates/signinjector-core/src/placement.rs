//! Signature field placements in PDF point space

use serde::{Deserialize, Serialize};

use crate::coords::PdfRect;

fn default_page() -> u32 {
    1
}

/// One signature field location plus its target page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: u32,
    /// Presentation-only tag set by the editor ("signature", "initials", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
}

impl Placement {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            page: 1,
            field_type: None,
        }
    }

    pub fn on_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn rect(&self) -> PdfRect {
        PdfRect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}
