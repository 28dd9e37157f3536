//! Signature burning for PDF documents
//!
//! This crate turns a drawn signature image plus a list of boxes into a new
//! PDF with the signature rendered onto the requested pages, using lopdf.
//!
//! - `to_pdf_points`: on-screen pixel boxes to PDF point space
//! - `fit_centered`: aspect-preserving placement inside a box
//! - `burn_signature`: composite one image at every placement
//! - `parse_signing_request`: ordered validation of the wire request
//! - `fingerprint`: SHA-256 change detection for audit records

pub mod compositor;
pub mod coords;
pub mod error;
pub mod fit;
pub mod hash;
pub mod placement;
pub mod raster;
pub mod sample;
pub mod validation;

pub use compositor::burn_signature;
pub use coords::{to_pdf_points, PagePoints, PdfRect, PixelBox, RenderedGeometry};
pub use error::CoreError;
pub use fit::fit_centered;
pub use hash::fingerprint;
pub use placement::Placement;
pub use raster::{decode_signature_payload, SignatureFormat, SignatureImage};
pub use sample::{blank_document, sample_document};
pub use validation::{
    parse_signing_request, validate, SigningRequest, ValidationError, ValidationErrorKind,
    MAX_PLACEMENTS,
};
