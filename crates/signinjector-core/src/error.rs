use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid page geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid box dimensions: width={width}, height={height}")]
    InvalidBoxDimensions { width: f64, height: f64 },

    #[error("Unsupported signature image format (expected PNG or JPEG)")]
    UnsupportedImageFormat,

    #[error("Invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<lopdf::Error> for CoreError {
    fn from(err: lopdf::Error) -> Self {
        CoreError::OperationError(err.to_string())
    }
}
