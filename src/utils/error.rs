use thiserror::Error;

#[derive(Debug, Error)]
pub enum PassportError {
    #[error("Image processing error: {0}")]
    ImageProcessingError(String),
    #[error("MRZ not found: {0}")]
    MrzNotFound(String),
    #[error("OCR engine error: {0}")]
    OcrError(String),
    #[error("OCR returned no text: {0}")]
    EmptyOcrText(String),
    #[error("MRZ parsing error: {0}")]
    MrzParsingError(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PassportError {
    /// Short machine-friendly reason used in `Verdict::error`.
    pub fn reason(&self) -> &'static str {
        match self {
            PassportError::ImageProcessingError(_) => "image_processing_failed",
            PassportError::MrzNotFound(_) => "mrz_not_found",
            PassportError::OcrError(_) => "ocr_engine_failure",
            PassportError::EmptyOcrText(_) => "ocr_no_text",
            PassportError::MrzParsingError(_) => "mrz_parse_failed",
            PassportError::InvalidDate(_) => "invalid_expiry_date",
            PassportError::ConfigError(_) => "invalid_configuration",
            PassportError::IoError(_) => "io_error",
        }
    }
}
