use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Grayscale raster handed in by the caller. Read-only to the pipeline.
pub type RasterImage = GrayImage;

/// Axis-aligned box in pixel coordinates of the image it was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        BoundingBox { x, y, w, h }
    }

    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    /// Vertical centre, in pixels.
    pub fn center_y(&self) -> f32 {
        self.y as f32 + self.h as f32 / 2.0
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(x, y, right - x, bottom - y)
    }

    /// Grow the box by `pad_x`/`pad_y` on each side without leaving a
    /// `width` x `height` image.
    pub fn padded(&self, pad_x: u32, pad_y: u32, width: u32, height: u32) -> BoundingBox {
        let x = self.x.saturating_sub(pad_x);
        let y = self.y.saturating_sub(pad_y);
        let w = (self.w + pad_x * 2).min(width.saturating_sub(x));
        let h = (self.h + pad_y * 2).min(height.saturating_sub(y));
        BoundingBox::new(x, y, w, h)
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }
}

/// Cropped, binarized MRZ sub-image. Only the OCR engine consumes it.
#[derive(Debug, Clone)]
pub struct MrzBitmap {
    pub image: GrayImage,
}

impl MrzBitmap {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A located MRZ: where it sits in the (possibly rotated) source and the
/// binarized crop.
#[derive(Debug, Clone)]
pub struct MrzRegion {
    pub bbox: BoundingBox,
    pub bitmap: MrzBitmap,
}

#[derive(Debug, Clone)]
pub enum RegionResult {
    Found(MrzRegion),
    NotFound,
}

impl RegionResult {
    pub fn is_found(&self) -> bool {
        matches!(self, RegionResult::Found(_))
    }
}

/// One text line as emitted by the OCR engine, top to bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,
    pub confidence: f32,
}

impl OcrLine {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        OcrLine {
            text: text.into(),
            confidence,
        }
    }
}

/// Check digit characters exactly as they appear on line 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckDigits {
    pub document_number_check: char,
    pub birth_date_check: char,
    pub expiry_date_check: char,
    pub personal_number_check: char,
    pub composite_check: char,
}

/// Outcome of recomputing each check digit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckDigitReport {
    pub document_number_check_valid: bool,
    pub birth_date_check_valid: bool,
    pub expiry_date_check_valid: bool,
    pub personal_number_check_valid: bool,
    pub composite_check_valid: bool,
}

impl CheckDigitReport {
    pub fn all_valid(&self) -> bool {
        self.document_number_check_valid
            && self.birth_date_check_valid
            && self.expiry_date_check_valid
            && self.personal_number_check_valid
            && self.composite_check_valid
    }

    /// Names of the checks that failed.
    pub fn failed_checks(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if !self.document_number_check_valid {
            failed.push("document_number");
        }
        if !self.birth_date_check_valid {
            failed.push("birth_date");
        }
        if !self.expiry_date_check_valid {
            failed.push("expiry_date");
        }
        if !self.personal_number_check_valid {
            failed.push("personal_number");
        }
        if !self.composite_check_valid {
            failed.push("composite");
        }
        failed
    }
}

/// Semantic fields of a TD3 MRZ. Built once per successful parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMrzFields {
    pub document_type: String,
    pub issuing_country: String,
    pub surname: String,
    pub given_names: String,
    pub document_number: String,
    pub nationality: String,
    /// YYMMDD
    pub birth_date: String,
    pub sex: String,
    /// YYMMDD
    pub expiry_date: String,
    pub personal_number: Option<String>,
    pub check_digits: CheckDigits,
    pub checks: CheckDigitReport,
    pub checksum_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryAssessment {
    pub is_expired: bool,
    pub expiring_soon: bool,
    /// YYYY-MM-DD
    pub expiry_date_formatted: String,
    pub days_until_expiry: Option<i64>,
    pub days_expired: Option<i64>,
}

/// Identity data claimed by the applicant. Only supplied, non-empty
/// fields are compared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimedIdentity {
    pub document_number: Option<String>,
    pub surname: Option<String>,
    pub given_names: Option<String>,
    /// YYYY-MM-DD
    pub date_of_birth: Option<String>,
    /// YYYY-MM-DD
    pub expiry_date: Option<String>,
    pub nationality: Option<String>,
    pub issuing_country: Option<String>,
}

impl ClaimedIdentity {
    pub fn is_empty(&self) -> bool {
        [
            &self.document_number,
            &self.surname,
            &self.given_names,
            &self.date_of_birth,
            &self.expiry_date,
            &self.nationality,
            &self.issuing_country,
        ]
        .iter()
        .all(|field| {
            field
                .as_deref()
                .map_or(true, |v| v.chars().all(|c| c == '<' || c.is_whitespace()))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMismatch {
    pub field: String,
    pub mrz_value: String,
    pub claimed_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub matches: Vec<String>,
    pub mismatches: Vec<FieldMismatch>,
    pub warnings: Vec<String>,
    pub match_count: usize,
    pub mismatch_count: usize,
    /// True iff `mismatches` is empty. Vacuously true when nothing was
    /// claimed, so it is not evidence of corroboration on its own.
    pub all_match: bool,
}

/// The single result of one document verification call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub valid: bool,
    pub parsed_fields: Option<ParsedMrzFields>,
    pub expiry: Option<ExpiryAssessment>,
    pub comparison: Option<ComparisonResult>,
    pub error: Option<String>,
    pub details: Vec<String>,
    pub orientation: Option<u16>,
    pub ocr_confidence: Option<f32>,
    pub mrz_text: Option<String>,
}
