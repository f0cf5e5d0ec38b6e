use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::models::*;
use crate::processing::{mean_confidence, NormalizedMrz, OcrEngine, OrientationSearcher, RegionLocator, TextNormalizer};
use crate::utils::PassportError;
use crate::validation::{ExpiryValidator, MrzParser};
use crate::verification::CrossFieldVerifier;

/// Runs the whole MRZ pipeline for one document and folds every expected
/// failure into a `Verdict`.
///
/// Locate (four orientations) -> recognize -> normalize -> parse
/// (single line, then two lines) -> expiry -> cross-check. Only a fault
/// of the OCR engine itself is returned as `Err`.
pub struct PassportValidator {
    searcher: OrientationSearcher,
    ocr: Arc<dyn OcrEngine>,
    normalizer: TextNormalizer,
    cross_field: CrossFieldVerifier,
    config: VerifierConfig,
}

impl PassportValidator {
    pub fn new(ocr: Arc<dyn OcrEngine>, config: VerifierConfig) -> Result<Self, PassportError> {
        config.validate()?;
        Ok(PassportValidator {
            searcher: OrientationSearcher::new(RegionLocator::new(config.locator.clone())),
            ocr,
            normalizer: TextNormalizer::new(config.target_length),
            cross_field: CrossFieldVerifier::new(config.matching.clone()),
            config,
        })
    }

    pub fn with_defaults(ocr: Arc<dyn OcrEngine>) -> Self {
        let config = VerifierConfig::default();
        PassportValidator {
            searcher: OrientationSearcher::default(),
            ocr,
            normalizer: TextNormalizer::new(config.target_length),
            cross_field: CrossFieldVerifier::new(config.matching.clone()),
            config,
        }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify a grayscale document image against today's date.
    pub fn verify(&self, image: &RasterImage, claimed: Option<&ClaimedIdentity>) -> Result<Verdict, PassportError> {
        self.verify_at(image, claimed, Local::now().naive_local().date())
    }

    pub fn verify_at(
        &self,
        image: &RasterImage,
        claimed: Option<&ClaimedIdentity>,
        today: NaiveDate,
    ) -> Result<Verdict, PassportError> {
        let located = match self.searcher.search(image) {
            Ok(located) => located,
            Err(err) => return Ok(Self::failure(Verdict::default(), err)),
        };

        let lines = self.ocr.recognize(&located.region.bitmap)?;
        log::debug!("OCR returned {} line(s)", lines.len());

        let mut verdict = self.verify_text(&lines, claimed, today);
        verdict.orientation = Some(located.orientation.degrees());
        verdict
            .details
            .insert(0, format!("MRZ located at {} degrees", located.orientation.degrees()));
        Ok(verdict)
    }

    /// Run the text stages on lines that were already recognized.
    pub fn verify_text(&self, lines: &[OcrLine], claimed: Option<&ClaimedIdentity>, today: NaiveDate) -> Verdict {
        let mut verdict = Verdict {
            ocr_confidence: mean_confidence(lines),
            ..Default::default()
        };

        let normalized = match self.normalizer.normalize_lines(lines) {
            Some(normalized) => normalized,
            None => {
                let err = PassportError::EmptyOcrText(format!("{} line(s) without MRZ characters", lines.len()));
                return Self::failure(verdict, err);
            }
        };

        let (text, fields) = match Self::parse(&normalized) {
            Ok(parsed) => parsed,
            Err(err) => return Self::failure(verdict, err),
        };
        verdict.mrz_text = Some(text);

        if fields.checksum_valid {
            verdict.details.push("All check digits valid".to_string());
        } else {
            verdict.details.push(format!(
                "Check digit mismatch: {}",
                fields.checks.failed_checks().join(", ")
            ));
        }

        let expiry = match ExpiryValidator::assess(&fields.expiry_date, today, self.config.expiry.expiring_soon_days) {
            Ok(expiry) => expiry,
            Err(err) => {
                verdict.parsed_fields = Some(fields);
                return Self::failure(verdict, err);
            }
        };
        Self::describe_expiry(&mut verdict.details, &expiry);

        if let Some(claimed) = claimed {
            let comparison = self.cross_field.compare(&fields, claimed);
            verdict.details.push(format!(
                "Claimed identity: {} match(es), {} mismatch(es)",
                comparison.match_count, comparison.mismatch_count
            ));
            for mismatch in &comparison.mismatches {
                verdict.details.push(format!(
                    "Mismatch on {}: MRZ '{}' vs claimed '{}'",
                    mismatch.field, mismatch.mrz_value, mismatch.claimed_value
                ));
            }
            if claimed.is_empty() {
                verdict
                    .details
                    .push("No claimed fields supplied; nothing was corroborated".to_string());
            }
            verdict.comparison = Some(comparison);
        }

        verdict.valid = fields.checksum_valid && !expiry.is_expired;
        log::info!(
            "Document {} verified: valid={}, checksum_valid={}, expired={}",
            fields.document_type,
            verdict.valid,
            fields.checksum_valid,
            expiry.is_expired
        );
        verdict.parsed_fields = Some(fields);
        verdict.expiry = Some(expiry);
        verdict
    }

    /// Single-line rendering first, then the two lines normalized apart.
    fn parse(normalized: &NormalizedMrz) -> Result<(String, ParsedMrzFields), PassportError> {
        match MrzParser::parse(&normalized.single_line) {
            Ok(fields) => Ok((normalized.single_line.clone(), fields)),
            Err(err) => {
                log::debug!("Single-line parse failed ({}), trying two lines", err);
                let joined = normalized.two_line_joined();
                let fields = MrzParser::parse_lines(&normalized.line1, &normalized.line2)?;
                Ok((joined, fields))
            }
        }
    }

    fn describe_expiry(details: &mut Vec<String>, expiry: &ExpiryAssessment) {
        if let Some(days) = expiry.days_expired {
            details.push(format!(
                "Document expired on {} ({} days ago)",
                expiry.expiry_date_formatted, days
            ));
        }
        if let Some(days) = expiry.days_until_expiry {
            details.push(format!(
                "Document valid until {} ({} days remaining)",
                expiry.expiry_date_formatted, days
            ));
        }
        if expiry.expiring_soon {
            details.push("Document expires soon".to_string());
        }
    }

    fn failure(mut verdict: Verdict, err: PassportError) -> Verdict {
        log::warn!("Verification stopped: {}", err);
        verdict.valid = false;
        verdict.error = Some(err.reason().to_string());
        verdict.details.push(err.to_string());
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::region::tests::synthetic_document;
    use crate::processing::ScriptedOcrEngine;
    use image::{GrayImage, Luma};

    const LINE1: &str = "P<USASMITH<<JOHN<<<<<<<<<<<<<<<<<<<<<<<<<<<<";
    const LINE2: &str = "L898902C36USA6908061F9406236<<<<<<<<<<<<<<06";

    struct BrokenEngine;

    impl OcrEngine for BrokenEngine {
        fn recognize(&self, _bitmap: &MrzBitmap) -> Result<Vec<OcrLine>, PassportError> {
            Err(PassportError::OcrError("model not loaded".to_string()))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn validator(lines: &[&str]) -> PassportValidator {
        PassportValidator::with_defaults(Arc::new(ScriptedOcrEngine::from_text(lines)))
    }

    #[test]
    fn test_end_to_end_valid_document() {
        let img = synthetic_document(600, 400);
        let verdict = validator(&[LINE1, LINE2]).verify_at(&img, None, today()).unwrap();
        assert!(verdict.valid, "{:?}", verdict.details);
        assert_eq!(verdict.error, None);
        assert_eq!(verdict.orientation, Some(0));
        assert_eq!(verdict.ocr_confidence, Some(1.0));
        assert_eq!(verdict.mrz_text.as_deref(), Some(format!("{}{}", LINE1, LINE2).as_str()));

        let fields = verdict.parsed_fields.unwrap();
        assert_eq!(fields.surname, "SMITH");
        assert_eq!(fields.document_number, "L898902C3");
        let expiry = verdict.expiry.unwrap();
        assert_eq!(expiry.expiry_date_formatted, "2094-06-23");
        assert!(!expiry.is_expired);
        assert!(verdict.comparison.is_none());
    }

    #[test]
    fn test_blank_image_reports_mrz_not_found() {
        let img = GrayImage::from_pixel(600, 400, Luma([240u8]));
        let verdict = validator(&[LINE1, LINE2]).verify_at(&img, None, today()).unwrap();
        assert!(!verdict.valid);
        assert_eq!(verdict.error.as_deref(), Some("mrz_not_found"));
        assert!(!verdict.details.is_empty());
        assert!(verdict.parsed_fields.is_none());
    }

    #[test]
    fn test_engine_fault_propagates() {
        let img = synthetic_document(600, 400);
        let validator = PassportValidator::with_defaults(Arc::new(BrokenEngine));
        assert!(matches!(
            validator.verify_at(&img, None, today()),
            Err(PassportError::OcrError(_))
        ));
    }

    #[test]
    fn test_empty_ocr_text() {
        let verdict = validator(&[]).verify_text(&[OcrLine::new(" ", 0.2), OcrLine::new("...", 0.1)], None, today());
        assert!(!verdict.valid);
        assert_eq!(verdict.error.as_deref(), Some("ocr_no_text"));
        assert!(!verdict.details.is_empty());
    }

    #[test]
    fn test_unparseable_text() {
        let lines = [OcrLine::new("HELLO WORLD", 0.9)];
        let verdict = validator(&[]).verify_text(&lines, None, today());
        assert!(!verdict.valid);
        assert_eq!(verdict.error.as_deref(), Some("mrz_parse_failed"));
        assert!(verdict.parsed_fields.is_none());
    }

    #[test]
    fn test_malformed_expiry_keeps_parsed_fields() {
        let line2 = LINE2.replacen("9406236", "3013996", 1);
        let lines = [OcrLine::new(LINE1, 0.9), OcrLine::new(line2, 0.9)];
        let verdict = validator(&[]).verify_text(&lines, None, today());
        assert!(!verdict.valid);
        assert_eq!(verdict.error.as_deref(), Some("invalid_expiry_date"));
        assert!(verdict.details.iter().any(|d| d.contains("301399")));
        assert!(verdict.parsed_fields.is_some());
        assert!(verdict.expiry.is_none());
    }

    #[test]
    fn test_expired_document_is_invalid() {
        let lines = [OcrLine::new(LINE1, 0.9), OcrLine::new(LINE2, 0.9)];
        let later = NaiveDate::from_ymd_opt(2095, 1, 1).unwrap();
        let verdict = validator(&[]).verify_text(&lines, None, later);
        assert!(!verdict.valid);
        assert_eq!(verdict.error, None);
        assert!(verdict.expiry.unwrap().is_expired);
    }

    #[test]
    fn test_checksum_failure_is_invalid_but_parsed() {
        let lines = [OcrLine::new(LINE1, 0.9), OcrLine::new(LINE2.replace("<<06", "<<08"), 0.9)];
        let verdict = validator(&[]).verify_text(&lines, None, today());
        assert!(!verdict.valid);
        assert_eq!(verdict.error, None);
        assert!(!verdict.parsed_fields.unwrap().checksum_valid);
        assert!(verdict.details.iter().any(|d| d.contains("composite")));
    }

    #[test]
    fn test_dashes_for_fillers_parse_identically() {
        let clean = [OcrLine::new(LINE1, 0.9), OcrLine::new(LINE2, 0.9)];
        let noisy = [
            OcrLine::new(LINE1.replacen("<<<<", "--<-", 2), 0.8),
            OcrLine::new(LINE2.replacen("<<<", "-<-", 2), 0.8),
        ];
        let v = validator(&[]);
        let expected = v.verify_text(&clean, None, today());
        let actual = v.verify_text(&noisy, None, today());
        assert_eq!(actual.mrz_text, expected.mrz_text);
        assert_eq!(actual.parsed_fields, expected.parsed_fields);
        assert!(actual.valid);
    }

    #[test]
    fn test_short_first_line_falls_back_to_two_lines() {
        // 43-character first line as often printed in sample documents
        let short_line1 = &LINE1[..43];
        let lines = [OcrLine::new(short_line1, 0.9), OcrLine::new(LINE2, 0.9)];
        let verdict = validator(&[]).verify_text(&lines, None, today());
        let fields = verdict.parsed_fields.unwrap();
        assert_eq!(fields.given_names, "JOHN");
        assert_eq!(fields.sex, "F");
        assert!(fields.checksum_valid);
    }

    #[test]
    fn test_mismatches_do_not_affect_validity() {
        let claimed = ClaimedIdentity {
            surname: Some("Jones".to_string()),
            document_number: Some("L898902C9".to_string()),
            ..Default::default()
        };
        let lines = [OcrLine::new(LINE1, 0.9), OcrLine::new(LINE2, 0.9)];
        let verdict = validator(&[]).verify_text(&lines, Some(&claimed), today());
        assert!(verdict.valid);
        let comparison = verdict.comparison.unwrap();
        assert!(!comparison.all_match);
        assert_eq!(comparison.mismatches[0].field, "surname");
        assert_eq!(comparison.warnings.len(), 1);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = VerifierConfig::default();
        config.target_length = 90;
        assert!(PassportValidator::new(Arc::new(ScriptedOcrEngine::default()), config).is_err());

        let mut config = VerifierConfig::default();
        config.locator.blur_sigma = 0.0;
        assert!(matches!(
            PassportValidator::new(Arc::new(ScriptedOcrEngine::default()), config),
            Err(PassportError::ConfigError(_))
        ));
    }
}
