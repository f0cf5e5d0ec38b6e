use crate::models::{ClaimedIdentity, ComparisonResult, FieldMismatch, MatchThresholds, ParsedMrzFields};
use crate::validation::{ExpiryValidator, Similarity};

/// Compares parsed MRZ fields against an applicant's claimed identity.
///
/// Only claimed fields that are present and non-blank are evaluated. An
/// empty claim therefore yields `all_match = true` without corroborating
/// anything.
pub struct CrossFieldVerifier {
    thresholds: MatchThresholds,
}

impl CrossFieldVerifier {
    pub fn new(thresholds: MatchThresholds) -> Self {
        CrossFieldVerifier { thresholds }
    }

    pub fn compare(&self, fields: &ParsedMrzFields, claimed: &ClaimedIdentity) -> ComparisonResult {
        let mut result = ComparisonResult::default();

        if let Some(value) = Self::supplied(&claimed.document_number) {
            self.compare_document_number(&mut result, &fields.document_number, value);
        }
        if let Some(value) = Self::supplied(&claimed.surname) {
            self.compare_surname(&mut result, &fields.surname, value);
        }
        if let Some(value) = Self::supplied(&claimed.given_names) {
            self.compare_given_names(&mut result, &fields.given_names, value);
        }
        if let Some(value) = Self::supplied(&claimed.date_of_birth) {
            Self::compare_date(&mut result, "date_of_birth", &fields.birth_date, value);
        }
        if let Some(value) = Self::supplied(&claimed.expiry_date) {
            Self::compare_date(&mut result, "expiry_date", &fields.expiry_date, value);
        }
        if let Some(value) = Self::supplied(&claimed.nationality) {
            Self::compare_code(&mut result, "nationality", &fields.nationality, value);
        }
        if let Some(value) = Self::supplied(&claimed.issuing_country) {
            Self::compare_code(&mut result, "issuing_country", &fields.issuing_country, value);
        }

        result.match_count = result.matches.len();
        result.mismatch_count = result.mismatches.len();
        result.all_match = result.mismatches.is_empty();

        if !result.all_match {
            log::warn!(
                "{} claimed field(s) disagree with the MRZ",
                result.mismatch_count
            );
        }
        result
    }

    /// A claim made only of whitespace or filler counts as not supplied.
    fn supplied(value: &Option<String>) -> Option<&str> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| v.chars().any(|c| c != '<' && !c.is_whitespace()))
    }

    fn compare_document_number(&self, result: &mut ComparisonResult, mrz: &str, claimed: &str) {
        let mrz_clean = Self::strip_filler(mrz);
        let claimed_clean = Self::strip_filler(claimed);
        if mrz_clean == claimed_clean {
            result.matches.push("document_number".to_string());
            return;
        }

        let similarity = Similarity::token_sort(&mrz_clean, &claimed_clean);
        if similarity >= self.thresholds.document_number {
            result.matches.push("document_number".to_string());
            result.warnings.push(format!(
                "document_number: near match '{}' vs '{}' (similarity {:.2})",
                mrz_clean, claimed_clean, similarity
            ));
        } else {
            Self::mismatch(result, "document_number", mrz, claimed, Some(similarity));
        }
    }

    fn compare_surname(&self, result: &mut ComparisonResult, mrz: &str, claimed: &str) {
        let mrz_clean = Self::strip_filler(mrz);
        let claimed_clean = Self::strip_filler(claimed);
        if mrz_clean == claimed_clean {
            result.matches.push("surname".to_string());
            return;
        }

        let similarity = Similarity::token_sort(&mrz_clean, &claimed_clean);
        if similarity >= self.thresholds.surname {
            result.matches.push("surname".to_string());
            result.warnings.push(format!(
                "surname: near match '{}' vs '{}' (similarity {:.2})",
                mrz_clean, claimed_clean, similarity
            ));
        } else {
            Self::mismatch(result, "surname", mrz, claimed, Some(similarity));
        }
    }

    fn compare_given_names(&self, result: &mut ComparisonResult, mrz: &str, claimed: &str) {
        let mrz_clean = Self::words(mrz);
        let claimed_clean = Self::words(claimed);
        if mrz_clean == claimed_clean {
            result.matches.push("given_names".to_string());
            return;
        }

        let similarity = Similarity::token_sort(&mrz_clean, &claimed_clean);
        let contained = !mrz_clean.is_empty()
            && !claimed_clean.is_empty()
            && (mrz_clean.contains(claimed_clean.as_str()) || claimed_clean.contains(mrz_clean.as_str()));
        if similarity >= self.thresholds.given_names || contained {
            result.matches.push("given_names".to_string());
            result.warnings.push(format!(
                "given_names: partial match '{}' vs '{}' (similarity {:.2})",
                mrz_clean, claimed_clean, similarity
            ));
        } else {
            Self::mismatch(result, "given_names", mrz, claimed, Some(similarity));
        }
    }

    /// MRZ YYMMDD is converted to YYYY-MM-DD and must equal the claim
    /// exactly.
    fn compare_date(result: &mut ComparisonResult, field: &str, mrz: &str, claimed: &str) {
        match ExpiryValidator::mrz_date_to_iso(mrz) {
            Ok(iso) if iso == claimed => result.matches.push(field.to_string()),
            Ok(iso) => Self::mismatch(result, field, &iso, claimed, None),
            Err(_) => Self::mismatch(result, field, mrz, claimed, None),
        }
    }

    fn compare_code(result: &mut ComparisonResult, field: &str, mrz: &str, claimed: &str) {
        if mrz.eq_ignore_ascii_case(claimed) {
            result.matches.push(field.to_string());
        } else {
            Self::mismatch(result, field, mrz, claimed, None);
        }
    }

    fn mismatch(result: &mut ComparisonResult, field: &str, mrz: &str, claimed: &str, similarity: Option<f64>) {
        result.mismatches.push(FieldMismatch {
            field: field.to_string(),
            mrz_value: mrz.to_string(),
            claimed_value: claimed.to_string(),
            similarity,
        });
    }

    fn strip_filler(value: &str) -> String {
        value
            .chars()
            .filter(|c| *c != '<' && !c.is_whitespace())
            .collect::<String>()
            .to_uppercase()
    }

    /// Uppercase words separated by single spaces.
    fn words(value: &str) -> String {
        value
            .to_uppercase()
            .split(|c: char| c.is_whitespace() || c == '<')
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for CrossFieldVerifier {
    fn default() -> Self {
        CrossFieldVerifier::new(MatchThresholds::default())
    }
}
