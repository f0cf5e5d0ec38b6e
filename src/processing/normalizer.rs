use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::models::{OcrLine, TD3_TOTAL_LENGTH};

lazy_static! {
    // L, I and 1 are what OCR tends to see in a row of fillers
    static ref FILLER_LOOKALIKE_RUN: Regex = Regex::new(r"[LI1]{3,}").unwrap();
    static ref STROKE_RUN: Regex = Regex::new(r"[|/]{2,}").unwrap();
    // "PUSA..." where "P<USA..." was meant
    static ref MISSING_TYPE_FILLER: Regex = Regex::new(r"^[A-Z]{4}").unwrap();
}

/// Both renderings of one recognized MRZ. Parsing tries `single_line`
/// first and falls back to the two lines normalized separately.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMrz {
    pub single_line: String,
    pub line1: String,
    pub line2: String,
}

impl NormalizedMrz {
    pub fn two_line_joined(&self) -> String {
        format!("{}{}", self.line1, self.line2)
    }
}

/// Repairs OCR output into the MRZ alphabet `[A-Z0-9<]` at a fixed length.
///
/// Output length is always exactly the target: short input is padded with
/// trailing `<`, long input is cut from the end (trailing characters are
/// assumed to be filler). Normalizing a normalized string is a no-op.
pub struct TextNormalizer {
    target_length: usize,
}

impl TextNormalizer {
    pub fn new(target_length: usize) -> Self {
        TextNormalizer { target_length }
    }

    pub fn target_length(&self) -> usize {
        self.target_length
    }

    /// Normalize free text to the full target length.
    pub fn normalize(&self, text: &str) -> String {
        Self::fit(&Self::realign_document_type(Self::clean(text)), self.target_length)
    }

    /// Build both renderings from OCR lines. `None` when nothing in the
    /// lines survives cleaning.
    pub fn normalize_lines(&self, lines: &[OcrLine]) -> Option<NormalizedMrz> {
        let raw: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        if raw.iter().all(|text| Self::clean(text).is_empty()) {
            return None;
        }

        let single_line = self.normalize(&raw.concat());

        let line_length = self.target_length / 2;
        let (first, second) = Self::split_into_two(&raw, line_length);
        let line1 = Self::fit(&Self::realign_document_type(Self::clean(&first)), line_length);
        let line2 = Self::fit(&Self::clean(&second), line_length);

        log::debug!("Normalized MRZ: {}", single_line);
        Some(NormalizedMrz {
            single_line,
            line1,
            line2,
        })
    }

    /// Uppercase, drop whitespace, map filler look-alikes to `<`, drop
    /// anything outside the MRZ alphabet. No length handling.
    pub fn clean(text: &str) -> String {
        let upper: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_uppercase)
            .map(|c| match c {
                '-' | '>' => '<',
                other => other,
            })
            .collect();

        let strokes = STROKE_RUN.replace_all(&upper, Self::filler_run);
        let alphabet: String = strokes
            .chars()
            .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '<')
            .collect();
        // after stripping so that removed characters cannot join two short
        // runs into a new one
        FILLER_LOOKALIKE_RUN
            .replace_all(&alphabet, Self::filler_run)
            .into_owned()
    }

    fn filler_run(caps: &Captures) -> String {
        "<".repeat(caps[0].chars().count())
    }

    /// Re-insert the filler of a one-letter document type when OCR dropped it.
    fn realign_document_type(text: String) -> String {
        if MISSING_TYPE_FILLER.is_match(&text) {
            let mut realigned = String::with_capacity(text.len() + 1);
            realigned.push_str(&text[..1]);
            realigned.push('<');
            realigned.push_str(&text[1..]);
            realigned
        } else {
            text
        }
    }

    fn fit(text: &str, length: usize) -> String {
        let mut fitted: String = text.chars().take(length).collect();
        while fitted.len() < length {
            fitted.push('<');
        }
        fitted
    }

    /// Group OCR segments into two lines, choosing the split whose line
    /// lengths are closest to `line_length` each. OCR engines sometimes
    /// break one MRZ line into several segments.
    fn split_into_two(raw: &[&str], line_length: usize) -> (String, String) {
        if raw.len() < 2 {
            // a single segment is split at the line boundary
            let cleaned = Self::clean(raw.first().copied().unwrap_or(""));
            let cut = cleaned.len().min(line_length);
            return (cleaned[..cut].to_string(), cleaned[cut..].to_string());
        }

        let lengths: Vec<usize> = raw.iter().map(|text| Self::clean(text).len()).collect();
        let mut best_split = 1;
        let mut best_cost = usize::MAX;
        for split in 1..raw.len() {
            let head: usize = lengths[..split].iter().sum();
            let tail: usize = lengths[split..].iter().sum();
            let cost = head.abs_diff(line_length) + tail.abs_diff(line_length);
            if cost < best_cost {
                best_cost = cost;
                best_split = split;
            }
        }
        (raw[..best_split].concat(), raw[best_split..].concat())
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        TextNormalizer::new(TD3_TOTAL_LENGTH)
    }
}
