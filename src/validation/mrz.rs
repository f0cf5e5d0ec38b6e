use crate::models::{
    CheckDigitReport, CheckDigits, ParsedMrzFields, TD3_LINE_LENGTH, TD3_TOTAL_LENGTH,
};
use crate::utils::PassportError;

const WEIGHTS: [u32; 3] = [7, 3, 1];

/// Decodes normalized TD3 text (ICAO Doc 9303 part 4) and recomputes its
/// check digits.
///
/// A wrong check digit does not fail the parse; it clears
/// `checksum_valid`. Only structural problems (length, alphabet, a
/// non-digit where the layout requires one) are errors.
pub struct MrzParser;

impl MrzParser {
    /// Value of one MRZ character for check digit purposes.
    pub fn char_value(c: char) -> Option<u32> {
        match c {
            '0'..='9' => c.to_digit(10),
            'A'..='Z' => Some(c as u32 - 'A' as u32 + 10),
            '<' => Some(0),
            _ => None,
        }
    }

    /// Weighted (7, 3, 1) sum modulo 10.
    pub fn check_digit(field: &str) -> Option<u32> {
        let mut sum = 0;
        for (i, c) in field.chars().enumerate() {
            sum += Self::char_value(c)? * WEIGHTS[i % 3];
        }
        Some(sum % 10)
    }

    /// Whether `check` is the check digit of `field`. A `<` check
    /// character counts as 0.
    pub fn verify(field: &str, check: char) -> bool {
        match (Self::check_digit(field), Self::char_value(check)) {
            (Some(expected), Some(found)) if check.is_ascii_digit() || check == '<' => expected == found,
            _ => false,
        }
    }

    /// Parse the two 44-character lines.
    pub fn parse_lines(line1: &str, line2: &str) -> Result<ParsedMrzFields, PassportError> {
        Self::check_line_length("line 1", line1)?;
        Self::check_line_length("line 2", line2)?;
        Self::parse(&format!("{}{}", line1, line2))
    }

    /// Parse the 88-character single-line form.
    pub fn parse(text: &str) -> Result<ParsedMrzFields, PassportError> {
        let length = text.chars().count();
        if length != TD3_TOTAL_LENGTH {
            return Err(PassportError::MrzParsingError(format!(
                "expected {} characters, got {}",
                TD3_TOTAL_LENGTH, length
            )));
        }
        if let Some((pos, c)) = text.chars().enumerate().find(|(_, c)| Self::char_value(*c).is_none()) {
            return Err(PassportError::MrzParsingError(format!(
                "invalid character '{}' at position {}",
                c, pos
            )));
        }

        let (line1, line2) = text.split_at(TD3_LINE_LENGTH);

        let birth_date = Self::digits(line2, 13..19, "birth date")?;
        let expiry_date = Self::digits(line2, 21..27, "expiry date")?;
        let check_digits = CheckDigits {
            document_number_check: Self::check_char(line2, 9, "document number check digit", false)?,
            birth_date_check: Self::check_char(line2, 19, "birth date check digit", false)?,
            expiry_date_check: Self::check_char(line2, 27, "expiry date check digit", false)?,
            personal_number_check: Self::check_char(line2, 42, "personal number check digit", true)?,
            composite_check: Self::check_char(line2, 43, "composite check digit", false)?,
        };

        let composite_field = format!("{}{}{}", &line2[0..10], &line2[13..20], &line2[21..43]);
        let checks = CheckDigitReport {
            document_number_check_valid: Self::verify(&line2[0..9], check_digits.document_number_check),
            birth_date_check_valid: Self::verify(&birth_date, check_digits.birth_date_check),
            expiry_date_check_valid: Self::verify(&expiry_date, check_digits.expiry_date_check),
            personal_number_check_valid: Self::verify(&line2[28..42], check_digits.personal_number_check),
            composite_check_valid: Self::verify(&composite_field, check_digits.composite_check),
        };
        let checksum_valid = checks.all_valid();
        if !checksum_valid {
            log::warn!("MRZ check digits failed: {:?}", checks.failed_checks());
        }

        let (surname, given_names) = Self::split_name(&line1[5..44]);
        let personal_number = Self::strip_filler(&line2[28..42]);

        Ok(ParsedMrzFields {
            document_type: Self::strip_filler(&line1[0..2]),
            issuing_country: Self::strip_filler(&line1[2..5]),
            surname,
            given_names,
            document_number: Self::strip_filler(&line2[0..9]),
            nationality: Self::strip_filler(&line2[10..13]),
            birth_date,
            sex: line2[20..21].to_string(),
            expiry_date,
            personal_number: if personal_number.is_empty() {
                None
            } else {
                Some(personal_number)
            },
            check_digits,
            checks,
            checksum_valid,
        })
    }

    /// Surname and given names are separated by the first `<<`; single `<`
    /// inside either part is a space.
    fn split_name(field: &str) -> (String, String) {
        let (surname, given) = match field.find("<<") {
            Some(idx) => (&field[..idx], &field[idx + 2..]),
            None => (field, ""),
        };
        (Self::name_part(surname), Self::name_part(given))
    }

    fn name_part(part: &str) -> String {
        part.split('<')
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn strip_filler(field: &str) -> String {
        field.trim_matches('<').to_string()
    }

    fn check_line_length(name: &str, line: &str) -> Result<(), PassportError> {
        let length = line.chars().count();
        if length != TD3_LINE_LENGTH {
            return Err(PassportError::MrzParsingError(format!(
                "{} must be {} characters, got {}",
                name, TD3_LINE_LENGTH, length
            )));
        }
        Ok(())
    }

    fn digits(line: &str, range: std::ops::Range<usize>, name: &str) -> Result<String, PassportError> {
        let value = &line[range.clone()];
        if !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(PassportError::MrzParsingError(format!(
                "{} '{}' at line 2 positions {}-{} is not numeric",
                name, value, range.start, range.end - 1
            )));
        }
        Ok(value.to_string())
    }

    fn check_char(line: &str, pos: usize, name: &str, filler_allowed: bool) -> Result<char, PassportError> {
        let c = line[pos..pos + 1].chars().next().unwrap_or(' ');
        if c.is_ascii_digit() || (filler_allowed && c == '<') {
            Ok(c)
        } else {
            Err(PassportError::MrzParsingError(format!(
                "{} '{}' at line 2 position {} is not a digit",
                name, c, pos
            )))
        }
    }
}
