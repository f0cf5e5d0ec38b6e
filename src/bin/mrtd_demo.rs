use std::sync::Arc;

use chrono::NaiveDate;
use mrz_verify::models::{ClaimedIdentity, OcrLine};
use mrz_verify::processing::ScriptedOcrEngine;
use mrz_verify::utils::PassportError;
use mrz_verify::PassportValidator;

// ICAO sample, second line OCR'd with dashes for some fillers
const SAMPLE_LINES: [&str; 2] = [
    "P<USASMITH<<JOHN<<<<<<<<<<<<<<<<<<<<<<<<<<<<",
    "L898902C36USA6908061F9406236<<<--<<<<<-<<<06",
];

fn main() -> Result<(), PassportError> {
    env_logger::init();

    println!("MRZ Verification Demo");
    println!("---------------------");

    let validator = PassportValidator::with_defaults(Arc::new(ScriptedOcrEngine::from_text(&SAMPLE_LINES)));
    let lines: Vec<OcrLine> = SAMPLE_LINES.iter().map(|l| OcrLine::new(*l, 0.87)).collect();

    let claimed = ClaimedIdentity {
        document_number: Some("L898902C9".to_string()),
        surname: Some("Smith".to_string()),
        given_names: Some("John".to_string()),
        date_of_birth: Some("2069-08-06".to_string()),
        nationality: Some("USA".to_string()),
        ..Default::default()
    };

    let today = NaiveDate::from_ymd_opt(2026, 1, 1)
        .ok_or_else(|| PassportError::InvalidDate("2026-01-01".to_string()))?;
    println!("Verifying recognized MRZ text as of {}...", today);
    let verdict = validator.verify_text(&lines, Some(&claimed), today);

    println!("\nVERIFICATION RESULT:");
    println!("  Document is {}", if verdict.valid { "VALID" } else { "INVALID" });
    if let Some(fields) = &verdict.parsed_fields {
        println!("  Holder: {} {}", fields.given_names, fields.surname);
        println!("  Document number: {}", fields.document_number);
    }
    if let Some(expiry) = &verdict.expiry {
        println!("  Expires: {}", expiry.expiry_date_formatted);
    }

    println!("\nDETAILS:");
    for detail in &verdict.details {
        println!("  - {}", detail);
    }

    if let Some(comparison) = &verdict.comparison {
        for warning in &comparison.warnings {
            println!("  ! {}", warning);
        }
    }

    Ok(())
}
