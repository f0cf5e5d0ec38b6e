// MRZ verification CLI

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use mrz_verify::{
    models::OcrLine,
    processing::{OcrEngine, ScriptedOcrEngine},
    ClaimedIdentity, PassportError, PassportValidator, Verdict, VerifierConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "mrz-verify",
    version,
    about = "Locate, read and verify the machine readable zone of a passport"
)]
struct Cli {
    /// JSON configuration file; defaults are used for missing keys
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reference date for the expiry check (YYYY-MM-DD), defaults to today
    #[arg(long, global = true)]
    today: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify a document photo (needs the `tesseract` feature)
    Image {
        path: PathBuf,
        #[command(flatten)]
        claimed: ClaimArgs,
    },
    /// Verify MRZ text that was already recognized, one argument per line
    Text {
        #[arg(required = true)]
        lines: Vec<String>,
        #[command(flatten)]
        claimed: ClaimArgs,
    },
}

#[derive(Args, Debug, Default)]
struct ClaimArgs {
    #[arg(long)]
    document_number: Option<String>,
    #[arg(long)]
    surname: Option<String>,
    #[arg(long)]
    given_names: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    birth_date: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    expiry_date: Option<String>,
    #[arg(long)]
    nationality: Option<String>,
    #[arg(long)]
    issuing_country: Option<String>,
}

impl ClaimArgs {
    fn into_claimed(self) -> Option<ClaimedIdentity> {
        let claimed = ClaimedIdentity {
            document_number: self.document_number,
            surname: self.surname,
            given_names: self.given_names,
            date_of_birth: self.birth_date,
            expiry_date: self.expiry_date,
            nationality: self.nationality,
            issuing_country: self.issuing_country,
        };
        if claimed.is_empty() {
            None
        } else {
            Some(claimed)
        }
    }
}

#[cfg(feature = "tesseract")]
fn ocr_engine() -> Result<Arc<dyn OcrEngine>, PassportError> {
    Ok(Arc::new(mrz_verify::processing::TesseractEngine::new("eng")?))
}

#[cfg(not(feature = "tesseract"))]
fn ocr_engine() -> Result<Arc<dyn OcrEngine>, PassportError> {
    Err(PassportError::OcrError(
        "built without the `tesseract` feature; use the `text` subcommand".to_string(),
    ))
}

fn print_report(verdict: &Verdict) {
    println!("\n===============================================");
    println!("        MRZ VERIFICATION REPORT");
    println!("===============================================\n");

    if let Some(fields) = &verdict.parsed_fields {
        println!("DOCUMENT:");
        println!("  Document Type: {}", fields.document_type);
        println!("  Issuing Country: {}", fields.issuing_country);
        println!("  Document Number: {}", fields.document_number);
        println!("  Name: {} {}", fields.given_names, fields.surname);
        println!("  Nationality: {}", fields.nationality);
        println!("  Date of Birth: {}", fields.birth_date);
        println!("  Sex: {}", fields.sex);
        println!("  Date of Expiry: {}", fields.expiry_date);
        println!("  Personal Number: {:?}", fields.personal_number);
        println!(
            "  Check Digits: {}",
            if fields.checksum_valid { "PASSED" } else { "FAILED" }
        );
    }

    if let Some(comparison) = &verdict.comparison {
        println!(
            "\nCLAIMED IDENTITY: {} matched, {} mismatched",
            comparison.match_count, comparison.mismatch_count
        );
        for warning in &comparison.warnings {
            println!("  ! {}", warning);
        }
    }

    if !verdict.details.is_empty() {
        println!("\nDETAILS:");
        for detail in &verdict.details {
            println!("  - {}", detail);
        }
    }

    println!(
        "\nResult: {}{}",
        if verdict.valid { "VALID" } else { "INVALID" },
        verdict
            .error
            .as_ref()
            .map(|e| format!(" ({})", e))
            .unwrap_or_default()
    );
}

fn run(cli: Cli) -> Result<Verdict, PassportError> {
    let config = match &cli.config {
        Some(path) => VerifierConfig::from_json_file(path)?,
        None => VerifierConfig::default(),
    };
    let today = match &cli.today {
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| PassportError::InvalidDate(value.clone()))?,
        None => Local::now().naive_local().date(),
    };

    match cli.command {
        Command::Image { path, claimed } => {
            let validator = PassportValidator::new(ocr_engine()?, config)?;
            let gray = image::open(&path)
                .map_err(|e| PassportError::ImageProcessingError(format!("{}: {}", path.display(), e)))?
                .to_luma8();
            log::info!("Loaded {} ({}x{})", path.display(), gray.width(), gray.height());
            validator.verify_at(&gray, claimed.into_claimed().as_ref(), today)
        }
        Command::Text { lines, claimed } => {
            let validator = PassportValidator::new(Arc::new(ScriptedOcrEngine::default()), config)?;
            let lines: Vec<OcrLine> = lines.iter().map(|l| OcrLine::new(l.as_str(), 1.0)).collect();
            Ok(validator.verify_text(&lines, claimed.into_claimed().as_ref(), today))
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(verdict) => {
            print_report(&verdict);
            match serde_json::to_string_pretty(&verdict) {
                Ok(json) => println!("\n{}", json),
                Err(err) => eprintln!("Error serializing verdict: {}", err),
            }
            if !verdict.valid {
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("Error verifying document: {}", err);
            std::process::exit(2);
        }
    }
}
