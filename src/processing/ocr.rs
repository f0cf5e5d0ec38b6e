#[cfg(feature = "tesseract")]
use std::sync::Mutex;

use crate::models::{MrzBitmap, OcrLine};
use crate::utils::PassportError;

/// Characters that may appear in an MRZ.
pub const MRZ_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789<";

/// Text recognizer for the cropped MRZ.
///
/// Implementations are expensive to build (model load) and meant to be
/// created once per process and shared; `recognize` must be safe to call
/// from several threads. An `Err` means the engine itself failed, not
/// that the bitmap was unreadable: no text is `Ok(vec![])`.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, bitmap: &MrzBitmap) -> Result<Vec<OcrLine>, PassportError>;
}

/// Returns the same lines for every bitmap. Used by the text-only CLI
/// mode, the demo and tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOcrEngine {
    lines: Vec<OcrLine>,
}

impl ScriptedOcrEngine {
    pub fn new(lines: Vec<OcrLine>) -> Self {
        ScriptedOcrEngine { lines }
    }

    pub fn from_text<S: AsRef<str>>(lines: &[S]) -> Self {
        ScriptedOcrEngine::new(lines.iter().map(|l| OcrLine::new(l.as_ref(), 1.0)).collect())
    }
}

impl OcrEngine for ScriptedOcrEngine {
    fn recognize(&self, _bitmap: &MrzBitmap) -> Result<Vec<OcrLine>, PassportError> {
        Ok(self.lines.clone())
    }
}

/// Mean confidence over all lines, `None` when there are none.
pub fn mean_confidence(lines: &[OcrLine]) -> Option<f32> {
    if lines.is_empty() {
        return None;
    }
    Some(lines.iter().map(|l| l.confidence).sum::<f32>() / lines.len() as f32)
}

/// Tesseract-backed engine. One handle is initialised up front and reused;
/// calls are serialized through a mutex.
#[cfg(feature = "tesseract")]
pub struct TesseractEngine {
    language: String,
    handle: Mutex<Option<tesseract::Tesseract>>,
}

#[cfg(feature = "tesseract")]
impl TesseractEngine {
    pub fn new(language: &str) -> Result<Self, PassportError> {
        let handle = Self::init(language)?;
        log::info!("Tesseract initialised with language '{}'", language);
        Ok(TesseractEngine {
            language: language.to_string(),
            handle: Mutex::new(Some(handle)),
        })
    }

    fn init(language: &str) -> Result<tesseract::Tesseract, PassportError> {
        tesseract::Tesseract::new(None, Some(language))
            .map_err(|e| PassportError::OcrError(format!("Tesseract init error: {}", e)))?
            .set_variable("tessedit_char_whitelist", MRZ_ALPHABET)
            .map_err(|e| PassportError::OcrError(format!("Tesseract set variable error: {}", e)))
    }
}

#[cfg(feature = "tesseract")]
impl OcrEngine for TesseractEngine {
    fn recognize(&self, bitmap: &MrzBitmap) -> Result<Vec<OcrLine>, PassportError> {
        let mut guard = self
            .handle
            .lock()
            .map_err(|_| PassportError::OcrError("Tesseract handle poisoned".to_string()))?;

        // The builder API consumes the handle; a failed call leaves `None`
        // and the next call re-initialises.
        let tess = match guard.take() {
            Some(tess) => tess,
            None => Self::init(&self.language)?,
        };

        let width = bitmap.width() as i32;
        let height = bitmap.height() as i32;
        let mut tess = tess
            .set_frame(bitmap.image.as_raw(), width, height, 1, width)
            .map_err(|e| PassportError::OcrError(format!("Tesseract set image error: {}", e)))?
            .recognize()
            .map_err(|e| PassportError::OcrError(format!("Tesseract recognize error: {}", e)))?;

        let text = tess
            .get_text()
            .map_err(|e| PassportError::OcrError(format!("Tesseract error: {}", e)))?;
        let confidence = tess.mean_text_conf().clamp(0, 100) as f32 / 100.0;
        *guard = Some(tess);

        log::debug!("MRZ OCR result:\n{}", text);
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| OcrLine::new(line, confidence))
            .collect())
    }
}
