pub mod image;
pub mod normalizer;
pub mod ocr;
pub mod orientation;
pub mod region;

pub use self::image::ImageProcessor;
pub use normalizer::{NormalizedMrz, TextNormalizer};
#[cfg(feature = "tesseract")]
pub use ocr::TesseractEngine;
pub use ocr::{mean_confidence, OcrEngine, ScriptedOcrEngine, MRZ_ALPHABET};
pub use orientation::{LocatedMrz, Orientation, OrientationSearcher};
pub use region::RegionLocator;
