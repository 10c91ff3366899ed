//! The OCR engines and their shared contract.
//!
//! Three interchangeable engines implement [`OcrEngine`]: the classical
//! [`TesseractEngine`], the word-level neural [`EasyOcrEngine`] and the
//! line-level neural [`PaddleOcrEngine`]. Callers pick one by
//! [`EngineKind`] through [`create_engine`] and only ever talk to the
//! trait.
//!
//! # Example
//!
//! ```rust,no_run
//! use arfr_ocr::prelude::*;
//!
//! # fn main() -> Result<(), OCRError> {
//! let engine = create_engine(EngineKind::Tesseract, &OcrConfig::default())?;
//! let image = load_image("page.png")?;
//! let text = engine.extract_text(&image, Language::French, true)?;
//! # Ok(())
//! # }
//! ```

mod easyocr;
mod language;
mod paddleocr;
mod tesseract;

pub use easyocr::EasyOcrEngine;
pub use language::Language;
pub use paddleocr::PaddleOcrEngine;
pub use tesseract::TesseractEngine;

use crate::core::{OCRError, OcrConfig};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// The uniform extraction contract every engine satisfies.
///
/// Implementations are interchangeable behind `Box<dyn OcrEngine>`;
/// extras (confidence-aware extraction, capability queries) stay on the
/// concrete classical engine.
pub trait OcrEngine: Send + Sync {
    /// The engine's symbolic name, as accepted by [`EngineKind`].
    fn name(&self) -> &'static str;

    /// Extracts text from an image.
    ///
    /// Returns a trimmed string; an empty string means no text was
    /// detected and is a valid result, never an error.
    ///
    /// # Arguments
    ///
    /// * `image` - The page image, RGB or single-channel.
    /// * `language` - Which language packs/models to apply.
    /// * `preprocess` - Whether to run the preprocessing pipeline first
    ///   (the neural engines normalize internally and ignore this).
    fn extract_text(
        &self,
        image: &DynamicImage,
        language: Language,
        preprocess: bool,
    ) -> Result<String, OCRError>;
}

/// Symbolic engine names, the factory's selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// The classical engine backed by a system Tesseract installation.
    Tesseract,
    /// The word-level neural engine.
    EasyOcr,
    /// The line-level neural engine.
    PaddleOcr,
}

impl FromStr for EngineKind {
    type Err = OCRError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tesseract" => Ok(EngineKind::Tesseract),
            "easyocr" => Ok(EngineKind::EasyOcr),
            "paddleocr" => Ok(EngineKind::PaddleOcr),
            other => Err(OCRError::config(format!(
                "unknown engine '{other}'. Use 'tesseract', 'easyocr', or 'paddleocr'"
            ))),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Tesseract => write!(f, "tesseract"),
            EngineKind::EasyOcr => write!(f, "easyocr"),
            EngineKind::PaddleOcr => write!(f, "paddleocr"),
        }
    }
}

/// Builds the engine named by `kind`.
///
/// The classical and word-level engines construct lazily and cannot fail
/// here; the line-level engine loads its models eagerly and surfaces
/// [`OCRError::EngineInit`] when neither the accelerated nor the CPU
/// configuration comes up.
pub fn create_engine(kind: EngineKind, config: &OcrConfig) -> Result<Box<dyn OcrEngine>, OCRError> {
    info!(engine = %kind, "creating engine");
    match kind {
        EngineKind::Tesseract => Ok(Box::new(TesseractEngine::new(config))),
        EngineKind::EasyOcr => Ok(Box::new(EasyOcrEngine::new(config))),
        EngineKind::PaddleOcr => Ok(Box::new(PaddleOcrEngine::new(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_kind_parses_known_names() {
        assert_eq!("tesseract".parse::<EngineKind>().unwrap(), EngineKind::Tesseract);
        assert_eq!("EasyOCR".parse::<EngineKind>().unwrap(), EngineKind::EasyOcr);
        assert_eq!(" paddleocr ".parse::<EngineKind>().unwrap(), EngineKind::PaddleOcr);
    }

    #[test]
    fn unknown_engine_name_is_a_config_error() {
        let err = "kraken".parse::<EngineKind>().unwrap_err();
        assert!(matches!(err, OCRError::ConfigError { .. }));
        assert!(err.to_string().contains("kraken"));
    }

    #[test]
    fn factory_builds_the_lazy_engines() {
        let config = OcrConfig::default();
        let engine = create_engine(EngineKind::Tesseract, &config).unwrap();
        assert_eq!(engine.name(), "tesseract");
        let engine = create_engine(EngineKind::EasyOcr, &config).unwrap();
        assert_eq!(engine.name(), "easyocr");
    }
}
