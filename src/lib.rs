//! # arfr-ocr
//!
//! A Rust library that extracts text from scanned documents and images
//! containing mixed Arabic and French content.
//!
//! Input images travel through a configurable preprocessing pipeline before
//! being handed to one of several interchangeable OCR engines. Three engines
//! are provided behind a single trait: a classical Tesseract engine and two
//! neural ONNX-based engines (word-level detection and line-level detection
//! with orientation classification).
//!
//! ## Components
//!
//! - **Preprocessing**: grayscale, median denoising, CLAHE contrast
//!   enhancement, deskew, adaptive binarization
//! - **Engines**: Tesseract, word-level neural reader, line-level neural reader
//! - **Selection**: engines are instantiated by symbolic name and used
//!   through the [`engines::OcrEngine`] trait
//!
//! ## Modules
//!
//! * [`core`] - Error handling and runtime configuration
//! * [`processors`] - Image preprocessing transforms
//! * [`backends`] - ONNX text-reading stack shared by the neural engines
//! * [`engines`] - OCR engine adapters and the engine factory
//! * [`utils`] - Image loading helpers
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use arfr_ocr::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OcrConfig::default();
//! let engine = create_engine(EngineKind::Tesseract, &config)?;
//!
//! let image = load_image(std::path::Path::new("invoice.png"))?;
//! let text = engine.extract_text(&image, Language::Both, true)?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Standalone preprocessing
//!
//! ```rust,no_run
//! use arfr_ocr::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let image = load_image(std::path::Path::new("scan.png"))?;
//! let cleaned = preprocess_image(&image, PreprocessConfig::default())?;
//! cleaned.save("cleaned.png")?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod core;
pub mod engines;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// Bring the essentials into scope with a single use statement:
///
/// ```rust
/// use arfr_ocr::prelude::*;
/// ```
///
/// Included items focus on the most common tasks:
/// - Engine selection (`EngineKind`, `create_engine`, `OcrEngine`)
/// - Language selection (`Language`)
/// - Preprocessing (`preprocess_image`, `PreprocessConfig`)
/// - Essential error and config types (`OCRError`, `OcrConfig`)
/// - Basic image loading (`load_image`)
///
/// For advanced customization (reader specs, session configuration),
/// import directly from the respective modules (e.g., `arfr_ocr::backends`,
/// `arfr_ocr::core::config`).
pub mod prelude {
    pub use crate::core::{AccelerationPolicy, OCRError, OcrConfig};
    pub use crate::engines::{
        EasyOcrEngine, EngineKind, Language, OcrEngine, PaddleOcrEngine, TesseractEngine,
        create_engine,
    };
    pub use crate::processors::{PreprocessConfig, preprocess_image};
    pub use crate::utils::load_image;
}
