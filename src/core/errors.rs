//! Error types for the OCR pipeline.
//!
//! This module defines the error taxonomy used across the crate: caller
//! errors (invalid language, preprocessing precondition violations),
//! backend initialization failures (model loading, downloads, engine
//! construction) and backend runtime failures (extraction itself threw).
//! Runtime failures always retain the original backend message as
//! diagnostic context; nothing is retried or swallowed here.

use std::path::PathBuf;
use thiserror::Error;

/// The preprocessing stages that carry a single-channel precondition.
///
/// Only these two stages can fail; the remaining stages (grayscale,
/// denoise, deskew) accept any supported input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessStage {
    /// CLAHE contrast enhancement.
    Enhance,
    /// Adaptive binarization.
    Binarize,
}

impl std::fmt::Display for PreprocessStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessStage::Enhance => write!(f, "contrast enhancement"),
            PreprocessStage::Binarize => write!(f, "binarization"),
        }
    }
}

/// Enum representing the errors that can occur in the OCR pipeline.
///
/// Variants group into the taxonomy the engines rely on:
/// caller errors ([`OCRError::InvalidLanguage`], [`OCRError::Preprocess`]),
/// initialization failures ([`OCRError::ModelLoad`], [`OCRError::ModelFetch`],
/// [`OCRError::EngineInit`]) and wrapped backend runtime failures
/// ([`OCRError::EngineRuntime`]).
#[derive(Error, Debug)]
pub enum OCRError {
    /// The caller supplied a language value outside {Arabic, French, Both}.
    #[error("unsupported language: {value}. Use 'Arabic', 'French', or 'Both'")]
    InvalidLanguage {
        /// The rejected value.
        value: String,
    },

    /// A preprocessing stage received input violating its precondition.
    #[error("{stage} failed: {message}")]
    Preprocess {
        /// The stage that rejected its input.
        stage: PreprocessStage,
        /// Description of the violated precondition.
        message: String,
    },

    /// Error occurred while loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// A model or dictionary file could not be loaded.
    #[error("model load '{path}': {context}")]
    ModelLoad {
        /// Path to the model artifact.
        path: PathBuf,
        /// Additional context about the failure.
        context: String,
        /// The underlying error, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A model artifact could not be fetched from its remote source.
    #[error("model fetch '{url}': {context}")]
    ModelFetch {
        /// The remote location.
        url: String,
        /// Additional context about the failure.
        context: String,
        /// The underlying error, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Engine construction failed and no fallback configuration succeeded.
    #[error("failed to initialize {engine} engine: {message}")]
    EngineInit {
        /// The engine that failed to come up.
        engine: &'static str,
        /// Description of the failure, including any fallback attempted.
        message: String,
        /// The underlying error, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Extraction failed inside a backend at runtime.
    #[error("{engine} failed: {context}")]
    EngineRuntime {
        /// The engine the failure surfaced from.
        engine: &'static str,
        /// The original backend message, preserved for diagnostics.
        context: String,
        /// The underlying error, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl OCRError {
    /// Creates an invalid-language error for a value outside the
    /// recognized set.
    pub fn invalid_language(value: impl Into<String>) -> Self {
        Self::InvalidLanguage {
            value: value.into(),
        }
    }

    /// Creates a preprocessing precondition error.
    pub fn precondition(stage: PreprocessStage, message: impl Into<String>) -> Self {
        Self::Preprocess {
            stage,
            message: message.into(),
        }
    }

    /// Creates a model load error with optional source and context.
    pub fn model_load(
        path: impl Into<PathBuf>,
        context: impl Into<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        Self::ModelLoad {
            path: path.into(),
            context: context.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Creates a model fetch error preserving the remote location.
    pub fn model_fetch(
        url: impl Into<String>,
        context: impl Into<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        Self::ModelFetch {
            url: url.into(),
            context: context.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Creates an engine initialization error.
    pub fn engine_init(
        engine: &'static str,
        message: impl Into<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        Self::EngineInit {
            engine,
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Wraps a backend runtime failure, preserving the original message.
    pub fn engine_runtime(
        engine: &'static str,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::EngineRuntime {
            engine,
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wraps a backend runtime failure described only by a message.
    pub fn engine_runtime_msg(engine: &'static str, context: impl Into<String>) -> Self {
        Self::EngineRuntime {
            engine,
            context: context.into(),
            source: None,
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_language_message_names_the_recognized_set() {
        let err = OCRError::invalid_language("Spanish");
        let msg = err.to_string();
        assert!(msg.contains("Spanish"));
        assert!(msg.contains("Arabic"));
        assert!(msg.contains("French"));
        assert!(msg.contains("Both"));
    }

    #[test]
    fn engine_runtime_preserves_backend_message() {
        let backend = std::io::Error::other("tesseract binary not found");
        let err = OCRError::engine_runtime("tesseract", "text extraction failed", backend);
        assert!(err.to_string().contains("tesseract failed"));
        let source = std::error::Error::source(&err).expect("source retained");
        assert!(source.to_string().contains("binary not found"));
    }

    #[test]
    fn precondition_reports_stage() {
        let err = OCRError::precondition(
            PreprocessStage::Binarize,
            "expected single-channel input, got 3 channels",
        );
        assert!(err.to_string().starts_with("binarization failed"));

        let err = OCRError::precondition(PreprocessStage::Enhance, "expected single-channel input");
        assert!(err.to_string().starts_with("contrast enhancement failed"));
    }
}
