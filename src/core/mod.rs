//! Core error handling and runtime configuration.
//!
//! This module defines the error taxonomy shared by the preprocessing
//! pipeline and the OCR engines, together with the configuration types that
//! callers pass into engine construction.

pub mod config;
pub mod errors;

pub use config::{
    AccelerationPolicy, OcrConfig, OrtGraphOptimizationLevel, OrtSessionConfig,
    ResolvedAcceleration,
};
pub use errors::{OCRError, PreprocessStage};

/// Result type alias used throughout the crate.
pub type OcrResult<T> = Result<T, OCRError>;
