//! Image preprocessing transforms for OCR.
//!
//! Each transform is a pure function from image to image; nothing here
//! touches external state or mutates its input. The pipeline in
//! [`pipeline`] applies the transforms in a fixed order, each one
//! independently toggleable.
//!
//! # Modules
//!
//! * `pipeline` - The toggleable preprocessing pipeline
//! * `clahe` - Contrast-limited adaptive histogram equalization
//! * `deskew` - Skew estimation and rotation correction
//! * `threshold` - Gaussian-weighted adaptive binarization

mod clahe;
mod deskew;
mod pipeline;
mod threshold;

pub use clahe::clahe;
pub use deskew::deskew;
pub use pipeline::{PreprocessConfig, preprocess_image};
pub use threshold::adaptive_threshold_gaussian;
