//! The ONNX text-reading stack shared by the neural engines.
//!
//! A reading stack composes a text detector, an optional crop orientation
//! classifier and a text recognizer into one [`OnnxTextReader`]. The
//! engines differ only in which model artifacts they load and in how they
//! assemble the returned detections into a final string.
//!
//! # Modules
//!
//! * `fetch` - Cached download of model artifacts
//! * `session` - ONNX Runtime session construction
//! * `detector` - DB-style text detection
//! * `classifier` - 0/180 degree crop orientation classification
//! * `recognizer` - CRNN recognition with greedy CTC decoding
//! * `reader` - The composed detect-(orient)-recognize stack

mod classifier;
mod detector;
mod fetch;
mod reader;
mod recognizer;
mod session;

pub use fetch::ModelSource;
pub use reader::{OnnxTextReader, ReaderSpec, TextDetection};
