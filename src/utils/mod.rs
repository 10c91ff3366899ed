//! Small shared utilities.

mod image;

pub use image::load_image;
