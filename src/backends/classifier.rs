//! 0/180 degree crop orientation classification.
//!
//! Line-level reading stacks run each crop through a small two-class
//! network before recognition; crops classified as upside down with high
//! confidence are rotated 180 degrees so the recognizer sees upright
//! text.

use crate::backends::session::build_session;
use crate::core::{OCRError, OrtSessionConfig, ResolvedAcceleration};
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use std::sync::Mutex;

const INPUT_HEIGHT: u32 = 48;
const INPUT_WIDTH: u32 = 192;
/// Minimum probability of the 180-degree class before a crop is flipped.
/// Below it the crop is left alone; a wrong flip is worse than none.
const FLIP_THRESHOLD: f32 = 0.9;

pub(crate) struct OrientationClassifier {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OrientationClassifier {
    pub(crate) fn load(
        path: &Path,
        acceleration: ResolvedAcceleration,
        config: Option<&OrtSessionConfig>,
    ) -> Result<Self, OCRError> {
        let session = build_session(path, acceleration, config)?;
        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| OCRError::model_load(path, "orientation model has no inputs", None::<std::io::Error>))?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| OCRError::model_load(path, "orientation model has no outputs", None::<std::io::Error>))?;
        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }

    /// Returns true when the crop is confidently upside down.
    pub(crate) fn is_upside_down(&self, crop: &RgbImage) -> Result<bool, OCRError> {
        if crop.width() == 0 || crop.height() == 0 {
            return Ok(false);
        }
        let tensor = prepare_input(crop);

        let mut session = self
            .session
            .lock()
            .map_err(|_| ort::Error::new("orientation session lock poisoned"))?;
        let inputs =
            ort::inputs![self.input_name.as_str() => TensorRef::from_array_view(tensor.view())?];
        let outputs = session.run(inputs)?;
        let (shape, data) = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;

        let classes = shape.last().copied().unwrap_or(0).max(0) as usize;
        if classes < 2 || data.len() < classes {
            return Err(OCRError::engine_runtime_msg(
                "classifier",
                format!("unexpected orientation output shape {shape:?}"),
            ));
        }
        // Class 0 is upright, class 1 is rotated 180 degrees.
        Ok(data[1] >= FLIP_THRESHOLD)
    }
}

fn prepare_input(crop: &RgbImage) -> Array4<f32> {
    let ratio = crop.width() as f32 / crop.height() as f32;
    let target_w = ((INPUT_HEIGHT as f32 * ratio).ceil() as u32).clamp(1, INPUT_WIDTH);
    let resized = image::imageops::resize(crop, target_w, INPUT_HEIGHT, FilterType::Triangle);

    let mut tensor = Array4::zeros((1, 3, INPUT_HEIGHT as usize, INPUT_WIDTH as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel.0[c] as f32 / 127.5 - 1.0;
        }
    }
    tensor
}
