//! CRNN-style text recognition with greedy CTC decoding.
//!
//! Crops are scaled to a fixed input height, padded on the right up to
//! the model's maximum width, and decoded greedily: at each timestep the
//! most probable class wins, repeats collapse, and the blank class (index
//! 0) separates them.

use crate::backends::session::build_session;
use crate::core::{OCRError, OrtSessionConfig, ResolvedAcceleration};
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// Fixed input height of the recognition model.
const INPUT_HEIGHT: u32 = 48;
/// Maximum input width; wider crops are scaled down to fit.
const INPUT_MAX_WIDTH: u32 = 320;

/// The recognition component: one session plus the character set its
/// output classes index into.
pub(crate) struct TextRecognizer {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    charset: Vec<String>,
}

impl TextRecognizer {
    /// Loads the recognition model and its dictionary.
    ///
    /// The dictionary file holds one character per line; class 0 is the
    /// CTC blank and the final class is the space character, matching the
    /// training convention of the shipped checkpoints.
    pub(crate) fn load(
        model: &Path,
        dictionary: &Path,
        acceleration: ResolvedAcceleration,
        config: Option<&OrtSessionConfig>,
    ) -> Result<Self, OCRError> {
        let raw = fs::read_to_string(dictionary).map_err(|e| {
            OCRError::model_load(dictionary, "failed to read recognition dictionary", Some(e))
        })?;
        let charset = charset_from_dictionary(&raw);
        if charset.len() <= 2 {
            return Err(OCRError::model_load(
                dictionary,
                "recognition dictionary is empty",
                None::<std::io::Error>,
            ));
        }

        let session = build_session(model, acceleration, config)?;
        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| OCRError::model_load(model, "recognition model has no inputs", None::<std::io::Error>))?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| OCRError::model_load(model, "recognition model has no outputs", None::<std::io::Error>))?;
        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            charset,
        })
    }

    /// Recognizes the text in one crop, returning the decoded string and
    /// the mean per-character probability (0.0 for an empty decode).
    pub(crate) fn recognize(&self, crop: &RgbImage) -> Result<(String, f32), OCRError> {
        if crop.width() == 0 || crop.height() == 0 {
            return Ok((String::new(), 0.0));
        }
        let tensor = prepare_input(crop);

        let mut session = self
            .session
            .lock()
            .map_err(|_| ort::Error::new("recognition session lock poisoned"))?;
        let inputs =
            ort::inputs![self.input_name.as_str() => TensorRef::from_array_view(tensor.view())?];
        let outputs = session.run(inputs)?;
        let (shape, data) = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        let [1, steps, classes] = dims.as_slice() else {
            return Err(OCRError::engine_runtime_msg(
                "recognizer",
                format!("unexpected recognition output shape {dims:?}"),
            ));
        };
        Ok(ctc_greedy_decode(data, *steps, *classes, &self.charset))
    }
}

/// Scales a crop to the fixed input height preserving aspect ratio and
/// right-pads it to the maximum width, normalized to `[-1, 1]` NCHW.
fn prepare_input(crop: &RgbImage) -> Array4<f32> {
    let ratio = crop.width() as f32 / crop.height() as f32;
    let target_w = ((INPUT_HEIGHT as f32 * ratio).ceil() as u32)
        .clamp(1, INPUT_MAX_WIDTH);
    let resized = image::imageops::resize(crop, target_w, INPUT_HEIGHT, FilterType::Triangle);

    let mut tensor = Array4::zeros((
        1,
        3,
        INPUT_HEIGHT as usize,
        INPUT_MAX_WIDTH as usize,
    ));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel.0[c] as f32 / 127.5 - 1.0;
        }
    }
    tensor
}

/// Builds the class table from a dictionary file: blank, then one entry
/// per line, then space.
pub(crate) fn charset_from_dictionary(raw: &str) -> Vec<String> {
    let mut charset = Vec::with_capacity(raw.lines().count() + 2);
    charset.push(String::new()); // class 0 is the CTC blank
    for line in raw.lines() {
        let entry = line.trim_end_matches(['\r', '\n']);
        if !entry.is_empty() {
            charset.push(entry.to_string());
        }
    }
    charset.push(" ".to_string());
    charset
}

/// Greedy CTC decode over a `[steps, classes]` probability matrix laid
/// out row-major in `data`.
///
/// Collapses repeated classes and drops blanks; the confidence is the
/// mean probability of the emitted characters, 0.0 when nothing is
/// emitted.
pub(crate) fn ctc_greedy_decode(
    data: &[f32],
    steps: usize,
    classes: usize,
    charset: &[String],
) -> (String, f32) {
    let mut text = String::new();
    let mut probabilities = Vec::new();
    let mut previous = 0usize;

    for t in 0..steps {
        let row = &data[t * classes..(t + 1) * classes];
        let (best, &probability) = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or((0, &0.0));

        if best != 0 && best != previous {
            if let Some(symbol) = charset.get(best) {
                text.push_str(symbol);
                probabilities.push(probability);
            }
        }
        previous = best;
    }

    let confidence = if probabilities.is_empty() {
        0.0
    } else {
        probabilities.iter().sum::<f32>() / probabilities.len() as f32
    };
    (text, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charset() -> Vec<String> {
        charset_from_dictionary("a\nb\nc")
    }

    fn one_hot(steps: &[usize], classes: usize, p: f32) -> Vec<f32> {
        let mut data = vec![(1.0 - p) / (classes as f32 - 1.0); steps.len() * classes];
        for (t, &k) in steps.iter().enumerate() {
            data[t * classes + k] = p;
        }
        data
    }

    #[test]
    fn charset_has_blank_first_and_space_last() {
        let charset = charset();
        assert_eq!(charset[0], "");
        assert_eq!(charset[1], "a");
        assert_eq!(charset.last().unwrap(), " ");
    }

    #[test]
    fn repeats_collapse_and_blanks_separate() {
        // a a <blank> a b -> "aab"
        let charset = charset();
        let data = one_hot(&[1, 1, 0, 1, 2], 5, 0.9);
        let (text, confidence) = ctc_greedy_decode(&data, 5, 5, &charset);
        assert_eq!(text, "aab");
        assert!((confidence - 0.9).abs() < 1e-5);
    }

    #[test]
    fn all_blank_decodes_to_empty_with_zero_confidence() {
        let charset = charset();
        let data = one_hot(&[0, 0, 0], 5, 0.99);
        let (text, confidence) = ctc_greedy_decode(&data, 3, 5, &charset);
        assert!(text.is_empty());
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn trailing_space_class_is_decodable() {
        let charset = charset();
        let space = charset.len() - 1;
        let data = one_hot(&[1, space, 2], 5, 0.8);
        let (text, _) = ctc_greedy_decode(&data, 3, 5, &charset);
        assert_eq!(text, "a b");
    }

    #[test]
    fn confidence_is_the_mean_over_emitted_characters() {
        let charset = charset();
        let classes = 5;
        let mut data = one_hot(&[1, 2], classes, 0.6);
        data[0 * classes + 1] = 0.8; // first char at 0.8, second at 0.6
        let (text, confidence) = ctc_greedy_decode(&data, 2, classes, &charset);
        assert_eq!(text, "ab");
        assert!((confidence - 0.7).abs() < 1e-5);
    }
}
