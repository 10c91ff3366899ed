//! Gaussian-weighted adaptive binarization.
//!
//! The threshold varies per pixel: a pixel stays foreground (255) when it
//! exceeds the Gaussian-weighted mean of its neighborhood minus a constant
//! offset. Local thresholding keeps character strokes separable under
//! uneven scan illumination where a single global threshold fails.

use image::{GrayImage, Luma};

/// Binarizes a single-channel image with a Gaussian-weighted local mean.
///
/// # Arguments
///
/// * `src` - The single-channel input image.
/// * `block_size` - Side length of the square neighborhood, in pixels
///   (made odd by rounding up when an even value is passed).
/// * `offset` - Constant subtracted from the local mean before comparing.
///
/// # Returns
///
/// A two-level image: 255 where `pixel > local_mean - offset`, 0 elsewhere.
pub fn adaptive_threshold_gaussian(src: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    let (width, height) = src.dimensions();
    if width == 0 || height == 0 {
        return src.clone();
    }

    let block_size = if block_size % 2 == 0 {
        block_size + 1
    } else {
        block_size
    }
    .max(3);

    let kernel = gaussian_kernel(block_size as usize);
    let means = separable_blur(src, &kernel);

    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let mean = means[(y * width + x) as usize];
            let value = src.get_pixel(x, y).0[0] as f32;
            let level = if value > mean - offset { 255 } else { 0 };
            out.put_pixel(x, y, Luma([level]));
        }
    }
    out
}

/// Builds a normalized 1D Gaussian kernel with the sigma convention used
/// for unspecified sigmas: 0.3 * ((n - 1) * 0.5 - 1) + 0.8.
fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size as f32 - 1.0) / 2.0;
    let denom = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-d * d / denom).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for weight in &mut kernel {
        *weight /= sum;
    }
    kernel
}

/// Separable Gaussian blur with edge replication, accumulated in f32 to
/// avoid intermediate rounding.
fn separable_blur(src: &GrayImage, kernel: &[f32]) -> Vec<f32> {
    let (width, height) = src.dimensions();
    let radius = (kernel.len() / 2) as i64;

    // Horizontal pass.
    let mut horizontal = vec![0.0f32; (width * height) as usize];
    for y in 0..height {
        for x in 0..width {
            let mut accum = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x as i64 + k as i64 - radius).clamp(0, width as i64 - 1) as u32;
                accum += weight * src.get_pixel(sx, y).0[0] as f32;
            }
            horizontal[(y * width + x) as usize] = accum;
        }
    }

    // Vertical pass.
    let mut blurred = vec![0.0f32; (width * height) as usize];
    for y in 0..height {
        for x in 0..width {
            let mut accum = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y as i64 + k as i64 - radius).clamp(0, height as i64 - 1) as u32;
                accum += weight * horizontal[(sy * width + x) as usize];
            }
            blurred[(y * width + x) as usize] = accum;
        }
    }
    blurred
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_two_level() {
        let src = GrayImage::from_fn(40, 40, |x, y| Luma([((x * 5 + y * 11) % 256) as u8]));
        let out = adaptive_threshold_gaussian(&src, 11, 2.0);
        assert_eq!(out.dimensions(), (40, 40));
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn bright_spot_on_dark_background_survives() {
        let mut src = GrayImage::from_pixel(31, 31, Luma([20]));
        src.put_pixel(15, 15, Luma([240]));
        let out = adaptive_threshold_gaussian(&src, 11, 2.0);
        assert_eq!(out.get_pixel(15, 15).0[0], 255);
    }

    #[test]
    fn dark_stroke_on_bright_background_goes_black() {
        let mut src = GrayImage::from_pixel(31, 31, Luma([230]));
        for y in 5..26 {
            src.put_pixel(15, y, Luma([10]));
        }
        let out = adaptive_threshold_gaussian(&src, 11, 2.0);
        assert_eq!(out.get_pixel(15, 15).0[0], 0);
        assert_eq!(out.get_pixel(3, 3).0[0], 255);
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(11);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..5 {
            assert!((kernel[i] - kernel[10 - i]).abs() < 1e-6);
        }
        assert!(kernel[5] > kernel[4]);
    }
}
