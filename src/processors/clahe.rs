//! Contrast-limited adaptive histogram equalization (CLAHE).
//!
//! Normalizes contrast under uneven lighting by equalizing the histogram of
//! each tile of the image separately, clipping each tile histogram at a
//! limit to avoid over-amplifying noise in low-contrast tiles, and blending
//! the per-tile lookup tables bilinearly so tile seams stay invisible.

use image::{GrayImage, Luma};

const HIST_BINS: usize = 256;

/// Applies CLAHE to a single-channel image.
///
/// The image is divided into `tiles_x` by `tiles_y` tiles (edge tiles may
/// be smaller when the dimensions do not divide evenly). `clip_limit`
/// bounds the per-bin histogram count at `clip_limit * tile_area / 256`;
/// the clipped excess is redistributed uniformly across all bins before
/// the equalization lookup table is built.
///
/// # Arguments
///
/// * `src` - The single-channel input image.
/// * `tiles_x` - Number of tile columns (at least 1).
/// * `tiles_y` - Number of tile rows (at least 1).
/// * `clip_limit` - Contrast limiting factor relative to a uniform histogram.
///
/// # Returns
///
/// A new image with the same dimensions as the input.
pub fn clahe(src: &GrayImage, tiles_x: u32, tiles_y: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = src.dimensions();
    if width == 0 || height == 0 {
        return src.clone();
    }

    let tiles_x = tiles_x.max(1).min(width) as usize;
    let tiles_y = tiles_y.max(1).min(height) as usize;
    let tile_w = width.div_ceil(tiles_x as u32) as usize;
    let tile_h = height.div_ceil(tiles_y as u32) as usize;

    // One equalization LUT per tile.
    let mut luts = vec![[0u8; HIST_BINS]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = ((tx + 1) * tile_w).min(width as usize);
            let y1 = ((ty + 1) * tile_h).min(height as usize);

            let mut hist = [0u32; HIST_BINS];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[src.get_pixel(x as u32, y as u32).0[0] as usize] += 1;
                }
            }
            let area = ((x1 - x0) * (y1 - y0)) as u32;
            clip_histogram(&mut hist, clip_limit, area);

            let lut = &mut luts[ty * tiles_x + tx];
            let scale = (HIST_BINS as f32 - 1.0) / area as f32;
            let mut cumulative = 0u32;
            for (bin, count) in hist.iter().enumerate() {
                cumulative += count;
                lut[bin] = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    // Blend the four surrounding tile LUTs bilinearly, anchored at tile
    // centers and clamped at the image border.
    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let ty0 = fy.floor().max(0.0) as usize;
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let wy = (fy - fy.floor()).clamp(0.0, 1.0);
        let wy = if fy < 0.0 { 0.0 } else { wy };

        for x in 0..width {
            let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
            let tx0 = fx.floor().max(0.0) as usize;
            let tx1 = (tx0 + 1).min(tiles_x - 1);
            let wx = (fx - fx.floor()).clamp(0.0, 1.0);
            let wx = if fx < 0.0 { 0.0 } else { wx };

            let v = src.get_pixel(x, y).0[0] as usize;
            let tl = luts[ty0 * tiles_x + tx0][v] as f32;
            let tr = luts[ty0 * tiles_x + tx1][v] as f32;
            let bl = luts[ty1 * tiles_x + tx0][v] as f32;
            let br = luts[ty1 * tiles_x + tx1][v] as f32;

            let top = tl + (tr - tl) * wx;
            let bottom = bl + (br - bl) * wx;
            let blended = top + (bottom - top) * wy;
            out.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
        }
    }

    out
}

/// Clips a tile histogram at `clip_limit * area / bins` and redistributes
/// the excess uniformly.
fn clip_histogram(hist: &mut [u32; HIST_BINS], clip_limit: f32, area: u32) {
    let limit = ((clip_limit * area as f32 / HIST_BINS as f32) as u32).max(1);

    let mut excess = 0u32;
    for count in hist.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }

    let bonus = excess / HIST_BINS as u32;
    let mut remainder = (excess % HIST_BINS as u32) as usize;
    for count in hist.iter_mut() {
        *count += bonus;
        if remainder > 0 {
            *count += 1;
            remainder -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_dimensions() {
        let src = GrayImage::from_fn(70, 53, |x, y| Luma([((x + y) % 256) as u8]));
        let out = clahe(&src, 8, 8, 2.0);
        assert_eq!(out.dimensions(), (70, 53));
    }

    #[test]
    fn flat_image_stays_flat() {
        let src = GrayImage::from_pixel(64, 64, Luma([90]));
        let out = clahe(&src, 8, 8, 2.0);
        let first = out.get_pixel(0, 0).0[0];
        assert!(out.pixels().all(|p| p.0[0] == first));
    }

    #[test]
    fn stretches_low_contrast_bimodal_image() {
        // Checkerboard of two close gray levels; a generous clip limit
        // leaves room for the equalization to widen the value range.
        let src = GrayImage::from_fn(256, 256, |x, y| {
            Luma([if (x + y) % 2 == 0 { 100 } else { 150 }])
        });
        let out = clahe(&src, 8, 8, 40.0);
        let min = out.pixels().map(|p| p.0[0]).min().unwrap();
        let max = out.pixels().map(|p| p.0[0]).max().unwrap();
        assert!(max - min > 50, "range {} not widened", max - min);
    }

    #[test]
    fn tight_clip_limit_keeps_range_close_to_identity() {
        let src = GrayImage::from_fn(256, 256, |x, y| {
            Luma([if (x + y) % 2 == 0 { 100 } else { 150 }])
        });
        let out = clahe(&src, 8, 8, 2.0);
        let min = out.pixels().map(|p| p.0[0]).min().unwrap();
        let max = out.pixels().map(|p| p.0[0]).max().unwrap();
        // Heavy clipping redistributes almost everything; the mapping stays
        // near identity and must not collapse the range.
        assert!(max > min);
    }
}
