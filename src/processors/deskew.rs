//! Skew estimation and rotation correction.
//!
//! The dominant text-block rotation is estimated from the minimum-area
//! bounding rectangle of all foreground (non-zero) pixel coordinates,
//! computed with rotating calipers over the convex hull. Corrections below
//! half a degree are skipped: rotation resampling introduces interpolation
//! artifacts that cost more accuracy than a negligible skew does.

use image::{DynamicImage, GrayImage, RgbImage};

/// Corrections below this magnitude (degrees) are treated as already level.
const MIN_CORRECTION_DEGREES: f32 = 0.5;

/// Bicubic interpolation coefficient (matches the common -0.75 convention).
const CUBIC_A: f32 = -0.75;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f32,
    y: f32,
}

/// Corrects the dominant rotation of a document image.
///
/// Returns the input unchanged when it contains no foreground pixels or
/// when the estimated correction is below 0.5 degrees. Otherwise rotates
/// about the image center with bicubic interpolation and edge replication,
/// preserving the original dimensions. Multi-channel images are estimated
/// on their luminance and rotated channel-wise.
pub fn deskew(image: &DynamicImage) -> DynamicImage {
    let gray = match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => other.to_luma8(),
    };

    let Some(angle) = estimate_skew_angle(&gray) else {
        return image.clone();
    };
    if angle.abs() < MIN_CORRECTION_DEGREES {
        return image.clone();
    }

    tracing::debug!(angle, "deskew: rotating to correct skew");
    match image {
        DynamicImage::ImageLuma8(gray) => {
            DynamicImage::ImageLuma8(rotate_gray_about_center(gray, angle))
        }
        DynamicImage::ImageRgb8(rgb) => {
            DynamicImage::ImageRgb8(rotate_rgb_about_center(rgb, angle))
        }
        other => DynamicImage::ImageRgb8(rotate_rgb_about_center(&other.to_rgb8(), angle)),
    }
}

/// Estimates the correction angle in degrees, or `None` when the image has
/// no foreground pixels.
///
/// The raw minimum-area-rectangle angle is folded into [-90, 0) and then
/// normalized: below -45 the correction is -(90 + raw), otherwise -raw.
fn estimate_skew_angle(gray: &GrayImage) -> Option<f32> {
    let mut points = Vec::new();
    for (x, y, pixel) in gray.enumerate_pixels() {
        if pixel.0[0] > 0 {
            points.push(Point {
                x: x as f32,
                y: y as f32,
            });
        }
    }
    if points.is_empty() {
        return None;
    }

    let raw = min_area_rect_angle(&points);
    let corrected = if raw < -45.0 { -(90.0 + raw) } else { -raw };
    Some(corrected)
}

/// Returns the minimum-area bounding rectangle's angle, folded into [-90, 0).
fn min_area_rect_angle(points: &[Point]) -> f32 {
    let hull = convex_hull(points);
    if hull.len() < 3 {
        return -90.0;
    }

    let mut min_area = f32::MAX;
    let mut best_angle = 0.0f32;

    let n = hull.len();
    for i in 0..n {
        let j = (i + 1) % n;
        let edge_x = hull[j].x - hull[i].x;
        let edge_y = hull[j].y - hull[i].y;
        let edge_length = (edge_x * edge_x + edge_y * edge_y).sqrt();
        if edge_length < f32::EPSILON {
            continue;
        }

        let nx = edge_x / edge_length;
        let ny = edge_y / edge_length;
        // Perpendicular direction.
        let px = -ny;
        let py = nx;

        let mut min_n = f32::MAX;
        let mut max_n = f32::MIN;
        let mut min_p = f32::MAX;
        let mut max_p = f32::MIN;
        for point in &hull {
            let rel_x = point.x - hull[i].x;
            let rel_y = point.y - hull[i].y;
            let proj_n = nx * rel_x + ny * rel_y;
            let proj_p = px * rel_x + py * rel_y;
            min_n = min_n.min(proj_n);
            max_n = max_n.max(proj_n);
            min_p = min_p.min(proj_p);
            max_p = max_p.max(proj_p);
        }

        let area = (max_n - min_n) * (max_p - min_p);
        if area < min_area {
            min_area = area;
            best_angle = ny.atan2(nx).to_degrees();
        }
    }

    fold_into_negative_quadrant(best_angle)
}

/// Folds an arbitrary edge angle into [-90, 0). The rectangle's two edge
/// directions are 90 degrees apart, so the fold makes the edge choice
/// irrelevant.
fn fold_into_negative_quadrant(angle: f32) -> f32 {
    let mut folded = angle;
    while folded >= 0.0 {
        folded -= 90.0;
    }
    while folded < -90.0 {
        folded += 90.0;
    }
    folded
}

/// Computes the convex hull with the monotone chain algorithm.
fn convex_hull(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    sorted.dedup();

    let cross = |o: &Point, a: &Point, b: &Point| -> f32 {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut lower: Vec<Point> = Vec::new();
    for p in &sorted {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0
        {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Point> = Vec::new();
    for p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0
        {
            upper.pop();
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Rotates a single-channel image about its center, bicubic with edge
/// replication, preserving dimensions. Positive angles rotate
/// counterclockwise in standard orientation.
fn rotate_gray_about_center(src: &GrayImage, angle_degrees: f32) -> GrayImage {
    let (width, height) = src.dimensions();
    let mapping = InverseRotation::about_center(width, height, angle_degrees);

    GrayImage::from_fn(width, height, |x, y| {
        let (sx, sy) = mapping.source_of(x, y);
        let value = sample_bicubic(sx, sy, width, height, |px, py| {
            src.get_pixel(px, py).0[0] as f32
        });
        image::Luma([value])
    })
}

/// Rotates an RGB image about its center, bicubic with edge replication.
fn rotate_rgb_about_center(src: &RgbImage, angle_degrees: f32) -> RgbImage {
    let (width, height) = src.dimensions();
    let mapping = InverseRotation::about_center(width, height, angle_degrees);

    RgbImage::from_fn(width, height, |x, y| {
        let (sx, sy) = mapping.source_of(x, y);
        let mut channels = [0u8; 3];
        for (c, value) in channels.iter_mut().enumerate() {
            *value = sample_bicubic(sx, sy, width, height, |px, py| {
                src.get_pixel(px, py).0[c] as f32
            });
        }
        image::Rgb(channels)
    })
}

/// Inverse mapping from destination to source coordinates for a rotation
/// about the image center.
struct InverseRotation {
    cos: f32,
    sin: f32,
    cx: f32,
    cy: f32,
}

impl InverseRotation {
    fn about_center(width: u32, height: u32, angle_degrees: f32) -> Self {
        let radians = angle_degrees.to_radians();
        Self {
            cos: radians.cos(),
            sin: radians.sin(),
            cx: (width / 2) as f32,
            cy: (height / 2) as f32,
        }
    }

    fn source_of(&self, x: u32, y: u32) -> (f32, f32) {
        let dx = x as f32 - self.cx;
        let dy = y as f32 - self.cy;
        (
            self.cos * dx + self.sin * dy + self.cx,
            -self.sin * dx + self.cos * dy + self.cy,
        )
    }
}

/// Samples at a fractional source position with a 4x4 bicubic kernel,
/// replicating edge pixels for out-of-frame taps.
fn sample_bicubic(
    sx: f32,
    sy: f32,
    width: u32,
    height: u32,
    fetch: impl Fn(u32, u32) -> f32,
) -> u8 {
    let x0 = sx.floor();
    let y0 = sy.floor();
    let fx = sx - x0;
    let fy = sy - y0;

    let mut accum = 0.0f32;
    for j in -1i32..=2 {
        let wy = cubic_weight(j as f32 - fy);
        if wy == 0.0 {
            continue;
        }
        let py = clamp_coord(y0 as i64 + j as i64, height);
        for i in -1i32..=2 {
            let wx = cubic_weight(i as f32 - fx);
            if wx == 0.0 {
                continue;
            }
            let px = clamp_coord(x0 as i64 + i as i64, width);
            accum += wx * wy * fetch(px, py);
        }
    }
    accum.round().clamp(0.0, 255.0) as u8
}

fn cubic_weight(t: f32) -> f32 {
    let t = t.abs();
    if t <= 1.0 {
        (CUBIC_A + 2.0) * t * t * t - (CUBIC_A + 3.0) * t * t + 1.0
    } else if t < 2.0 {
        CUBIC_A * t * t * t - 5.0 * CUBIC_A * t * t + 8.0 * CUBIC_A * t - 4.0 * CUBIC_A
    } else {
        0.0
    }
}

fn clamp_coord(value: i64, upper: u32) -> u32 {
    value.clamp(0, upper as i64 - 1) as u32
}
