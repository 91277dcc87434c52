// src/circles.rs - Gradient Hough transform for roughly circular outlines

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// A detected circle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: (u32, u32),
    pub radius: u32,
    pub votes: u32,
}

/// Parameters of the gradient Hough transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughParams {
    pub blur_sigma: f32,
    /// Upper Canny threshold; the lower one is half of it
    pub canny_high: f32,
    pub accumulator_threshold: u32,
    pub min_distance: f64,
    pub min_radius: u32,
    pub max_radius: u32,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            blur_sigma: 2.0,
            canny_high: 50.0,
            accumulator_threshold: 30,
            min_distance: 50.0,
            min_radius: 20,
            max_radius: 100,
        }
    }
}

/// Find circles in a grayscale image.
///
/// Every edge pixel votes for centres along its gradient direction, both
/// ways, for each radius in range. Local accumulator maxima above the
/// threshold become candidates, strongest first; a candidate closer than
/// `min_distance` to an accepted circle is dropped, and the radius is the
/// distance at which most edge pixels sit around the centre.
pub fn detect_circles(gray: &GrayImage, params: &HoughParams) -> Vec<Circle> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 || params.max_radius < params.min_radius {
        return Vec::new();
    }

    let blurred = gaussian_blur_f32(gray, params.blur_sigma);
    let edges = canny(&blurred, params.canny_high / 2.0, params.canny_high);
    let gx = horizontal_sobel(&blurred);
    let gy = vertical_sobel(&blurred);

    let edge_points: Vec<(u32, u32)> = edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] > 0)
        .map(|(x, y, _)| (x, y))
        .collect();

    // Vote
    let mut accumulator = vec![0u32; (width * height) as usize];
    for &(x, y) in &edge_points {
        let dx = gx.get_pixel(x, y)[0] as f64;
        let dy = gy.get_pixel(x, y)[0] as f64;
        let magnitude = (dx * dx + dy * dy).sqrt();
        if magnitude == 0.0 {
            continue;
        }
        let (ux, uy) = (dx / magnitude, dy / magnitude);

        for sign in [1.0, -1.0] {
            for r in params.min_radius..=params.max_radius {
                let cx = (x as f64 + sign * r as f64 * ux).round();
                let cy = (y as f64 + sign * r as f64 * uy).round();
                if cx < 0.0 || cy < 0.0 || cx >= width as f64 || cy >= height as f64 {
                    break;
                }
                accumulator[(cy as u32 * width + cx as u32) as usize] += 1;
            }
        }
    }

    // Candidate centres: local maxima above threshold
    let at = |x: u32, y: u32| accumulator[(y * width + x) as usize];
    let mut candidates = Vec::new();
    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            let votes = at(x, y);
            if votes > params.accumulator_threshold
                && votes > at(x - 1, y)
                && votes >= at(x + 1, y)
                && votes > at(x, y - 1)
                && votes >= at(x, y + 1)
            {
                candidates.push((x, y, votes));
            }
        }
    }
    candidates.sort_by(|a, b| b.2.cmp(&a.2).then((a.1, a.0).cmp(&(b.1, b.0))));

    let mut circles: Vec<Circle> = Vec::new();
    for (x, y, votes) in candidates {
        let too_close = circles.iter().any(|c| {
            let ddx = c.center.0 as f64 - x as f64;
            let ddy = c.center.1 as f64 - y as f64;
            (ddx * ddx + ddy * ddy).sqrt() < params.min_distance
        });
        if too_close {
            continue;
        }

        if let Some(radius) = best_radius((x, y), &edge_points, params) {
            circles.push(Circle { center: (x, y), radius, votes });
        }
    }

    log::debug!("Hough: {} edge pixels, {} circles", edge_points.len(), circles.len());
    circles
}

/// Radius with the most edge pixels at that distance from `center`, if that
/// support reaches the accumulator threshold
fn best_radius(center: (u32, u32), edge_points: &[(u32, u32)], params: &HoughParams) -> Option<u32> {
    let bins = (params.max_radius - params.min_radius + 1) as usize;
    let mut support = vec![0u32; bins];

    let reach = params.max_radius as i64;
    for &(x, y) in edge_points {
        let dx = x as i64 - center.0 as i64;
        let dy = y as i64 - center.1 as i64;
        if dx.abs() > reach || dy.abs() > reach {
            continue;
        }
        let distance = ((dx * dx + dy * dy) as f64).sqrt().round() as u32;
        if distance >= params.min_radius && distance <= params.max_radius {
            support[(distance - params.min_radius) as usize] += 1;
        }
    }

    let (index, &count) = support
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))?;

    (count >= params.accumulator_threshold).then_some(params.min_radius + index as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_filled_circle_mut;

    #[test]
    fn flat_image_has_no_circles() {
        let gray = GrayImage::from_pixel(200, 200, Luma([128]));
        assert!(detect_circles(&gray, &HoughParams::default()).is_empty());
    }

    #[test]
    fn finds_a_dark_disc() {
        let mut gray = GrayImage::from_pixel(200, 200, Luma([200]));
        draw_filled_circle_mut(&mut gray, (100, 100), 40, Luma([30]));

        let circles = detect_circles(&gray, &HoughParams::default());

        assert!(!circles.is_empty());
        let c = circles[0];
        assert!((c.center.0 as i32 - 100).abs() <= 3);
        assert!((c.center.1 as i32 - 100).abs() <= 3);
        assert!((c.radius as i32 - 40).abs() <= 4);
    }

    #[test]
    fn inverted_radius_range_is_empty() {
        let gray = GrayImage::from_pixel(50, 50, Luma([0]));
        let params = HoughParams { min_radius: 30, max_radius: 10, ..HoughParams::default() };
        assert!(detect_circles(&gray, &params).is_empty());
    }
}
