// src/feature_extraction.rs - Image-level scalp descriptors

use image::{GrayImage, RgbImage};
use imageproc::edges::canny;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use imageproc::region_labelling::Connectivity;
use serde::{Deserialize, Serialize};

use crate::circles::{detect_circles, HoughParams};
use crate::image_utils::{
    channel_mean, count_nonzero, in_range, mask_from_fn, mask_or, mask_percentage, mean_std,
    percentile, reflect_101, laplacian, to_grayscale, to_hsv, HsvImage,
};
use crate::morphology::{close, open, StructuringElement};
use crate::regions::count_components;

/// Side of the box used to measure local edge density
const DENSITY_WINDOW: u32 = 50;

/// Everything downstream decides from. Built once per image and never
/// modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub brightness: f64,
    pub saturation: f64,
    pub value: f64,
    pub contrast: f64,
    pub sharpness: f64,
    pub texture_quality: f64,
    pub hair_density: f64,
    pub redness_level: f64,
    pub dandruff_level: f64,
    pub oiliness: f64,
    pub color_uniformity: f64,
    pub healthy_color_ratio: f64,
    pub inflammation_level: f64,
    pub bald_spots_count: u32,
    pub bald_spots_size: f64,
    pub yellow_patches: f64,
    pub red_patches: f64,
    pub circular_pattern: u32,
    pub scalp_scales: f64,
    pub folliculitis_points: u32,
    pub hairline_recession: f64,
}

/// Rounded subset of the features reported alongside an analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDetails {
    pub brightness: f64,
    pub saturation: f64,
    pub contrast: f64,
    pub sharpness: f64,
    pub texture_quality: f64,
    pub hair_density: f64,
    pub redness_level: f64,
    pub dandruff_level: f64,
    pub inflammation_level: f64,
    pub bald_spots_detected: u32,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl FeatureSet {
    pub fn details(&self) -> AnalysisDetails {
        AnalysisDetails {
            brightness: round2(self.brightness),
            saturation: round2(self.saturation),
            contrast: round2(self.contrast),
            sharpness: round2(self.sharpness),
            texture_quality: round2(self.texture_quality),
            hair_density: round2(self.hair_density),
            redness_level: round2(self.redness_level),
            dandruff_level: round2(self.dandruff_level),
            inflammation_level: round2(self.inflammation_level),
            bald_spots_detected: self.bald_spots_count,
        }
    }
}

/// Measure every feature of an RGB image. Never fails; an image without
/// pixels yields all zeros.
pub fn extract_features(image: &RgbImage) -> FeatureSet {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return FeatureSet::default();
    }

    let gray = to_grayscale(image);
    let hsv = to_hsv(image);
    let lap = laplacian(&gray);
    let edges = canny(&gray, 50.0, 150.0);

    let (brightness, contrast) = mean_std(gray.pixels().map(|p| p[0] as f64));
    let saturation = channel_mean(&hsv, 1);
    let value = channel_mean(&hsv, 2);
    let sharpness = {
        let (_, std) = mean_std(lap.iter().copied());
        std * std
    };

    let hair_density = mask_percentage(&edges);
    let redness_level = calculate_redness(&hsv);
    let (bald_spots_count, bald_spots_size) = detect_bald_spots(&edges);

    let features = FeatureSet {
        brightness,
        saturation,
        value,
        contrast,
        sharpness,
        texture_quality: calculate_texture_score(&gray),
        hair_density,
        redness_level,
        dandruff_level: detect_dandruff(&gray, &hsv),
        oiliness: (value / 255.0 * 0.6 + saturation / 255.0 * 0.4) * 100.0,
        color_uniformity: calculate_color_uniformity(image),
        healthy_color_ratio: mask_percentage(&in_range(&hsv, [0, 20, 70], [25, 170, 255])),
        inflammation_level: redness_level * 0.7 + (value / 255.0 * 30.0) * 0.3,
        bald_spots_count,
        bald_spots_size,
        yellow_patches: mask_percentage(&in_range(&hsv, [20, 50, 100], [35, 255, 255])),
        red_patches: detect_red_patches(&hsv),
        circular_pattern: detect_circles(&gray, &HoughParams::default()).len() as u32,
        scalp_scales: detect_scalp_scales(&gray, &lap),
        folliculitis_points: detect_folliculitis(&hsv),
        hairline_recession: detect_hairline_recession(&edges),
    };

    log::debug!(
        "Features: brightness {:.1}, redness {:.2}, density {:.2}, oiliness {:.1}",
        features.brightness,
        features.redness_level,
        features.hair_density,
        features.oiliness
    );

    features
}

/// Mean Sobel magnitude, halved and capped at 100
fn calculate_texture_score(gray: &GrayImage) -> f64 {
    let gx = horizontal_sobel(gray);
    let gy = vertical_sobel(gray);
    let (mean, _) = mean_std(gx.pixels().zip(gy.pixels()).map(|(a, b)| {
        let (dx, dy) = (a[0] as f64, b[0] as f64);
        (dx * dx + dy * dy).sqrt()
    }));
    (mean / 2.0).min(100.0)
}

/// Both red hue bands with S, V >= `floor`
pub(crate) fn red_band_mask(hsv: &HsvImage, floor: u8) -> GrayImage {
    mask_or(
        &in_range(hsv, [0, floor, floor], [10, 255, 255]),
        &in_range(hsv, [160, floor, floor], [180, 255, 255]),
    )
}

/// Percentage of pixels in the red hue bands
fn calculate_redness(hsv: &HsvImage) -> f64 {
    mask_percentage(&red_band_mask(hsv, 50))
}

/// Bright, nearly colourless pixels
fn detect_dandruff(gray: &GrayImage, hsv: &HsvImage) -> f64 {
    let (width, height) = gray.dimensions();
    let mask = mask_from_fn(width, height, |x, y| {
        gray.get_pixel(x, y)[0] > 200 && hsv.get_pixel(x, y)[1] < 30
    });
    mask_percentage(&mask)
}

/// 100 minus half the mean per-channel standard deviation, floored at 0
fn calculate_color_uniformity(image: &RgbImage) -> f64 {
    let spread: f64 = (0..3)
        .map(|c| mean_std(image.pixels().map(|p| p[c] as f64)).1)
        .sum();
    (100.0 - spread / 3.0 / 2.0).max(0.0)
}

/// Box mean of the edge map over a 50x50 window, mirrored at the borders.
/// Uses a summed-area table over the padded map.
fn edge_density_field(edges: &GrayImage) -> Vec<f64> {
    let (width, height) = edges.dimensions();
    let before = (DENSITY_WINDOW / 2) as i64;
    let after = DENSITY_WINDOW as i64 - before - 1;
    let padded_w = (width as i64 + before + after) as usize;
    let padded_h = (height as i64 + before + after) as usize;

    // sat[(y + 1) * (padded_w + 1) + (x + 1)] = sum of padded[0..=y][0..=x]
    let stride = padded_w + 1;
    let mut sat = vec![0.0f64; stride * (padded_h + 1)];
    for py in 0..padded_h {
        let sy = reflect_101(py as i64 - before, height);
        let mut row_sum = 0.0;
        for px in 0..padded_w {
            let sx = reflect_101(px as i64 - before, width);
            row_sum += edges.get_pixel(sx, sy)[0] as f64;
            sat[(py + 1) * stride + px + 1] = sat[py * stride + px + 1] + row_sum;
        }
    }

    let window = DENSITY_WINDOW as usize;
    let area = (window * window) as f64;
    let mut density = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let (x0, y0, x1, y1) = (x, y, x + window, y + window);
            let sum = sat[y1 * stride + x1] - sat[y0 * stride + x1] - sat[y1 * stride + x0]
                + sat[y0 * stride + x0];
            density.push(sum / area);
        }
    }
    density
}

/// Regions whose local edge density is below the 20th percentile
fn detect_bald_spots(edges: &GrayImage) -> (u32, f64) {
    let (width, height) = edges.dimensions();
    let density = edge_density_field(edges);
    let threshold = percentile(&density, 20.0);

    let mask = mask_from_fn(width, height, |x, y| {
        density[(y * width + x) as usize] < threshold
    });

    let spots = count_components(&mask, Connectivity::Four);
    (spots, mask_percentage(&mask))
}

/// Saturated red (S, V >= 80) after closing with a 15x15 box
fn detect_red_patches(hsv: &HsvImage) -> f64 {
    let closed = close(&red_band_mask(hsv, 80), &StructuringElement::rect(15, 15));
    mask_percentage(&closed)
}

/// Bright pixels with a strong Laplacian response
fn detect_scalp_scales(gray: &GrayImage, lap: &[f64]) -> f64 {
    let (width, height) = gray.dimensions();
    let mask = mask_from_fn(width, height, |x, y| {
        gray.get_pixel(x, y)[0] > 180 && lap[(y * width + x) as usize].abs() > 30.0
    });
    mask_percentage(&mask)
}

/// Small saturated red points that survive a 3x3 opening
fn detect_folliculitis(hsv: &HsvImage) -> u32 {
    let red = in_range(hsv, [0, 100, 100], [10, 255, 255]);
    let points = open(&red, &StructuringElement::rect(3, 3));
    count_components(&points, Connectivity::Four)
}

/// Twice the amount by which the top third has fewer edges than the whole
fn detect_hairline_recession(edges: &GrayImage) -> f64 {
    let (width, height) = edges.dimensions();
    let top_rows = height / 3;
    if top_rows == 0 {
        return 0.0;
    }

    let top_edges = (0..top_rows)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .filter(|&(x, y)| edges.get_pixel(x, y)[0] > 0)
        .count();
    let top_density = top_edges as f64 / (top_rows * width) as f64 * 100.0;
    let overall_density = count_nonzero(edges) as f64 / (width * height) as f64 * 100.0;

    ((overall_density - top_density) * 2.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use image::{Luma, Rgb};

    fn paint_block(image: &mut RgbImage, x0: u32, y0: u32, size: u32, color: [u8; 3]) {
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                image.put_pixel(x, y, Rgb(color));
            }
        }
    }

    #[test]
    fn uniform_gray_has_no_structure() {
        let image = RgbImage::from_pixel(120, 120, Rgb([128, 128, 128]));
        let f = extract_features(&image);

        assert_approx_eq!(f.brightness, 128.0);
        assert_approx_eq!(f.contrast, 0.0);
        assert_approx_eq!(f.sharpness, 0.0);
        assert_approx_eq!(f.texture_quality, 0.0);
        assert_approx_eq!(f.hair_density, 0.0);
        assert_approx_eq!(f.redness_level, 0.0);
        assert_approx_eq!(f.color_uniformity, 100.0);
        assert_eq!(f.bald_spots_count, 0);
        assert_eq!(f.circular_pattern, 0);
        assert_eq!(f.folliculitis_points, 0);
        assert_approx_eq!(f.hairline_recession, 0.0);
    }

    #[test]
    fn oiliness_blends_value_and_saturation() {
        let image = RgbImage::from_pixel(40, 40, Rgb([255, 220, 60]));
        let f = extract_features(&image);
        let expected = (f.value / 255.0 * 0.6 + f.saturation / 255.0 * 0.4) * 100.0;
        assert_approx_eq!(f.oiliness, expected);
        assert!(f.oiliness > 65.0);
        assert_approx_eq!(f.yellow_patches, 100.0);
    }

    #[test]
    fn red_block_sets_red_features() {
        let mut image = RgbImage::from_pixel(100, 100, Rgb([128, 128, 128]));
        paint_block(&mut image, 30, 30, 40, [255, 43, 0]);
        let f = extract_features(&image);

        assert_approx_eq!(f.redness_level, 16.0);
        assert!(f.red_patches >= 16.0);
        assert!(f.inflammation_level > f.redness_level * 0.7);
        // One solid block survives the opening as a single point cluster
        assert_eq!(f.folliculitis_points, 1);
    }

    #[test]
    fn bright_flakes_raise_dandruff() {
        let mut image = RgbImage::from_pixel(50, 50, Rgb([90, 70, 60]));
        paint_block(&mut image, 0, 0, 10, [240, 240, 240]);
        let f = extract_features(&image);
        assert_approx_eq!(f.dandruff_level, 4.0);
    }

    #[test]
    fn edge_density_of_full_edges_is_full_scale() {
        let edges = GrayImage::from_pixel(8, 8, Luma([255]));
        let density = edge_density_field(&edges);
        assert_eq!(density.len(), 64);
        assert!(density.iter().all(|&d| (d - 255.0).abs() < 1e-9));
    }

    #[test]
    fn hairline_recession_when_top_is_bare() {
        // Edges only in the lower two thirds
        let edges = mask_from_fn(30, 30, |x, y| y >= 10 && x % 2 == 0);
        let overall = count_nonzero(&edges) as f64 / 900.0 * 100.0;
        assert_approx_eq!(detect_hairline_recession(&edges), overall * 2.0);
    }

    #[test]
    fn empty_image_yields_defaults() {
        let image = RgbImage::new(0, 0);
        assert_eq!(extract_features(&image), FeatureSet::default());
    }

    #[test]
    fn details_round_to_two_decimals() {
        let f = FeatureSet { brightness: 12.3456, bald_spots_count: 2, ..FeatureSet::default() };
        let d = f.details();
        assert_approx_eq!(d.brightness, 12.35);
        assert_eq!(d.bald_spots_detected, 2);
    }
}
