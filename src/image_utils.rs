// src/image_utils.rs - Colour spaces, masks and small numeric helpers

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use palette::{FromColor, Lab, Srgb};

/// Mask value for a set pixel
pub const MASK_ON: u8 = 255;

/// Three 8-bit planes holding H (0..=180), S and V (0..=255), OpenCV scale
pub type HsvImage = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// Three 8-bit planes holding L (0..=255), a and b (offset by 128), OpenCV scale
pub type LabImage = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// Resize an image to the specified dimensions
pub fn resize_image(image: &RgbImage, dimensions: [u32; 2]) -> RgbImage {
    let (width, height) = (dimensions[0], dimensions[1]);
    image::imageops::resize(
        image,
        width,
        height,
        image::imageops::FilterType::Triangle,
    )
}

/// Luma with ITU-R 601 weights
#[inline]
pub fn luma(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64).round() as u8
}

pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| Luma([luma(image.get_pixel(x, y))]))
}

/// Convert one RGB triple to 8-bit HSV with hue halved into 0..=180
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (r as f64, g as f64, b as f64);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [(h / 2.0).round() as u8, s.round() as u8, max as u8]
}

pub fn to_hsv(image: &RgbImage) -> HsvImage {
    let (width, height) = image.dimensions();
    HsvImage::from_fn(width, height, |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        Rgb(rgb_to_hsv(r, g, b))
    })
}

/// Convert one RGB triple to 8-bit LAB (D65)
pub fn rgb_to_lab(r: u8, g: u8, b: u8) -> [u8; 3] {
    let srgb = Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let lab: Lab = Lab::from_color(srgb);

    [
        (lab.l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8,
        (lab.a + 128.0).round().clamp(0.0, 255.0) as u8,
        (lab.b + 128.0).round().clamp(0.0, 255.0) as u8,
    ]
}

pub fn to_lab(image: &RgbImage) -> LabImage {
    let (width, height) = image.dimensions();
    LabImage::from_fn(width, height, |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        Rgb(rgb_to_lab(r, g, b))
    })
}

/// Inclusive per-channel range test over an HSV image, like `cv::inRange`
pub fn in_range(hsv: &HsvImage, lower: [u8; 3], upper: [u8; 3]) -> GrayImage {
    let (width, height) = hsv.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let p = hsv.get_pixel(x, y).0;
        let inside = (0..3).all(|c| p[c] >= lower[c] && p[c] <= upper[c]);
        Luma([if inside { MASK_ON } else { 0 }])
    })
}

/// Build a mask from a per-pixel predicate
pub fn mask_from_fn<F>(width: u32, height: u32, mut predicate: F) -> GrayImage
where
    F: FnMut(u32, u32) -> bool,
{
    GrayImage::from_fn(width, height, |x, y| {
        Luma([if predicate(x, y) { MASK_ON } else { 0 }])
    })
}

pub fn mask_or(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let (width, height) = a.dimensions();
    mask_from_fn(width, height, |x, y| {
        a.get_pixel(x, y)[0] > 0 || b.get_pixel(x, y)[0] > 0
    })
}

pub fn mask_and(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let (width, height) = a.dimensions();
    mask_from_fn(width, height, |x, y| {
        a.get_pixel(x, y)[0] > 0 && b.get_pixel(x, y)[0] > 0
    })
}

#[inline]
pub fn count_nonzero(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] > 0).count()
}

/// Percentage of set pixels in a mask
pub fn mask_percentage(mask: &GrayImage) -> f64 {
    let total = mask.width() as usize * mask.height() as usize;
    if total == 0 {
        return 0.0;
    }
    count_nonzero(mask) as f64 / total as f64 * 100.0
}

/// Population mean and standard deviation
pub fn mean_std<I>(values: I) -> (f64, f64)
where
    I: IntoIterator<Item = f64>,
{
    let mut n = 0usize;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for v in values {
        n += 1;
        sum += v;
        sum_sq += v * v;
    }
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f64;
    let variance = (sum_sq / n as f64 - mean * mean).max(0.0);
    (mean, variance.sqrt())
}

/// Mean of one channel of a three-channel image
pub fn channel_mean(image: &ImageBuffer<Rgb<u8>, Vec<u8>>, channel: usize) -> f64 {
    mean_std(image.pixels().map(|p| p[channel] as f64)).0
}

/// Linear-interpolated percentile (`p` in 0..=100) of unsorted values
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Mirror an index into `0..len` without repeating the edge sample
#[inline]
pub fn reflect_101(index: i64, len: u32) -> u32 {
    let len = len as i64;
    if len == 1 {
        return 0;
    }
    let mut i = index;
    while i < 0 || i >= len {
        if i < 0 {
            i = -i;
        }
        if i >= len {
            i = 2 * (len - 1) - i;
        }
    }
    i as u32
}

/// 3x3 Laplacian (`[0 1 0; 1 -4 1; 0 1 0]`) in row-major order
pub fn laplacian(gray: &GrayImage) -> Vec<f64> {
    let (width, height) = gray.dimensions();
    let mut out = Vec::with_capacity(width as usize * height as usize);
    let at = |x: i64, y: i64| -> f64 {
        gray.get_pixel(reflect_101(x, width), reflect_101(y, height))[0] as f64
    };

    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let value = at(x, y - 1) + at(x - 1, y) + at(x + 1, y) + at(x, y + 1) - 4.0 * at(x, y);
            out.push(value);
        }
    }

    out
}

/// Check if a point is inside the image bounds
#[inline]
pub fn in_bounds(x: i32, y: i32, width: u32, height: u32) -> bool {
    x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn hsv_matches_opencv_scale() {
        assert_eq!(rgb_to_hsv(255, 0, 0), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 255, 0), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 255), [120, 255, 255]);
        assert_eq!(rgb_to_hsv(128, 128, 128), [0, 0, 128]);
        // 10 degrees lands on OpenCV hue 5
        assert_eq!(rgb_to_hsv(255, 43, 0)[0], 5);
    }

    #[test]
    fn lab_extremes() {
        assert_eq!(rgb_to_lab(0, 0, 0), [0, 128, 128]);
        let white = rgb_to_lab(255, 255, 255);
        assert_eq!(white[0], 255);
        assert!((white[1] as i32 - 128).abs() <= 1);
        assert!((white[2] as i32 - 128).abs() <= 1);
        // Yellow pushes b well above neutral
        assert!(rgb_to_lab(255, 220, 60)[2] > 160);
    }

    #[test]
    fn percentile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_approx_eq!(percentile(&values, 0.0), 1.0);
        assert_approx_eq!(percentile(&values, 50.0), 3.0);
        assert_approx_eq!(percentile(&values, 20.0), 1.8);
        assert_approx_eq!(percentile(&[], 20.0), 0.0);
    }

    #[test]
    fn reflect_101_mirrors_without_edge_repeat() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(2, 5), 2);
        assert_eq!(reflect_101(-3, 1), 0);
    }

    #[test]
    fn laplacian_of_flat_image_is_zero() {
        let gray = GrayImage::from_pixel(6, 4, Luma([90]));
        assert!(laplacian(&gray).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn mean_std_of_constant_is_zero_spread() {
        let (mean, std) = mean_std([3.0, 3.0, 3.0]);
        assert_approx_eq!(mean, 3.0);
        assert_approx_eq!(std, 0.0);
    }
}
