// src/symptoms.rs - Region-level symptom detectors
//
// Area floors are deliberately tiny so that close-up and dermatoscope
// photographs, where a real finding covers only a few pixels, still register.

use image::{GrayImage, Luma, RgbImage};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::feature_extraction::red_band_mask;
use crate::image_utils::{
    count_nonzero, in_range, mask_and, mask_from_fn, mask_or, reflect_101, to_grayscale, to_hsv,
    to_lab, HsvImage, LabImage,
};
use crate::morphology::{close, dilate, gradient, open, StructuringElement};
use crate::regions::{detect_regions, label_components, Component, RegionFilter};
use imageproc::region_labelling::Connectivity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Mild,
    Moderate,
    Severe,
}

impl Tier {
    fn from_area(area: f64, moderate: f64, severe: f64) -> Tier {
        if area > severe {
            Tier::Severe
        } else if area > moderate {
            Tier::Moderate
        } else {
            Tier::Mild
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedDotKind {
    RedDot,
    Erythema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedDot {
    pub center: (u32, u32),
    pub area: f64,
    /// Radius of a disc with the same area
    pub size: u32,
    pub intensity: Intensity,
    pub kind: RedDotKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlakeSize {
    Fine,
    Small,
    Medium,
    Large,
}

impl FlakeSize {
    fn from_area(area: f64) -> FlakeSize {
        if area > 200.0 {
            FlakeSize::Large
        } else if area > 50.0 {
            FlakeSize::Medium
        } else if area > 20.0 {
            FlakeSize::Small
        } else {
            FlakeSize::Fine
        }
    }

    /// Single-letter tag used in annotation labels
    pub fn initial(self) -> char {
        match self {
            FlakeSize::Fine => 'F',
            FlakeSize::Small => 'S',
            FlakeSize::Medium => 'M',
            FlakeSize::Large => 'L',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlakeColor {
    PureWhite,
    Silver,
    Yellow,
    GreyWhite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlakeNature {
    Dry,
    Oily,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Circular,
    Irregular,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhiteFlake {
    pub center: (u32, u32),
    pub area: f64,
    pub size: FlakeSize,
    pub color: FlakeColor,
    pub nature: FlakeNature,
    pub shape: Shape,
    pub severity: Tier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PustuleKind {
    Pustule,
    InflammatoryPapule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PustuleStage {
    Mature,
    Developing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pustule {
    pub center: (u32, u32),
    pub area: f64,
    pub kind: PustuleKind,
    pub stage: PustuleStage,
    pub severity: Tier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VesselProminence {
    Visible,
    Prominent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vessel {
    pub center: (u32, u32),
    pub length: f64,
    pub severity: VesselProminence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PigmentationKind {
    PostInflammatory,
    Mild,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pigmentation {
    pub center: (u32, u32),
    pub area: f64,
    /// Mean 8-bit LAB lightness inside the patch
    pub darkness_level: f64,
    pub kind: PigmentationKind,
    pub severity: Tier,
}

/// All symptom regions found in one image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MicroSymptoms {
    pub red_dots: Vec<RedDot>,
    pub white_flakes: Vec<WhiteFlake>,
    pub pustules: Vec<Pustule>,
    pub telangiectasia: Vec<Vessel>,
    pub pigmentation: Vec<Pigmentation>,
}

impl MicroSymptoms {
    pub fn total(&self) -> usize {
        self.red_dots.len()
            + self.white_flakes.len()
            + self.pustules.len()
            + self.telangiectasia.len()
            + self.pigmentation.len()
    }
}

/// Run the five detectors. They share nothing but the colour planes, so
/// they run concurrently.
pub fn detect_micro_symptoms(image: &RgbImage) -> MicroSymptoms {
    let gray = to_grayscale(image);
    let hsv = to_hsv(image);
    let lab = to_lab(image);

    let ((red_dots, white_flakes), (pustules, (telangiectasia, pigmentation))) = rayon::join(
        || {
            rayon::join(
                || detect_red_dots(image, &hsv),
                || detect_white_flakes(image, &hsv, &lab),
            )
        },
        || {
            rayon::join(
                || detect_pustules(image, &gray),
                || {
                    rayon::join(
                        || detect_telangiectasia(image),
                        || detect_pigmentation(&lab),
                    )
                },
            )
        },
    );

    MicroSymptoms { red_dots, white_flakes, pustules, telangiectasia, pigmentation }
}

fn mean_over(component: &Component, sample: impl Fn(u32, u32) -> f64) -> f64 {
    let sum: f64 = component.pixels.iter().map(|&(x, y)| sample(x, y)).sum();
    sum / component.area as f64
}

/// Red dots and erythema.
///
/// The mask is the union of a pale pink band for magnified shots, a plain
/// red-dominance test on RGB, and the saturated erythema band.
pub fn detect_red_dots(image: &RgbImage, hsv: &HsvImage) -> Vec<RedDot> {
    let (width, height) = image.dimensions();

    let pink = mask_or(
        &in_range(hsv, [0, 5, 150], [15, 80, 255]),
        &in_range(hsv, [160, 5, 150], [180, 80, 255]),
    );
    let dominant = mask_from_fn(width, height, |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let (r, g, b) = (r as f64, g as f64, b as f64);
        let dominance = (r - g) + (r - b);
        dominance > 3.0 && r > 150.0 && (r + g + b) / 3.0 > 140.0
    });
    let saturated = red_band_mask(hsv, 50);

    let mask = mask_or(&mask_or(&pink, &dominant), &saturated);
    let mask = open(&mask, &StructuringElement::rect(1, 1));
    let mask = close(&mask, &StructuringElement::rect(2, 2));

    log::debug!(
        "red dots: pink {} / dominant {} / saturated {} / combined {} pixels",
        count_nonzero(&pink),
        count_nonzero(&dominant),
        count_nonzero(&saturated),
        count_nonzero(&mask)
    );

    let dots = detect_regions(&mask, RegionFilter::above(1.0), |c| {
        let area = c.area as f64;
        Some(RedDot {
            center: c.centroid,
            area,
            size: (area / PI).sqrt() as u32,
            intensity: if area > 50.0 {
                Intensity::High
            } else if area > 20.0 {
                Intensity::Moderate
            } else {
                Intensity::Low
            },
            kind: if area > 100.0 { RedDotKind::Erythema } else { RedDotKind::RedDot },
        })
    });

    log::debug!("red dots: {} regions", dots.len());
    dots
}

/// White, silver and yellow-oily flakes, kept only where they touch an edge
pub fn detect_white_flakes(image: &RgbImage, hsv: &HsvImage, lab: &LabImage) -> Vec<WhiteFlake> {
    let mask = flake_mask(image, hsv, lab);
    let flakes = classify_flakes(&mask, image, hsv, lab);
    log::debug!("flakes: {} regions", flakes.len());
    flakes
}

/// Canny on each colour plane, merged. Catches outlines that vanish in
/// grayscale, like a saturated flake on a background of equal luma.
fn color_edges(image: &RgbImage, low: f32, high: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let edges: Vec<GrayImage> = (0..3usize)
        .into_par_iter()
        .map(|channel| {
            let plane = GrayImage::from_fn(width, height, |x, y| Luma([image.get_pixel(x, y)[channel]]));
            canny(&plane, low, high)
        })
        .collect();
    edges.iter().skip(1).fold(edges[0].clone(), |merged, plane| mask_or(&merged, plane))
}

fn flake_mask(image: &RgbImage, hsv: &HsvImage, lab: &LabImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let sv = |x: u32, y: u32| {
        let p = hsv.get_pixel(x, y);
        (p[1] as u32, p[2] as u32)
    };

    let pure_white = mask_from_fn(width, height, |x, y| {
        let (s, v) = sv(x, y);
        v > 200 && s < 100 && lab.get_pixel(x, y)[0] > 180
    });
    let silver = mask_from_fn(width, height, |x, y| {
        let (s, v) = sv(x, y);
        let l = lab.get_pixel(x, y)[0];
        v > 180 && s < 80 && l > 160 && l <= 220
    });
    let yellow = mask_from_fn(width, height, |x, y| {
        let (s, v) = sv(x, y);
        v > 150 && v < 245 && s > 5 && s < 60 && lab.get_pixel(x, y)[2] > 125
    });

    let edges = dilate(&color_edges(image, 50.0, 150.0), &StructuringElement::rect(2, 2));
    let mask = mask_and(&mask_or(&mask_or(&pure_white, &silver), &yellow), &edges);
    let mask = open(&mask, &StructuringElement::rect(2, 2));
    let mask = close(&mask, &StructuringElement::rect(3, 3));

    log::debug!(
        "flakes: white {} / silver {} / yellow {} / combined {} pixels",
        count_nonzero(&pure_white),
        count_nonzero(&silver),
        count_nonzero(&yellow),
        count_nonzero(&mask)
    );

    mask
}

/// Colour is judged from the mean red, saturation and LAB b inside each region
fn classify_flakes(mask: &GrayImage, image: &RgbImage, hsv: &HsvImage, lab: &LabImage) -> Vec<WhiteFlake> {
    detect_regions(mask, RegionFilter::above(1.0), |c| {
        let area = c.area as f64;
        let mean_red = mean_over(c, |x, y| image.get_pixel(x, y)[0] as f64);
        let mean_sat = mean_over(c, |x, y| hsv.get_pixel(x, y)[1] as f64);
        let mean_b = mean_over(c, |x, y| lab.get_pixel(x, y)[2] as f64);

        let (color, nature) = if mean_sat < 30.0 && mean_red > 200.0 {
            (FlakeColor::PureWhite, FlakeNature::Dry)
        } else if mean_sat < 40.0 && mean_red > 180.0 {
            (FlakeColor::Silver, FlakeNature::Dry)
        } else if mean_b > 130.0 && mean_sat > 20.0 {
            (FlakeColor::Yellow, FlakeNature::Oily)
        } else {
            (FlakeColor::GreyWhite, FlakeNature::Mixed)
        };

        Some(WhiteFlake {
            center: c.centroid,
            area,
            size: FlakeSize::from_area(area),
            color,
            nature,
            shape: if c.circularity() > 0.7 { Shape::Circular } else { Shape::Irregular },
            severity: Tier::from_area(area, 50.0, 200.0),
        })
    })
}

/// Inverted adaptive threshold against a Gaussian-weighted local mean:
/// set where the pixel is at least `offset` darker than its surroundings.
fn adaptive_threshold_inv(gray: &GrayImage, sigma: f32, offset: i32) -> GrayImage {
    let local_mean = gaussian_blur_f32(gray, sigma);
    let (width, height) = gray.dimensions();
    mask_from_fn(width, height, |x, y| {
        gray.get_pixel(x, y)[0] as i32 - local_mean.get_pixel(x, y)[0] as i32 <= -offset
    })
}

/// Raised bumps. A pale yellow-white centre marks a pustule, anything
/// else an inflammatory papule.
pub fn detect_pustules(image: &RgbImage, gray: &GrayImage) -> Vec<Pustule> {
    // Block size 11 corresponds to sigma 2
    let mask = adaptive_threshold_inv(gray, 2.0, 2);
    let mask = close(&mask, &StructuringElement::rect(5, 5));

    let pustules = detect_regions(&mask, RegionFilter::between(20.0, 500.0), |c| {
        let area = c.area as f64;
        let [r, g, _] = image.get_pixel(c.centroid.0, c.centroid.1).0;
        let is_pustule = r > 200 && g > 180;

        Some(Pustule {
            center: c.centroid,
            area,
            kind: if is_pustule { PustuleKind::Pustule } else { PustuleKind::InflammatoryPapule },
            stage: if is_pustule { PustuleStage::Mature } else { PustuleStage::Developing },
            severity: Tier::from_area(area, 50.0, 100.0),
        })
    });

    log::debug!("pustules: {} regions", pustules.len());
    pustules
}

/// Real Gabor kernel, square with odd side `size`
fn gabor_kernel(size: usize, sigma: f64, theta: f64, lambda: f64, gamma: f64, psi: f64) -> Vec<f64> {
    let half = (size / 2) as i64;
    let (sin_t, cos_t) = theta.sin_cos();
    let mut kernel = Vec::with_capacity(size * size);

    for y in -half..=half {
        for x in -half..=half {
            let (xf, yf) = (x as f64, y as f64);
            let xr = xf * cos_t + yf * sin_t;
            let yr = -xf * sin_t + yf * cos_t;
            let envelope = (-(xr * xr + gamma * gamma * yr * yr) / (2.0 * sigma * sigma)).exp();
            kernel.push(envelope * (2.0 * PI * xr / lambda + psi).cos());
        }
    }

    kernel
}

/// Correlate one plane with a square kernel, mirroring at the borders and
/// saturating the result to 8 bits
fn filter_saturate(plane: &GrayImage, kernel: &[f64], size: usize) -> GrayImage {
    let (width, height) = plane.dimensions();
    let half = (size / 2) as i64;

    let rows: Vec<Vec<u8>> = (0..height as i64)
        .into_par_iter()
        .map(|y| {
            (0..width as i64)
                .map(|x| {
                    let mut acc = 0.0;
                    for ky in 0..size as i64 {
                        let sy = reflect_101(y + ky - half, height);
                        for kx in 0..size as i64 {
                            let sx = reflect_101(x + kx - half, width);
                            acc += kernel[(ky * size as i64 + kx) as usize]
                                * plane.get_pixel(sx, sy)[0] as f64;
                        }
                    }
                    acc.round().clamp(0.0, 255.0) as u8
                })
                .collect()
        })
        .collect();

    GrayImage::from_fn(width, height, |x, y| Luma([rows[y as usize][x as usize]]))
}

/// Dilated vessels: a diagonal Gabor response on the red channel, reduced
/// to outlines; only long traces are kept.
pub fn detect_telangiectasia(image: &RgbImage) -> Vec<Vessel> {
    const KERNEL_SIZE: usize = 31;

    let (width, height) = image.dimensions();
    let red = GrayImage::from_fn(width, height, |x, y| Luma([image.get_pixel(x, y)[0]]));
    let kernel = gabor_kernel(KERNEL_SIZE, 4.0, PI / 4.0, 10.0, 0.5, 0.0);
    let response = filter_saturate(&red, &kernel, KERNEL_SIZE);

    let binary = mask_from_fn(width, height, |x, y| response.get_pixel(x, y)[0] > 150);
    let outlines = gradient(&binary, &StructuringElement::ellipse(3, 3));

    let vessels: Vec<Vessel> = label_components(&outlines, Connectivity::Eight)
        .into_iter()
        .filter_map(|c| {
            let length = c.arc_length();
            (length > 20.0).then(|| Vessel {
                center: c.centroid,
                length,
                severity: if length > 50.0 {
                    VesselProminence::Prominent
                } else {
                    VesselProminence::Visible
                },
            })
        })
        .collect();

    log::debug!("vessels: {} traces", vessels.len());
    vessels
}

/// Dark patches in LAB lightness
pub fn detect_pigmentation(lab: &LabImage) -> Vec<Pigmentation> {
    let (width, height) = lab.dimensions();
    let dark = mask_from_fn(width, height, |x, y| lab.get_pixel(x, y)[0] < 100);
    let mask = close(&dark, &StructuringElement::rect(5, 5));

    let patches = detect_regions(&mask, RegionFilter::above(50.0), |c| {
        let darkness = mean_over(c, |x, y| lab.get_pixel(x, y)[0] as f64);
        Some(Pigmentation {
            center: c.centroid,
            area: c.area as f64,
            darkness_level: darkness,
            kind: if darkness < 80.0 {
                PigmentationKind::PostInflammatory
            } else {
                PigmentationKind::Mild
            },
            severity: if darkness < 60.0 {
                Tier::Severe
            } else if darkness < 80.0 {
                Tier::Moderate
            } else {
                Tier::Mild
            },
        })
    });

    log::debug!("pigmentation: {} patches", patches.len());
    patches
}
