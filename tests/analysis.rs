use assert_approx_eq::assert_approx_eq;
use image::{Rgb, RgbImage};

use scalp_scan_rust_lib::concerns::HEALTHY_MESSAGE;
use scalp_scan_rust_lib::{
    analyze, analyze_detailed, analyze_features, annotate, extract_features, AnnotationLayers,
    AnnotationOptions, ConditionKind, FeatureSet, ScalpType, Severity,
};

const PURE_RED: [u8; 3] = [255, 43, 0]; // HSV (5, 255, 255) on the 0..180 hue scale

fn with_block(size: u32, block: u32, background: [u8; 3], color: [u8; 3]) -> RgbImage {
    let start = (size - block) / 2;
    RgbImage::from_fn(size, size, |x, y| {
        let inside = (start..start + block).contains(&x) && (start..start + block).contains(&y);
        Rgb(if inside { color } else { background })
    })
}

/// Deterministic speckle so range checks see some texture
fn speckled(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut state = seed;
    RgbImage::from_fn(width, height, |_, _| {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let r = (state >> 16) as u8;
        let g = (state >> 8) as u8;
        let b = state as u8;
        Rgb([r, g / 2 + 60, b / 2 + 40])
    })
}

#[test]
fn scenario_uniform_gray_is_normal_and_healthy_of_conditions() {
    let image = RgbImage::from_pixel(300, 300, Rgb([128, 128, 128]));
    let features = extract_features(&image);
    assert_approx_eq!(features.hair_density, 0.0);
    assert_approx_eq!(features.redness_level, 0.0);

    let result = analyze(&image);
    assert_eq!(result.scalp_type, ScalpType::Normal);
    assert!(result.diagnosed_conditions.is_empty());
}

#[test]
fn scenario_red_block_raises_redness_and_finds_red_dot() {
    let image = with_block(100, 40, [128, 128, 128], PURE_RED);
    let features = extract_features(&image);
    assert!(features.redness_level > 8.0);

    let detailed = analyze_detailed(&image);
    let near_centre = detailed.micro_symptoms.red_dots.iter().any(|dot| {
        let (x, y) = dot.center;
        (x as i32 - 50).abs() <= 3 && (y as i32 - 50).abs() <= 3
    });
    assert!(near_centre, "red dots: {:?}", detailed.micro_symptoms.red_dots);
}

#[test]
fn scenario_bright_yellow_is_seborrheic() {
    let image = RgbImage::from_pixel(100, 100, Rgb([255, 220, 60]));
    let result = analyze(&image);

    let seborrheic = result
        .diagnosed_conditions
        .iter()
        .find(|c| c.kind() == Some(ConditionKind::SeborrheicDermatitis))
        .expect("seborrheic dermatitis diagnosed");
    assert!(matches!(
        seborrheic.severity,
        Severity::Mild | Severity::Moderate | Severity::Severe
    ));
}

#[test]
fn scenario_nominal_features_score_full_marks() {
    let features = FeatureSet {
        brightness: 150.0,
        oiliness: 50.0,
        hair_density: 40.0,
        texture_quality: 50.0,
        sharpness: 200.0,
        contrast: 45.0,
        color_uniformity: 80.0,
        ..FeatureSet::default()
    };
    let result = analyze_features(&features);

    assert!(result.diagnosed_conditions.is_empty());
    assert_eq!(result.health_score, 100);
    assert!(result.concerns.iter().any(|c| c == HEALTHY_MESSAGE));
    assert_approx_eq!(result.confidence, 95.0);
}

#[test]
fn repeated_calls_are_identical() {
    let image = speckled(80, 60, 7);
    assert_eq!(extract_features(&image), extract_features(&image));
    assert_eq!(analyze(&image), analyze(&image));
    assert_eq!(analyze_detailed(&image), analyze_detailed(&image));
}

#[test]
fn scores_stay_in_range() {
    let images = [
        speckled(64, 64, 1),
        speckled(90, 40, 99),
        RgbImage::from_pixel(32, 32, Rgb([0, 0, 0])),
        RgbImage::from_pixel(32, 32, Rgb([255, 255, 255])),
        with_block(120, 60, [250, 240, 235], PURE_RED),
    ];

    for image in &images {
        let result = analyze(image);
        assert!(result.health_score <= 100);
        assert!((60.0..=95.0).contains(&result.confidence), "confidence {}", result.confidence);
        assert!(result.diagnosed_conditions.iter().all(|c| c.confidence <= 100));
    }
}

#[test]
fn more_red_never_lowers_redness() {
    let mut previous = (0.0, 0.0);
    for block in [0, 10, 20, 40, 60, 80] {
        let image = with_block(100, block, [128, 128, 128], PURE_RED);
        let f = extract_features(&image);
        assert!(f.redness_level >= previous.0);
        assert!(f.inflammation_level >= previous.1);
        previous = (f.redness_level, f.inflammation_level);
    }
}

#[test]
fn annotating_nothing_returns_the_input() {
    let image = speckled(120, 90, 3);
    for options in [
        AnnotationOptions::default(),
        AnnotationOptions { show_labels: false, show_legend: false, label_limit: 1 },
    ] {
        let out = annotate(&image, &AnnotationLayers::default(), &options);
        assert_eq!(out, image);
    }
}

#[test]
fn annotated_red_block_changes_only_a_copy() {
    let image = with_block(200, 30, [128, 128, 128], PURE_RED);
    let before = image.clone();
    let detailed = analyze_detailed(&image);
    let out = scalp_scan_rust_lib::annotate_micro_symptoms(
        &image,
        &detailed.micro_symptoms,
        &AnnotationOptions::default(),
    );

    assert_eq!(image, before);
    assert_ne!(out, image);
    assert_eq!(out.dimensions(), image.dimensions());
}
