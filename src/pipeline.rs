// src/pipeline.rs - Whole-image analysis and per-file processing

use image::RgbImage;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::annotation::{annotate_micro_symptoms, AnnotationOptions};
use crate::cache::{cached_or_load, ResultCache};
use crate::concerns::detect_concerns;
use crate::conditions::{diagnose_conditions, Condition};
use crate::config::Config;
use crate::detailed_analysis::{analyze_detailed, DetailedAnalysis};
use crate::errors::Result;
use crate::feature_extraction::{extract_features, AnalysisDetails, FeatureSet};
use crate::image_io::{save_image, InputImage};
use crate::image_utils::resize_image;
use crate::medical_advice::{generate_medical_advice, MedicalAdvice};
use crate::merge::{load_external_result, merge, CombinedResult};
use crate::output::write_json_report;
use crate::scalp_type::{classify_scalp_type, ScalpType};
use crate::scoring::{calculate_confidence, calculate_health_score};

/// Result of the rule-based analysis of one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub scalp_type: ScalpType,
    pub type_confidence: u8,
    /// Everyday care for the classified type
    pub care_tips: Vec<String>,
    pub diagnosed_conditions: Vec<Condition>,
    pub concerns: Vec<String>,
    /// Image-quality confidence, one decimal
    pub confidence: f64,
    pub health_score: u8,
    pub medical_advice: MedicalAdvice,
    pub details: AnalysisDetails,
}

/// Features, then every decision made from them. Pure: the same image
/// always yields the same result.
pub fn analyze(image: &RgbImage) -> AnalysisResult {
    let features = extract_features(image);
    debug!("Features: {:?}", features);
    analyze_features(&features)
}

/// The decision stages alone, for an already measured feature set
pub fn analyze_features(features: &FeatureSet) -> AnalysisResult {
    let (scalp_type, type_confidence) = classify_scalp_type(features);
    let diagnosed_conditions = diagnose_conditions(features);
    let concerns = detect_concerns(features);
    let health_score = calculate_health_score(features, &concerns, &diagnosed_conditions);
    let medical_advice = generate_medical_advice(&diagnosed_conditions, features);
    let confidence = (calculate_confidence(features) * 10.0).round() / 10.0;

    AnalysisResult {
        scalp_type,
        type_confidence,
        care_tips: scalp_type.care_tips().iter().map(|tip| tip.to_string()).collect(),
        diagnosed_conditions,
        concerns,
        confidence,
        health_score,
        medical_advice,
        details: features.details(),
    }
}

/// Everything produced for one input file
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    pub filename: String,
    pub path: PathBuf,
    pub content_hash: String,
    pub features: FeatureSet,
    pub analysis: AnalysisResult,
    pub detailed: DetailedAnalysis,
    /// Present when an external result was found for this image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined: Option<CombinedResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_path: Option<PathBuf>,
}

impl ImageReport {
    /// Health score after merging, if any
    pub fn effective_health_score(&self) -> f64 {
        self.combined
            .as_ref()
            .map(|c| c.health_score)
            .unwrap_or(self.analysis.health_score as f64)
    }
}

/// Analyze one loaded image and write its outputs as configured
pub fn process_image(
    input_image: InputImage,
    config: &Config,
    cache: Option<&dyn ResultCache>,
) -> Result<ImageReport> {
    let InputImage { image, path, filename, content_hash } = input_image;

    // Step 1: Resize if configured
    let image = match config.resize_dimensions {
        Some(dimensions) => resize_image(&image, dimensions),
        None => image,
    };

    // Step 2: Whole-image and region analysis
    let features = extract_features(&image);
    let analysis = analyze_features(&features);
    let detailed = analyze_detailed(&image);

    info!(
        "{}: {} (health {}, {} conditions, {} regions)",
        filename,
        analysis.scalp_type.name_en(),
        analysis.health_score,
        analysis.diagnosed_conditions.len(),
        detailed.micro_symptoms.total()
    );

    // Step 3: Annotated copy
    let annotated_path = if config.save_annotated {
        let options = AnnotationOptions {
            show_labels: config.show_labels,
            show_legend: config.show_legend,
            label_limit: config.label_limit,
        };
        let annotated = annotate_micro_symptoms(&image, &detailed.micro_symptoms, &options);
        let out_path = config.annotated_dir().join(format!("{}_annotated.png", filename));
        save_image(&annotated, &out_path)?;
        Some(out_path)
    } else {
        None
    };

    // Step 4: External result, looked up by file stem
    let external = match &config.external_results_dir {
        Some(dir) => {
            let external_path = PathBuf::from(dir).join(format!("{}.json", filename));
            let loaded = cached_or_load(cache, &content_hash, || {
                if external_path.is_file() {
                    load_external_result(&external_path).map(Some)
                } else {
                    debug!("No external result at {}", external_path.display());
                    Ok(None)
                }
            });
            // An unreadable sidecar only costs the merge, never the image
            loaded.unwrap_or_else(|e| {
                warn!("Ignoring external result {}: {}", external_path.display(), e);
                None
            })
        }
        None => None,
    };
    let combined = external.map(|external| merge(&external, &analysis));

    let report = ImageReport {
        filename,
        path,
        content_hash,
        features,
        analysis,
        detailed,
        combined,
        annotated_path,
    };

    // Step 5: Per-image JSON
    if config.write_json_report {
        write_json_report(&report, config.reports_dir())?;
    }

    Ok(report)
}
