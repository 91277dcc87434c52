// src/lib.rs - Library interface for ScalpScanR

pub mod annotation;
pub mod cache;
pub mod circles;
pub mod concerns;
pub mod conditions;
pub mod config;
pub mod detailed_analysis;
pub mod errors;
pub mod feature_extraction;
pub mod font;
pub mod image_io;
pub mod image_utils;
pub mod layers;
pub mod medical_advice;
pub mod merge;
pub mod morphology;
pub mod output;
pub mod pipeline;
pub mod regions;
pub mod scalp_type;
pub mod scoring;
pub mod symptoms;

// Re-export commonly used types and functions
pub use errors::{Result, ScalpError};
pub use config::Config;
pub use pipeline::{analyze, analyze_features, process_image, AnalysisResult, ImageReport};
pub use image_io::{get_image_files_in_dir, load_image, save_image, InputImage};

// Whole-image stages
pub use feature_extraction::{extract_features, AnalysisDetails, FeatureSet};
pub use scalp_type::{classify_scalp_type, ScalpType};
pub use conditions::{diagnose_conditions, Condition, ConditionKind, ConditionSource, Severity};
pub use concerns::detect_concerns;
pub use scoring::{calculate_confidence, calculate_health_score};
pub use medical_advice::{generate_medical_advice, MedicalAdvice, Urgency};

// Region-level analysis
pub use detailed_analysis::{analyze_detailed, DetailedAnalysis, SeverityAssessment, SymptomStatistics};
pub use layers::{assess_layers, LayerAssessment};
pub use symptoms::{detect_micro_symptoms, MicroSymptoms};

// Annotation
pub use annotation::{
    annotate, annotate_micro_symptoms, compose_comparison, AnnotationLayers, AnnotationOptions, Marker,
};

// External results
pub use merge::{load_external_result, merge, normalize_condition, CombinedResult, ExternalCondition, ExternalResult};
pub use cache::{cached_or_load, content_hash, MemoryCache, ResultCache};

// Output
pub use output::{write_comparison_sheet, write_json_report, write_summary_csv};
