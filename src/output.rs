use std::fs;
use std::path::{Path, PathBuf};
use csv::Writer;

use crate::annotation::compose_comparison;
use crate::errors::Result;
use crate::image_io::{load_image, save_image};
use crate::pipeline::ImageReport;

/// Write one image's report as pretty JSON to `<output_dir>/<filename>.json`
pub fn write_json_report<P: AsRef<Path>>(report: &ImageReport, output_dir: P) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let output_path = output_dir.join(format!("{}.json", report.filename));
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&output_path, json)?;

    Ok(output_path)
}

/// Put every processed image, and its annotated copy when all of them
/// have one, on a single comparison sheet. Nothing is written for an
/// empty batch.
pub fn write_comparison_sheet<P: AsRef<Path>>(
    reports: &[ImageReport],
    output_path: P,
) -> Result<Option<PathBuf>> {
    let output_path = output_path.as_ref();

    let mut originals = Vec::with_capacity(reports.len());
    let mut annotated = Vec::with_capacity(reports.len());
    for report in reports {
        originals.push((load_image(&report.path)?.image, report.filename.clone()));
        if let Some(path) = &report.annotated_path {
            annotated.push(image::open(path)?.to_rgb8());
        }
    }

    let annotated = (annotated.len() == originals.len()).then_some(annotated.as_slice());
    let Some(sheet) = compose_comparison(&originals, annotated, 2) else {
        return Ok(None);
    };

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    save_image(&sheet, output_path)?;

    Ok(Some(output_path.to_path_buf()))
}

/// Write one summary row per image
pub fn write_summary_csv<P: AsRef<Path>>(reports: &[ImageReport], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(output_path)?;

    writer.write_record([
        "Image",
        "Scalp_Type",
        "Type_Confidence",
        "Health_Score",
        "Confidence",
        "Urgency",
        "Conditions",
        "Red_Dots",
        "Flakes",
        "Pustules",
        "Vessels",
        "Pigmentation",
        "Brightness",
        "Oiliness",
        "Redness",
        "Dandruff",
        "Hair_Density",
        "Inflammation",
    ])?;

    for report in reports {
        let analysis = &report.analysis;
        let stats = &report.detailed.statistics;
        let details = &analysis.details;

        let conditions = analysis
            .diagnosed_conditions
            .iter()
            .map(|c| format!("{} ({})", c.name_en, c.severity.label_en()))
            .collect::<Vec<_>>()
            .join("; ");

        writer.write_record([
            report.filename.clone(),
            analysis.scalp_type.name_en().to_string(),
            analysis.type_confidence.to_string(),
            format!("{:.1}", report.effective_health_score()),
            format!("{:.1}", analysis.confidence),
            analysis.medical_advice.urgency.as_str().to_string(),
            conditions,
            stats.red_dots_count.to_string(),
            stats.flakes_count.to_string(),
            stats.pustules_count.to_string(),
            stats.vessels_visible.to_string(),
            stats.pigmentation_areas.to_string(),
            format!("{:.2}", details.brightness),
            format!("{:.2}", report.features.oiliness),
            format!("{:.2}", details.redness_level),
            format!("{:.2}", details.dandruff_level),
            format!("{:.2}", details.hair_density),
            format!("{:.2}", details.inflammation_level),
        ])?;
    }

    writer.flush()?;

    Ok(())
}
