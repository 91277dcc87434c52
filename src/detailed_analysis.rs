// src/detailed_analysis.rs - Layer assessment, symptom regions and severity grading

use image::RgbImage;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::image_utils::to_hsv;
use crate::layers::{assess_layers, Barrier, GlandActivity, LayerAssessment, Secretion};
use crate::symptoms::{detect_micro_symptoms, MicroSymptoms, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    None,
    Minimal,
    Normal,
    Low,
    Mild,
    Moderate,
    High,
    Severe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityGrade {
    pub score: u32,
    pub level: Level,
    pub description: String,
}

impl SeverityGrade {
    fn new(score: u32, level: Level, description: &str) -> Self {
        Self { score, level, description: description.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityAssessment {
    pub inflammation: SeverityGrade,
    pub dryness: SeverityGrade,
    pub oiliness: SeverityGrade,
    pub sensitivity: SeverityGrade,
    pub damage: SeverityGrade,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomStatistics {
    pub red_dots_count: usize,
    pub flakes_count: usize,
    pub pustules_count: usize,
    pub vessels_visible: usize,
    pub pigmentation_areas: usize,
}

impl From<&MicroSymptoms> for SymptomStatistics {
    fn from(symptoms: &MicroSymptoms) -> Self {
        Self {
            red_dots_count: symptoms.red_dots.len(),
            flakes_count: symptoms.white_flakes.len(),
            pustules_count: symptoms.pustules.len(),
            vessels_visible: symptoms.telangiectasia.len(),
            pigmentation_areas: symptoms.pigmentation.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedAnalysis {
    pub layer_analysis: LayerAssessment,
    pub micro_symptoms: MicroSymptoms,
    pub statistics: SymptomStatistics,
    pub severity_assessment: SeverityAssessment,
    pub detailed_findings: Vec<String>,
}

/// Full structural pass over one image
pub fn analyze_detailed(image: &RgbImage) -> DetailedAnalysis {
    let hsv = to_hsv(image);
    let layers = assess_layers(image, &hsv);
    let symptoms = detect_micro_symptoms(image);
    let statistics = SymptomStatistics::from(&symptoms);

    debug!(
        "Detailed analysis: {} red dots, {} flakes, {} pustules, {} vessels, {} pigmented areas",
        statistics.red_dots_count,
        statistics.flakes_count,
        statistics.pustules_count,
        statistics.vessels_visible,
        statistics.pigmentation_areas
    );

    let severity_assessment = SeverityAssessment {
        inflammation: assess_inflammation(&symptoms, &layers),
        dryness: assess_dryness(&symptoms, &layers),
        oiliness: assess_oiliness(&layers),
        sensitivity: assess_sensitivity(&symptoms, &layers),
        damage: assess_damage(&symptoms, &layers),
    };
    let detailed_findings = detailed_findings(&symptoms, &layers);

    DetailedAnalysis {
        layer_analysis: layers,
        micro_symptoms: symptoms,
        statistics,
        severity_assessment,
        detailed_findings,
    }
}

/// Points for a count against two ascending cut-offs, zero when empty
fn count_points(count: usize, middle: usize, high: usize, points: [u32; 3]) -> u32 {
    if count > high {
        points[2]
    } else if count > middle {
        points[1]
    } else if count > 0 {
        points[0]
    } else {
        0
    }
}

pub fn assess_inflammation(symptoms: &MicroSymptoms, layers: &LayerAssessment) -> SeverityGrade {
    let score = count_points(symptoms.red_dots.len(), 5, 10, [1, 2, 3])
        + count_points(symptoms.pustules.len(), 2, 5, [1, 2, 3])
        + layers.dermal_inflammation_score();

    match score {
        s if s >= 6 => SeverityGrade::new(
            s,
            Level::Severe,
            "Severe inflammation: marked redness, swelling and pustules, see a doctor promptly",
        ),
        s if s >= 3 => SeverityGrade::new(
            s,
            Level::Moderate,
            "Moderate inflammation: red dots and slight swelling, an anti-inflammatory product is advised",
        ),
        s if s > 0 => SeverityGrade::new(
            s,
            Level::Mild,
            "Mild inflammation: slight signs of irritation, keep the scalp clean",
        ),
        _ => SeverityGrade::new(0, Level::None, "No visible inflammation"),
    }
}

pub fn assess_dryness(symptoms: &MicroSymptoms, layers: &LayerAssessment) -> SeverityGrade {
    let mut score = count_points(symptoms.white_flakes.len(), 5, 10, [1, 2, 3]);
    if layers.epidermis.barrier_function == Barrier::Weak {
        score += 2;
    }
    if layers.sebaceous_glands.secretion_level == Secretion::Insufficient {
        score += 2;
    }

    match score {
        s if s >= 5 => SeverityGrade::new(
            s,
            Level::Severe,
            "Severe dryness: the scalp is badly dehydrated and shedding heavily, needs deep moisturising",
        ),
        s if s >= 3 => SeverityGrade::new(
            s,
            Level::Moderate,
            "Moderate dryness: dry scalp with visible flaking, needs hydrating care",
        ),
        s if s > 0 => SeverityGrade::new(
            s,
            Level::Mild,
            "Mild dryness: slightly dry scalp, a moisturising product is advised",
        ),
        _ => SeverityGrade::new(0, Level::Normal, "Moisture balance is normal"),
    }
}

/// Graded from the sebaceous layer alone
pub fn assess_oiliness(layers: &LayerAssessment) -> SeverityGrade {
    let hyperactive = layers.sebaceous_glands.activity == GlandActivity::Hyperactive;
    let excessive = layers.sebaceous_glands.secretion_level == Secretion::Excessive;

    if hyperactive && excessive {
        SeverityGrade::new(2, Level::Severe, "Heavy sebum secretion, the scalp is very oily")
    } else if hyperactive || excessive {
        SeverityGrade::new(1, Level::Moderate, "Sebum secretion on the high side, the scalp is fairly oily")
    } else {
        SeverityGrade::new(0, Level::Normal, "Sebum secretion is normal")
    }
}

pub fn assess_sensitivity(symptoms: &MicroSymptoms, layers: &LayerAssessment) -> SeverityGrade {
    let mut score = count_points(symptoms.red_dots.len(), 5, usize::MAX, [1, 2, 2])
        + count_points(symptoms.telangiectasia.len(), 3, usize::MAX, [1, 2, 2]);
    if layers.epidermis.barrier_function == Barrier::Weak {
        score += 2;
    }

    match score {
        s if s >= 4 => SeverityGrade::new(
            s,
            Level::High,
            "Highly sensitive: the scalp reacts easily, use only gentle products",
        ),
        s if s >= 2 => SeverityGrade::new(
            s,
            Level::Moderate,
            "Moderately sensitive: avoid harsh or irritating products",
        ),
        s => SeverityGrade::new(s, Level::Low, "Low sensitivity: the scalp tolerates products well"),
    }
}

pub fn assess_damage(symptoms: &MicroSymptoms, layers: &LayerAssessment) -> SeverityGrade {
    let issues = layers.issues().count();
    let mut score = count_points(issues, 2, 5, [1, 2, 3]);
    score += match symptoms.total() {
        n if n > 20 => 3,
        n if n > 10 => 2,
        n if n > 5 => 1,
        _ => 0,
    };

    match score {
        s if s >= 5 => SeverityGrade::new(
            s,
            Level::Severe,
            "Severe damage: several damaged areas, restorative treatment needed",
        ),
        s if s >= 3 => SeverityGrade::new(
            s,
            Level::Moderate,
            "Moderate damage: the scalp needs restorative care",
        ),
        s if s > 0 => SeverityGrade::new(s, Level::Mild, "Mild damage: slight signs of scalp damage"),
        _ => SeverityGrade::new(0, Level::Minimal, "Healthy scalp with no visible damage"),
    }
}

/// One sentence per symptom category present, then every layer issue
pub fn detailed_findings(symptoms: &MicroSymptoms, layers: &LayerAssessment) -> Vec<String> {
    let mut findings = Vec::new();

    if !symptoms.red_dots.is_empty() {
        findings.push(format!(
            "Found {} red dots or erythema patches, suggesting an inflammatory reaction",
            symptoms.red_dots.len()
        ));
    }

    if !symptoms.white_flakes.is_empty() {
        let count = symptoms.white_flakes.len();
        let severe = symptoms.white_flakes.iter().filter(|f| f.severity == Tier::Severe).count();
        if severe > 0 {
            findings.push(format!("Found {} flakes, {} of them large", count, severe));
        } else {
            findings.push(format!("Found {} light flakes", count));
        }
    }

    if !symptoms.pustules.is_empty() {
        findings.push(format!(
            "Found {} pustules or inflamed papules, anti-inflammatory treatment needed",
            symptoms.pustules.len()
        ));
    }

    if !symptoms.telangiectasia.is_empty() {
        findings.push("Dilated capillaries visible, the scalp is fairly sensitive".to_string());
    }

    if !symptoms.pigmentation.is_empty() {
        findings.push(format!("Found {} pigmented areas", symptoms.pigmentation.len()));
    }

    findings.extend(layers.issues().cloned());
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Inflammation;
    use crate::symptoms::{
        FlakeColor, FlakeNature, FlakeSize, Intensity, RedDot, RedDotKind, Shape, Vessel,
        VesselProminence, WhiteFlake,
    };

    fn red_dot() -> RedDot {
        RedDot { center: (1, 1), area: 4.0, size: 1, intensity: Intensity::Low, kind: RedDotKind::RedDot }
    }

    fn flake(severity: Tier) -> WhiteFlake {
        WhiteFlake {
            center: (2, 2),
            area: 30.0,
            size: FlakeSize::Small,
            color: FlakeColor::PureWhite,
            nature: FlakeNature::Dry,
            shape: Shape::Irregular,
            severity,
        }
    }

    fn vessel() -> Vessel {
        Vessel { center: (3, 3), length: 25.0, severity: VesselProminence::Visible }
    }

    #[test]
    fn empty_symptoms_with_default_layers() {
        let symptoms = MicroSymptoms::default();
        let layers = LayerAssessment::default();

        assert_eq!(assess_inflammation(&symptoms, &layers).level, Level::None);
        assert_eq!(assess_dryness(&symptoms, &layers).level, Level::Normal);
        assert_eq!(assess_oiliness(&layers).level, Level::Normal);
        assert_eq!(assess_sensitivity(&symptoms, &layers).level, Level::Low);
        assert_eq!(assess_damage(&symptoms, &layers).level, Level::Minimal);
        assert!(detailed_findings(&symptoms, &layers).is_empty());
    }

    #[test]
    fn inflammation_adds_red_dots_and_dermis() {
        let symptoms = MicroSymptoms { red_dots: vec![red_dot(); 11], ..MicroSymptoms::default() };
        let mut layers = LayerAssessment::default();
        layers.dermis.inflammation = Inflammation::Mild;

        let grade = assess_inflammation(&symptoms, &layers);
        assert_eq!(grade.score, 4);
        assert_eq!(grade.level, Level::Moderate);
    }

    #[test]
    fn dryness_counts_barrier_and_sebum() {
        let mut layers = LayerAssessment::default();
        layers.epidermis.barrier_function = Barrier::Weak;
        layers.sebaceous_glands.secretion_level = Secretion::Insufficient;
        let symptoms = MicroSymptoms { white_flakes: vec![flake(Tier::Mild)], ..MicroSymptoms::default() };

        let grade = assess_dryness(&symptoms, &layers);
        assert_eq!(grade.score, 5);
        assert_eq!(grade.level, Level::Severe);
    }

    #[test]
    fn oiliness_needs_both_signals_for_severe() {
        let mut layers = LayerAssessment::default();
        layers.sebaceous_glands.secretion_level = Secretion::Excessive;
        assert_eq!(assess_oiliness(&layers).level, Level::Moderate);

        layers.sebaceous_glands.activity = GlandActivity::Hyperactive;
        assert_eq!(assess_oiliness(&layers).level, Level::Severe);
    }

    #[test]
    fn sensitivity_tiers() {
        let mut layers = LayerAssessment::default();
        let symptoms = MicroSymptoms {
            red_dots: vec![red_dot(); 6],
            telangiectasia: vec![vessel()],
            ..MicroSymptoms::default()
        };
        assert_eq!(assess_sensitivity(&symptoms, &layers).score, 3);

        layers.epidermis.barrier_function = Barrier::Weak;
        let grade = assess_sensitivity(&symptoms, &layers);
        assert_eq!(grade.score, 5);
        assert_eq!(grade.level, Level::High);
    }

    #[test]
    fn damage_from_symptom_total() {
        let symptoms = MicroSymptoms {
            red_dots: vec![red_dot(); 15],
            white_flakes: vec![flake(Tier::Mild); 8],
            ..MicroSymptoms::default()
        };
        let grade = assess_damage(&symptoms, &LayerAssessment::default());
        assert_eq!(grade.score, 3);
        assert_eq!(grade.level, Level::Moderate);
    }

    #[test]
    fn findings_mention_large_flakes_and_layer_issues() {
        let symptoms = MicroSymptoms {
            white_flakes: vec![flake(Tier::Severe), flake(Tier::Mild)],
            telangiectasia: vec![vessel()],
            ..MicroSymptoms::default()
        };
        let mut layers = LayerAssessment::default();
        layers.dermis.issues.push("Hyperaemia".to_string());

        let findings = detailed_findings(&symptoms, &layers);
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0], "Found 2 flakes, 1 of them large");
        assert!(findings[1].contains("capillaries"));
        assert_eq!(findings[2], "Hyperaemia");
    }

    #[test]
    fn statistics_match_lists() {
        let image = RgbImage::from_pixel(32, 32, image::Rgb([120, 100, 90]));
        let analysis = analyze_detailed(&image);
        assert_eq!(analysis.statistics, SymptomStatistics::from(&analysis.micro_symptoms));
    }
}
