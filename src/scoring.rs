// src/scoring.rs - Health score and image-quality confidence

use crate::conditions::{Condition, Severity};
use crate::feature_extraction::FeatureSet;

/// Points removed for one diagnosed condition
fn severity_penalty(severity: Severity) -> i32 {
    match severity {
        Severity::Severe | Severity::Advanced => 30,
        Severity::Moderate => 20,
        Severity::Mild | Severity::Early => 12,
        // Staged alopecia at the intermediate stage carries no penalty
        Severity::Intermediate => 0,
    }
}

/// 100 minus additive penalties, clamped to 0..=100. `concerns` does not
/// affect the score.
pub fn calculate_health_score(
    features: &FeatureSet,
    _concerns: &[String],
    conditions: &[Condition],
) -> u8 {
    let mut score: i32 = 100;

    score -= conditions.iter().map(|c| severity_penalty(c.severity)).sum::<i32>();

    score -= if features.oiliness > 70.0 {
        15
    } else if features.oiliness > 60.0 {
        8
    } else if features.oiliness < 35.0 {
        12
    } else {
        0
    };

    score -= if features.dandruff_level > 8.0 {
        15
    } else if features.dandruff_level > 4.0 {
        8
    } else {
        0
    };

    score -= if features.inflammation_level > 20.0 {
        25
    } else if features.inflammation_level > 10.0 {
        12
    } else {
        0
    };

    score -= if features.hair_density < 15.0 {
        20
    } else if features.hair_density < 25.0 {
        10
    } else {
        0
    };

    score -= if features.texture_quality < 20.0 {
        15
    } else if features.texture_quality < 35.0 {
        8
    } else {
        0
    };

    score.clamp(0, 100) as u8
}

/// Confidence in the analysis itself, from image quality only (60..=95)
pub fn calculate_confidence(features: &FeatureSet) -> f64 {
    let mut confidence: f64 = 70.0;

    confidence += if features.sharpness > 100.0 {
        15.0
    } else if features.sharpness > 50.0 {
        10.0
    } else {
        -10.0
    };

    if features.contrast > 40.0 {
        confidence += 10.0;
    } else if features.contrast < 20.0 {
        confidence -= 10.0;
    }

    if features.texture_quality > 40.0 {
        confidence += 5.0;
    }

    confidence.clamp(60.0, 95.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::ConditionKind;
    use assert_approx_eq::assert_approx_eq;

    fn nominal() -> FeatureSet {
        FeatureSet {
            oiliness: 50.0,
            hair_density: 40.0,
            texture_quality: 50.0,
            ..FeatureSet::default()
        }
    }

    #[test]
    fn nominal_scores_full_marks() {
        assert_eq!(calculate_health_score(&nominal(), &[], &[]), 100);
    }

    #[test]
    fn condition_penalties_by_severity() {
        let conditions = vec![
            Condition::new(ConditionKind::Psoriasis, Severity::Severe, 70),
            Condition::new(ConditionKind::Folliculitis, Severity::Moderate, 65),
            Condition::new(ConditionKind::AndrogeneticAlopecia, Severity::Early, 70),
            Condition::new(ConditionKind::AndrogeneticAlopecia, Severity::Intermediate, 70),
        ];
        assert_eq!(calculate_health_score(&nominal(), &[], &conditions), 100 - 30 - 20 - 12);
    }

    #[test]
    fn feature_bands_stack_and_clamp() {
        let f = FeatureSet {
            oiliness: 80.0,
            dandruff_level: 9.0,
            inflammation_level: 25.0,
            hair_density: 5.0,
            texture_quality: 10.0,
            ..FeatureSet::default()
        };
        // 15 + 15 + 25 + 20 + 15
        assert_eq!(calculate_health_score(&f, &[], &[]), 10);

        let many: Vec<_> = (0..5)
            .map(|_| Condition::new(ConditionKind::Psoriasis, Severity::Severe, 70))
            .collect();
        assert_eq!(calculate_health_score(&f, &[], &many), 0);
    }

    #[test]
    fn low_oiliness_is_penalised() {
        let f = FeatureSet { oiliness: 30.0, ..nominal() };
        assert_eq!(calculate_health_score(&f, &[], &[]), 88);
    }

    #[test]
    fn confidence_tiers_and_clamp() {
        let sharp = FeatureSet { sharpness: 150.0, contrast: 50.0, texture_quality: 50.0, ..FeatureSet::default() };
        assert_approx_eq!(calculate_confidence(&sharp), 95.0);

        let blurry = FeatureSet { sharpness: 10.0, contrast: 10.0, ..FeatureSet::default() };
        assert_approx_eq!(calculate_confidence(&blurry), 60.0);

        let middling = FeatureSet { sharpness: 60.0, contrast: 30.0, ..FeatureSet::default() };
        assert_approx_eq!(calculate_confidence(&middling), 80.0);
    }
}
