// src/concerns.rs - Advisory notes from coarse feature bands

use crate::feature_extraction::FeatureSet;

pub const HEALTHY_MESSAGE: &str = "✅ Overall scalp condition looks healthy";
pub const KEEP_CARE_MESSAGE: &str = "💡 Keep up your current care routine";

/// Two-tier threshold checks in a fixed order: oil, dryness, dandruff,
/// redness, density, texture, sharpness, uniformity.
pub fn detect_concerns(features: &FeatureSet) -> Vec<String> {
    let mut concerns = Vec::new();
    let mut note = |text: &str| concerns.push(text.to_string());

    if features.oiliness > 70.0 {
        note("⚠️ Excessive sebum production, pores may clog");
    } else if features.oiliness > 60.0 {
        note("⚡ Slightly excessive sebum");
    }

    if features.brightness < 100.0 {
        note("⚠️ Severely dry scalp, needs deep hydration");
    } else if features.brightness < 120.0 {
        note("⚡ Scalp on the dry side, consider moisturising products");
    }

    if features.dandruff_level > 8.0 {
        note("⚠️ Visible dandruff, an anti-dandruff shampoo is advised");
    } else if features.dandruff_level > 4.0 {
        note("⚡ Mild signs of dandruff");
    }

    if features.redness_level > 15.0 {
        note("⚠️ Inflammation or swelling detected, a medical check is advised");
    } else if features.redness_level > 8.0 {
        note("⚡ Slight redness, possibly mild sensitivity");
    }

    if features.hair_density < 15.0 {
        note("⚠️ Sparse hair, signs of hair loss");
    } else if features.hair_density < 25.0 {
        note("⚡ Hair density on the low side, strengthen care");
    }

    if features.texture_quality < 20.0 {
        note("⚠️ Poor hair quality, strands barely visible");
    } else if features.texture_quality < 35.0 {
        note("⚡ Average hair quality, room for improvement");
    }

    if features.sharpness < 50.0 {
        note("📷 Low image sharpness may affect accuracy");
    }

    if features.color_uniformity < 50.0 {
        note("⚡ Uneven scalp colour, possibly a local problem");
    }

    if concerns.is_empty() {
        concerns.push(HEALTHY_MESSAGE.to_string());
        concerns.push(KEEP_CARE_MESSAGE.to_string());
    }

    concerns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nominal() -> FeatureSet {
        FeatureSet {
            oiliness: 50.0,
            brightness: 150.0,
            hair_density: 40.0,
            texture_quality: 50.0,
            sharpness: 200.0,
            color_uniformity: 80.0,
            ..FeatureSet::default()
        }
    }

    #[test]
    fn nominal_features_are_healthy() {
        assert_eq!(detect_concerns(&nominal()), vec![HEALTHY_MESSAGE, KEEP_CARE_MESSAGE]);
    }

    #[test]
    fn tiers_are_exclusive_per_feature() {
        let f = FeatureSet { oiliness: 75.0, ..nominal() };
        let concerns = detect_concerns(&f);
        assert_eq!(concerns.len(), 1);
        assert!(concerns[0].starts_with("⚠️"));

        let f = FeatureSet { oiliness: 65.0, ..nominal() };
        assert!(detect_concerns(&f)[0].starts_with("⚡"));
    }

    #[test]
    fn order_is_fixed() {
        let f = FeatureSet {
            color_uniformity: 10.0,
            sharpness: 10.0,
            dandruff_level: 9.0,
            oiliness: 71.0,
            ..nominal()
        };
        let concerns = detect_concerns(&f);
        assert_eq!(concerns.len(), 4);
        assert!(concerns[0].contains("sebum"));
        assert!(concerns[1].contains("dandruff"));
        assert!(concerns[2].starts_with("📷"));
        assert!(concerns[3].contains("colour"));
    }
}
