// src/scalp_type.rs - Four-way scalp type decision

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::feature_extraction::FeatureSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalpType {
    Oily,
    Dry,
    Sensitive,
    Normal,
}

impl ScalpType {
    pub fn name_en(self) -> &'static str {
        match self {
            ScalpType::Oily => "Oily Scalp",
            ScalpType::Dry => "Dry Scalp",
            ScalpType::Sensitive => "Sensitive Scalp",
            ScalpType::Normal => "Normal Scalp",
        }
    }

    pub fn name_cn(self) -> &'static str {
        match self {
            ScalpType::Oily => "油性头皮",
            ScalpType::Dry => "干性头皮",
            ScalpType::Sensitive => "敏感头皮",
            ScalpType::Normal => "正常头皮",
        }
    }

    /// Everyday care tips for this scalp type
    pub fn care_tips(self) -> &'static [&'static str] {
        match self {
            ScalpType::Oily => &[
                "🧴 Wash every 1-2 days to keep the scalp clean",
                "💧 Use an oil-control, clarifying shampoo",
                "🚫 Keep conditioner off the scalp",
                "🌡️ Rinse with warm rather than hot water",
                "🥗 Cut down on fried and spicy food",
                "😴 Keep a regular sleep schedule",
            ],
            ScalpType::Dry => &[
                "🧴 Wash every 3-4 days and avoid over-cleansing",
                "💧 Use moisturising shampoo",
                "✨ Apply a hair mask once or twice a week",
                "🌿 Finish with a scalp serum or light oil",
                "💦 Drink at least 2 litres of water a day",
                "🏠 Limit time in air-conditioned rooms",
            ],
            ScalpType::Sensitive => &[
                "🧴 Choose mild, non-irritating products",
                "🌿 Prefer silicone-free formulas with natural ingredients",
                "🚫 Avoid frequent perming and colouring",
                "🌡️ Rinse with lukewarm water",
                "⚠️ See a doctor if redness or itching persists",
                "🧘 Reduce stress",
            ],
            ScalpType::Normal => &[
                "🧴 Wash every 2-3 days",
                "💧 Use a gentle shampoo",
                "🔄 Rotate products now and then",
                "🏃 Exercise to support circulation",
                "🥗 Eat a balanced diet",
                "😊 Keep stress in check",
            ],
        }
    }
}

impl fmt::Display for ScalpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name_cn(), self.name_en())
    }
}

/// First matching rule wins; the confidence is fixed per branch.
pub fn classify_scalp_type(features: &FeatureSet) -> (ScalpType, u8) {
    if features.oiliness > 65.0 && features.brightness > 150.0 {
        (ScalpType::Oily, 85)
    } else if features.oiliness < 40.0 && features.brightness < 120.0 {
        (ScalpType::Dry, 80)
    } else if features.redness_level > 12.0 {
        (ScalpType::Sensitive, 75)
    } else {
        (ScalpType::Normal, 90)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(oiliness: f64, brightness: f64, redness_level: f64) -> FeatureSet {
        FeatureSet { oiliness, brightness, redness_level, ..FeatureSet::default() }
    }

    #[test]
    fn branches_in_priority_order() {
        assert_eq!(classify_scalp_type(&features(70.0, 160.0, 50.0)), (ScalpType::Oily, 85));
        assert_eq!(classify_scalp_type(&features(30.0, 100.0, 50.0)), (ScalpType::Dry, 80));
        assert_eq!(classify_scalp_type(&features(50.0, 130.0, 13.0)), (ScalpType::Sensitive, 75));
        assert_eq!(classify_scalp_type(&features(50.0, 130.0, 12.0)), (ScalpType::Normal, 90));
    }

    #[test]
    fn oily_needs_both_conditions() {
        assert_eq!(classify_scalp_type(&features(70.0, 150.0, 0.0)).0, ScalpType::Normal);
    }

    #[test]
    fn display_carries_both_names() {
        assert_eq!(ScalpType::Dry.to_string(), "干性头皮 (Dry Scalp)");
        assert_eq!(ScalpType::Sensitive.care_tips().len(), 6);
    }
}
