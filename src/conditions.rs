// src/conditions.rs - Rule table for scalp condition diagnosis

use serde::{Deserialize, Serialize};

use crate::feature_extraction::FeatureSet;

/// Severity grades. Androgenetic alopecia uses the staging labels
/// (early / intermediate / advanced) instead of mild / moderate / severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[serde(alias = "轻度", alias = "Mild")]
    Mild,
    #[serde(alias = "中度", alias = "Moderate")]
    Moderate,
    #[serde(alias = "重度", alias = "Severe")]
    Severe,
    #[serde(alias = "早期", alias = "Early")]
    Early,
    #[serde(alias = "中期", alias = "Intermediate")]
    Intermediate,
    #[serde(alias = "晚期", alias = "Advanced")]
    Advanced,
}

impl Severity {
    /// Parse an English or Chinese severity label
    pub fn parse(label: &str) -> Option<Severity> {
        match label.trim().to_lowercase().as_str() {
            "mild" | "轻度" => Some(Severity::Mild),
            "moderate" | "中度" => Some(Severity::Moderate),
            "severe" | "重度" => Some(Severity::Severe),
            "early" | "早期" => Some(Severity::Early),
            "intermediate" | "中期" => Some(Severity::Intermediate),
            "advanced" | "晚期" => Some(Severity::Advanced),
            _ => None,
        }
    }

    pub fn label_cn(self) -> &'static str {
        match self {
            Severity::Mild => "轻度",
            Severity::Moderate => "中度",
            Severity::Severe => "重度",
            Severity::Early => "早期",
            Severity::Intermediate => "中期",
            Severity::Advanced => "晚期",
        }
    }

    pub fn label_en(self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
            Severity::Early => "early",
            Severity::Intermediate => "intermediate",
            Severity::Advanced => "advanced",
        }
    }

    pub fn is_severe(self) -> bool {
        matches!(self, Severity::Severe | Severity::Advanced)
    }

    pub fn is_moderate(self) -> bool {
        matches!(self, Severity::Moderate | Severity::Intermediate)
    }
}

/// The conditions the local rules can diagnose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    AlopeciaAreata,
    AndrogeneticAlopecia,
    SeborrheicDermatitis,
    Folliculitis,
    Psoriasis,
    TineaCapitis,
    ContactDermatitis,
    TelogenEffluvium,
}

impl ConditionKind {
    pub const ALL: [ConditionKind; 8] = [
        ConditionKind::AlopeciaAreata,
        ConditionKind::AndrogeneticAlopecia,
        ConditionKind::SeborrheicDermatitis,
        ConditionKind::Folliculitis,
        ConditionKind::Psoriasis,
        ConditionKind::TineaCapitis,
        ConditionKind::ContactDermatitis,
        ConditionKind::TelogenEffluvium,
    ];

    pub fn name_en(self) -> &'static str {
        match self {
            ConditionKind::AlopeciaAreata => "Alopecia Areata",
            ConditionKind::AndrogeneticAlopecia => "Androgenetic Alopecia",
            ConditionKind::SeborrheicDermatitis => "Seborrheic Dermatitis",
            ConditionKind::Folliculitis => "Folliculitis",
            ConditionKind::Psoriasis => "Psoriasis",
            ConditionKind::TineaCapitis => "Tinea Capitis",
            ConditionKind::ContactDermatitis => "Contact Dermatitis",
            ConditionKind::TelogenEffluvium => "Telogen Effluvium",
        }
    }

    pub fn name_cn(self) -> &'static str {
        match self {
            ConditionKind::AlopeciaAreata => "斑秃",
            ConditionKind::AndrogeneticAlopecia => "雄激素性脱发",
            ConditionKind::SeborrheicDermatitis => "脂溢性皮炎",
            ConditionKind::Folliculitis => "毛囊炎",
            ConditionKind::Psoriasis => "银屑病",
            ConditionKind::TineaCapitis => "头癣",
            ConditionKind::ContactDermatitis => "接触性皮炎",
            ConditionKind::TelogenEffluvium => "休止期脱发",
        }
    }

    pub fn common_name(self) -> &'static str {
        match self {
            ConditionKind::AlopeciaAreata => "鬼剃头",
            ConditionKind::AndrogeneticAlopecia => "男性/女性型脱发",
            ConditionKind::SeborrheicDermatitis => "脂溢性湿疹",
            ConditionKind::Folliculitis => "毛囊感染",
            ConditionKind::Psoriasis => "牛皮癣",
            ConditionKind::TineaCapitis => "真菌性脱发",
            ConditionKind::ContactDermatitis => "过敏性皮炎",
            ConditionKind::TelogenEffluvium => "弥漫性脱发",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            ConditionKind::AlopeciaAreata | ConditionKind::Folliculitis => "🔴",
            ConditionKind::AndrogeneticAlopecia => "📉",
            ConditionKind::SeborrheicDermatitis => "💛",
            ConditionKind::Psoriasis => "🔶",
            ConditionKind::TineaCapitis => "🍄",
            ConditionKind::ContactDermatitis => "⚠️",
            ConditionKind::TelogenEffluvium => "💤",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ConditionKind::AlopeciaAreata => {
                "Round or oval patches of hair loss with sharply defined edges"
            }
            ConditionKind::AndrogeneticAlopecia => {
                "Hair gradually thins and softens, with a receding hairline or thinning crown"
            }
            ConditionKind::SeborrheicDermatitis => {
                "Greasy, reddened scalp with yellowish scale and dandruff"
            }
            ConditionKind::Folliculitis => {
                "Red papules or pustules around hair follicles, possibly painful or itchy"
            }
            ConditionKind::Psoriasis => {
                "Well-demarcated red plaques covered with silvery-white scale"
            }
            ConditionKind::TineaCapitis => {
                "Fungal infection with scaling and hair loss, sometimes leaving black dots"
            }
            ConditionKind::ContactDermatitis => {
                "Red, itchy scalp after contact with hair dye, shampoo or other allergens"
            }
            ConditionKind::TelogenEffluvium => {
                "Diffuse thinning without distinct bald patches, often after stress, illness or poor nutrition"
            }
        }
    }

    pub fn symptoms(self) -> &'static [&'static str] {
        match self {
            ConditionKind::AlopeciaAreata => &["circular bald patches", "smooth scalp inside the patch"],
            ConditionKind::AndrogeneticAlopecia => &["receding hairline", "low hair density"],
            ConditionKind::SeborrheicDermatitis => &["oily scalp", "yellow scale", "dandruff"],
            ConditionKind::Folliculitis => &["red follicular papules", "scattered redness"],
            ConditionKind::Psoriasis => &["red plaques", "silvery scale"],
            ConditionKind::TineaCapitis => &["scaling", "dandruff", "hair breakage"],
            ConditionKind::ContactDermatitis => &["redness", "uneven colouring"],
            ConditionKind::TelogenEffluvium => &["diffuse thinning", "weak hair texture"],
        }
    }

    /// Match a condition name in either language, ignoring case
    pub fn from_name(name: &str) -> Option<ConditionKind> {
        let name = name.trim().to_lowercase();
        ConditionKind::ALL.into_iter().find(|kind| {
            name == kind.name_en().to_lowercase()
                || name == kind.name_cn()
                || name == kind.common_name()
        })
    }
}

/// Marks conditions that did not come from the primary source of a
/// merged result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionSource {
    LocalAnalysis,
}

/// A diagnosed condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub name_cn: String,
    pub name_en: String,
    pub common_name: String,
    pub severity: Severity,
    /// 0..=100
    pub confidence: u8,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<String>,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ConditionSource>,
}

impl Condition {
    pub fn new(kind: ConditionKind, severity: Severity, confidence: u8) -> Self {
        Self {
            name_cn: kind.name_cn().to_string(),
            name_en: kind.name_en().to_string(),
            common_name: kind.common_name().to_string(),
            severity,
            confidence: confidence.min(100),
            description: kind.description().to_string(),
            symptoms: kind.symptoms().iter().map(|s| s.to_string()).collect(),
            icon: kind.icon().to_string(),
            source: None,
        }
    }

    pub fn kind(&self) -> Option<ConditionKind> {
        ConditionKind::from_name(&self.name_en).or_else(|| ConditionKind::from_name(&self.name_cn))
    }
}

/// One diagnosis rule: all trigger thresholds must hold, then the severity
/// and confidence are read off the same features.
pub struct ConditionRule {
    pub kind: ConditionKind,
    pub applies: fn(&FeatureSet) -> bool,
    pub severity: fn(&FeatureSet) -> Severity,
    pub confidence: fn(&FeatureSet) -> u8,
}

impl ConditionRule {
    pub fn evaluate(&self, features: &FeatureSet) -> Option<Condition> {
        (self.applies)(features).then(|| {
            Condition::new(self.kind, (self.severity)(features), (self.confidence)(features))
        })
    }
}

/// Evaluated in order; rules are independent and may all fire.
pub static RULES: [ConditionRule; 8] = [
    ConditionRule {
        kind: ConditionKind::AlopeciaAreata,
        // Either signal alone is enough
        applies: |f| f.bald_spots_count > 0 || f.circular_pattern > 0,
        severity: |f| {
            if f.bald_spots_size > 15.0 {
                Severity::Severe
            } else if f.bald_spots_size > 5.0 {
                Severity::Moderate
            } else {
                Severity::Mild
            }
        },
        confidence: |f| if f.circular_pattern > 0 { 75 } else { 60 },
    },
    ConditionRule {
        kind: ConditionKind::AndrogeneticAlopecia,
        applies: |f| f.hair_density < 20.0 && f.hairline_recession > 15.0,
        severity: |f| {
            if f.hair_density < 10.0 {
                Severity::Advanced
            } else if f.hair_density < 15.0 {
                Severity::Intermediate
            } else {
                Severity::Early
            }
        },
        confidence: |_| 70,
    },
    ConditionRule {
        kind: ConditionKind::SeborrheicDermatitis,
        applies: |f| f.oiliness > 65.0 && f.yellow_patches > 8.0,
        severity: |f| {
            if f.inflammation_level > 20.0 {
                Severity::Severe
            } else if f.dandruff_level > 8.0 && f.redness_level > 10.0 {
                Severity::Moderate
            } else {
                Severity::Mild
            }
        },
        confidence: |_| 80,
    },
    ConditionRule {
        kind: ConditionKind::Folliculitis,
        applies: |f| f.folliculitis_points > 5 && f.redness_level > 8.0,
        severity: |f| {
            if f.inflammation_level > 18.0 {
                Severity::Severe
            } else if f.folliculitis_points > 15 {
                Severity::Moderate
            } else {
                Severity::Mild
            }
        },
        confidence: |_| 65,
    },
    ConditionRule {
        kind: ConditionKind::Psoriasis,
        applies: |f| f.red_patches > 10.0 && f.scalp_scales > 12.0,
        severity: |f| {
            if f.scalp_scales > 25.0 {
                Severity::Severe
            } else if f.red_patches > 20.0 {
                Severity::Moderate
            } else {
                Severity::Mild
            }
        },
        confidence: |_| 70,
    },
    ConditionRule {
        kind: ConditionKind::TineaCapitis,
        applies: |f| f.scalp_scales > 15.0 && f.dandruff_level > 10.0 && f.hair_density < 25.0,
        severity: |f| {
            if f.inflammation_level > 15.0 {
                Severity::Severe
            } else if f.bald_spots_count > 0 {
                Severity::Moderate
            } else {
                Severity::Mild
            }
        },
        confidence: |_| 60,
    },
    ConditionRule {
        kind: ConditionKind::ContactDermatitis,
        applies: |f| f.redness_level > 12.0 && f.color_uniformity < 50.0,
        severity: |f| {
            if f.inflammation_level > 15.0 {
                Severity::Moderate
            } else {
                Severity::Mild
            }
        },
        confidence: |_| 55,
    },
    ConditionRule {
        kind: ConditionKind::TelogenEffluvium,
        // No visible hair at all is not diffuse thinning
        applies: |f| {
            f.hair_density > 0.0
                && f.hair_density < 25.0
                && f.texture_quality < 30.0
                && f.bald_spots_count == 0
        },
        severity: |_| Severity::Moderate,
        confidence: |_| 50,
    },
];

/// Run every rule against the features
pub fn diagnose_conditions(features: &FeatureSet) -> Vec<Condition> {
    RULES.iter().filter_map(|rule| rule.evaluate(features)).collect()
}
