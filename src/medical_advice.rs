// src/medical_advice.rs - Urgency and recommendations from diagnoses

use serde::{Deserialize, Serialize};

use crate::conditions::{Condition, ConditionKind};
use crate::feature_extraction::FeatureSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Normal,
    Moderate,
    Urgent,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::Moderate => "moderate",
            Urgency::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalAdvice {
    pub urgency: Urgency,
    pub see_doctor: bool,
    pub recommendations: Vec<String>,
}

const CONSULT_DERMATOLOGIST: &str = "🏥 Consult a dermatologist or trichologist soon";

/// Per-condition recommendations, appended in table order
const ADVICE: [(ConditionKind, &[&str]); 8] = [
    (
        ConditionKind::AlopeciaAreata,
        &[
            "💊 Alopecia areata may need topical steroids or immunomodulating treatment",
            "🧪 Consider thyroid function and autoimmune screening",
        ],
    ),
    (
        ConditionKind::SeborrheicDermatitis,
        &[
            "🧴 Use a medicated shampoo with ketoconazole or selenium sulfide",
            "🚫 Avoid oily hair-care products",
        ],
    ),
    (
        ConditionKind::Psoriasis,
        &[
            "💊 Topical steroids or vitamin D analogues may be needed",
            "🔬 Get a professional dermatological assessment",
        ],
    ),
    (
        ConditionKind::TineaCapitis,
        &[
            "🍄 Oral antifungal treatment is required; topical products alone are limited",
            "🧼 Keep the scalp clean and dry, disinfect towels and combs",
        ],
    ),
    (
        ConditionKind::Folliculitis,
        &[
            "💧 Use an antibacterial shampoo and keep the scalp clean",
            "🚫 Avoid scratching to keep the infection from spreading",
        ],
    ),
    (
        ConditionKind::AndrogeneticAlopecia,
        &["💊 Topical minoxidil is the usual first-line option, ask a doctor before starting"],
    ),
    (
        ConditionKind::ContactDermatitis,
        &[
            "🚫 Stop using recently introduced dyes or hair products",
            "🧴 Switch to fragrance-free, hypoallergenic products",
        ],
    ),
    (
        ConditionKind::TelogenEffluvium,
        &["😴 Shedding usually settles once stress, illness or diet issues are addressed"],
    ),
];

/// Urgent if any condition is severe, moderate if any is moderate,
/// otherwise normal. A doctor visit is advised whenever urgency is raised.
pub fn generate_medical_advice(conditions: &[Condition], _features: &FeatureSet) -> MedicalAdvice {
    let urgency = if conditions.iter().any(|c| c.severity.is_severe()) {
        Urgency::Urgent
    } else if conditions.iter().any(|c| c.severity.is_moderate()) {
        Urgency::Moderate
    } else {
        Urgency::Normal
    };
    let see_doctor = urgency != Urgency::Normal;

    let mut recommendations = Vec::new();
    if see_doctor {
        recommendations.push(CONSULT_DERMATOLOGIST.to_string());
    }

    let kinds: Vec<ConditionKind> = conditions.iter().filter_map(Condition::kind).collect();
    for (kind, lines) in ADVICE.iter() {
        if kinds.contains(kind) {
            recommendations.extend(lines.iter().map(|line| line.to_string()));
        }
    }

    if conditions.is_empty() {
        recommendations.push("✅ No obvious scalp condition detected".to_string());
        recommendations.push("💡 Keep up good scalp care habits".to_string());
    }

    MedicalAdvice { urgency, see_doctor, recommendations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::Severity;

    #[test]
    fn no_conditions_is_normal() {
        let advice = generate_medical_advice(&[], &FeatureSet::default());
        assert_eq!(advice.urgency, Urgency::Normal);
        assert!(!advice.see_doctor);
        assert_eq!(advice.recommendations.len(), 2);
    }

    #[test]
    fn severe_condition_is_urgent() {
        let conditions = vec![
            Condition::new(ConditionKind::Folliculitis, Severity::Moderate, 65),
            Condition::new(ConditionKind::Psoriasis, Severity::Severe, 70),
        ];
        let advice = generate_medical_advice(&conditions, &FeatureSet::default());

        assert_eq!(advice.urgency, Urgency::Urgent);
        assert!(advice.see_doctor);
        assert_eq!(advice.recommendations[0], CONSULT_DERMATOLOGIST);
        // Table order puts psoriasis before folliculitis
        assert!(advice.recommendations[1].contains("vitamin D"));
        assert_eq!(advice.recommendations.len(), 5);
    }

    #[test]
    fn staging_labels_map_to_urgency() {
        let intermediate = vec![Condition::new(ConditionKind::AndrogeneticAlopecia, Severity::Intermediate, 70)];
        assert_eq!(generate_medical_advice(&intermediate, &FeatureSet::default()).urgency, Urgency::Moderate);

        let advanced = vec![Condition::new(ConditionKind::AndrogeneticAlopecia, Severity::Advanced, 70)];
        assert_eq!(generate_medical_advice(&advanced, &FeatureSet::default()).urgency, Urgency::Urgent);
    }

    #[test]
    fn mild_condition_keeps_normal_urgency() {
        let conditions = vec![Condition::new(ConditionKind::ContactDermatitis, Severity::Mild, 55)];
        let advice = generate_medical_advice(&conditions, &FeatureSet::default());
        assert_eq!(advice.urgency, Urgency::Normal);
        assert!(!advice.see_doctor);
        assert_eq!(advice.recommendations.len(), 2);
    }

    #[test]
    fn every_condition_has_specific_advice() {
        for kind in ConditionKind::ALL {
            let conditions = vec![Condition::new(kind, Severity::Mild, 55)];
            let advice = generate_medical_advice(&conditions, &FeatureSet::default());
            assert!(!advice.recommendations.is_empty(), "{:?}", kind);
            assert!(!advice.recommendations.iter().any(|r| r.contains("No obvious")));
        }
    }
}
