// src/merge.rs - Combine an externally produced diagnosis with the local one

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::conditions::{Condition, ConditionSource, Severity};
use crate::errors::Result;
use crate::feature_extraction::AnalysisDetails;
use crate::medical_advice::MedicalAdvice;
use crate::pipeline::AnalysisResult;

const DEFAULT_ICON: &str = "🔴";
const LOCAL_CONCERN_PREFIX: &str = "[Local analysis] ";
const LOCAL_CONCERNS_KEPT: usize = 2;

/// A condition as an external service reports it. Every field may be
/// missing or loosely typed; `normalize_condition` fills the gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalCondition {
    #[serde(default, deserialize_with = "loose_text")]
    pub name_cn: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub name_en: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub common_name: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub severity: Option<String>,
    /// Number, numeric string, or anything else
    #[serde(default)]
    pub confidence: Option<Value>,
    #[serde(default, deserialize_with = "loose_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "loose_list")]
    pub symptoms: Vec<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub icon: Option<String>,
}

/// Structured payload of an external analysis. Fields of the wrong type
/// read as absent instead of failing the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalResult {
    /// Present when the external call failed
    #[serde(default, deserialize_with = "loose_text")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub scalp_type: Option<String>,
    #[serde(default, deserialize_with = "loose_conditions")]
    pub conditions: Vec<ExternalCondition>,
    #[serde(default, deserialize_with = "loose_list")]
    pub recommendations: Vec<String>,
    #[serde(default, deserialize_with = "loose_number")]
    pub health_score: Option<f64>,
    #[serde(default, deserialize_with = "loose_flag")]
    pub need_doctor: Option<bool>,
    #[serde(default, deserialize_with = "loose_text")]
    pub analysis_summary: Option<String>,
    #[serde(default)]
    pub confidence: Option<Value>,
}

fn loose_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// A list of strings; a bare string is a list of one
fn loose_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null | Value::Array(_) | Value::Object(_) => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

fn loose_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(numeric(&Value::deserialize(deserializer)?))
}

fn loose_flag<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "是" => Some(true),
            "false" | "no" | "n" | "0" | "否" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// Conditions that are not objects are skipped; a lone object counts as one
fn loose_conditions<'de, D>(deserializer: D) -> std::result::Result<Vec<ExternalCondition>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => Vec::new(),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(condition) => Some(condition),
            Err(e) => {
                warn!("Skipping malformed external condition: {}", e);
                None
            }
        })
        .collect())
}

/// Local result with external findings folded in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedResult {
    pub scalp_type: String,
    pub diagnosed_conditions: Vec<Condition>,
    pub concerns: Vec<String>,
    pub confidence: f64,
    pub health_score: f64,
    pub need_doctor: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_summary: Option<String>,
    pub medical_advice: MedicalAdvice,
    pub details: AnalysisDetails,
}

impl From<&AnalysisResult> for CombinedResult {
    fn from(local: &AnalysisResult) -> Self {
        Self {
            scalp_type: local.scalp_type.to_string(),
            diagnosed_conditions: local.diagnosed_conditions.clone(),
            concerns: local.concerns.clone(),
            confidence: local.confidence,
            health_score: local.health_score as f64,
            need_doctor: local.medical_advice.see_doctor,
            analysis_summary: None,
            medical_advice: local.medical_advice.clone(),
            details: local.details.clone(),
        }
    }
}

/// Read an external result from a JSON file
pub fn load_external_result<P: AsRef<Path>>(path: P) -> Result<ExternalResult> {
    let content = fs::read_to_string(path.as_ref())?;
    let result = serde_json::from_str(&content)?;
    Ok(result)
}

/// Numbers and numeric strings; everything else is `None`
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn is_blank(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

/// Icons for externally named conditions, first substring match wins
const EXTERNAL_ICONS: [(&str, &str); 16] = [
    ("脂溢性皮炎", "🔴"),
    ("seborrheic dermatitis", "🔴"),
    ("银屑病", "🔵"),
    ("psoriasis", "🔵"),
    ("毛囊炎", "🟡"),
    ("folliculitis", "🟡"),
    ("斑秃", "⚪"),
    ("alopecia areata", "⚪"),
    ("脂溢性脱发", "🟠"),
    ("androgenetic alopecia", "🟠"),
    ("头癣", "🟢"),
    ("tinea capitis", "🟢"),
    ("接触性皮炎", "🟣"),
    ("contact dermatitis", "🟣"),
    ("休止期脱发", "⚫"),
    ("telogen effluvium", "⚫"),
];

fn icon_for(name_cn: &str, name_en: &str) -> &'static str {
    let name_cn = name_cn.to_lowercase();
    let name_en = name_en.to_lowercase();
    EXTERNAL_ICONS
        .iter()
        .find(|(key, _)| name_cn.contains(key) || name_en.contains(key))
        .map(|(_, icon)| *icon)
        .unwrap_or(DEFAULT_ICON)
}

/// Back-fill an external condition into a complete `Condition`
pub fn normalize_condition(external: &ExternalCondition) -> Condition {
    let icon = external.icon.clone().unwrap_or_else(|| {
        icon_for(
            external.name_cn.as_deref().unwrap_or(""),
            external.name_en.as_deref().unwrap_or(""),
        )
        .to_string()
    });
    let common_name = external
        .common_name
        .clone()
        .or_else(|| external.name_cn.clone())
        .unwrap_or_else(|| "未知".to_string());

    let severity = match external.severity.as_deref() {
        Some(label) => Severity::parse(label).unwrap_or_else(|| {
            warn!("Unrecognised severity '{}', treating as moderate", label);
            Severity::Moderate
        }),
        None => Severity::Moderate,
    };

    let confidence = if is_blank(&external.confidence) {
        if severity.is_severe() {
            75
        } else if severity == Severity::Moderate {
            60
        } else {
            50
        }
    } else {
        external
            .confidence
            .as_ref()
            .and_then(numeric)
            .map(|c| c.trunc().clamp(0.0, 100.0) as u8)
            .unwrap_or(50)
    };

    Condition {
        name_cn: external.name_cn.clone().unwrap_or_else(|| "未知疾病".to_string()),
        name_en: external.name_en.clone().unwrap_or_else(|| "Unknown Condition".to_string()),
        common_name,
        severity,
        confidence,
        description: external
            .description
            .clone()
            .unwrap_or_else(|| "Details unavailable".to_string()),
        symptoms: external.symptoms.clone(),
        icon,
        source: None,
    }
}

/// Key used to spot the same condition in both results
fn condition_key(condition: &Condition) -> &str {
    if condition.name_en.is_empty() {
        &condition.name_cn
    } else {
        &condition.name_en
    }
}

/// External findings take priority; local ones fill in what is missing.
pub fn merge(external: &ExternalResult, local: &AnalysisResult) -> CombinedResult {
    if let Some(error) = &external.error {
        warn!("External result carries an error ({}), using local analysis only", error);
        return CombinedResult::from(local);
    }

    let mut conditions: Vec<Condition> = external.conditions.iter().map(normalize_condition).collect();
    let external_keys: Vec<String> = conditions.iter().map(|c| condition_key(c).to_string()).collect();

    for condition in &local.diagnosed_conditions {
        if !external_keys.iter().any(|key| key == condition_key(condition)) {
            let mut supplementary = condition.clone();
            supplementary.source = Some(ConditionSource::LocalAnalysis);
            conditions.push(supplementary);
        }
    }

    let mut concerns = external.recommendations.clone();
    concerns.extend(
        local
            .concerns
            .iter()
            .take(LOCAL_CONCERNS_KEPT)
            .map(|c| format!("{}{}", LOCAL_CONCERN_PREFIX, c)),
    );

    // A non-zero external confidence is passed through untouched; only
    // otherwise is it recomputed from the merged conditions.
    let confidence = match external.confidence.as_ref().and_then(numeric) {
        Some(value) if value != 0.0 => value,
        _ if !conditions.is_empty() => {
            let total: f64 = conditions.iter().map(|c| c.confidence as f64).sum();
            (total / conditions.len() as f64).trunc()
        }
        _ => 0.0,
    };

    debug!(
        "Merged {} external and {} local-only conditions",
        external.conditions.len(),
        conditions.len() - external.conditions.len()
    );

    CombinedResult {
        scalp_type: external
            .scalp_type
            .clone()
            .unwrap_or_else(|| local.scalp_type.to_string()),
        diagnosed_conditions: conditions,
        concerns,
        confidence,
        health_score: external.health_score.unwrap_or(local.health_score as f64),
        need_doctor: external.need_doctor.unwrap_or(local.medical_advice.see_doctor),
        analysis_summary: external.analysis_summary.clone(),
        medical_advice: local.medical_advice.clone(),
        details: local.details.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn external_condition(name_en: &str, severity: Option<&str>, confidence: Option<Value>) -> ExternalCondition {
        ExternalCondition {
            name_en: Some(name_en.to_string()),
            severity: severity.map(str::to_string),
            confidence,
            ..ExternalCondition::default()
        }
    }

    #[test]
    fn confidence_backfilled_from_severity() {
        let severe = normalize_condition(&external_condition("X", Some("重度"), None));
        assert_eq!(severe.confidence, 75);
        let advanced = normalize_condition(&external_condition("X", Some("晚期"), Some(json!(0))));
        assert_eq!(advanced.confidence, 75);
        let moderate = normalize_condition(&external_condition("X", Some("moderate"), Some(json!(""))));
        assert_eq!(moderate.confidence, 60);
        let mild = normalize_condition(&external_condition("X", Some("mild"), None));
        assert_eq!(mild.confidence, 50);
    }

    #[test]
    fn confidence_parsed_when_present() {
        let c = normalize_condition(&external_condition("X", None, Some(json!("82.7"))));
        assert_eq!(c.confidence, 82);
        let c = normalize_condition(&external_condition("X", None, Some(json!(140))));
        assert_eq!(c.confidence, 100);
        let c = normalize_condition(&external_condition("X", None, Some(json!("high"))));
        assert_eq!(c.confidence, 50);
    }

    #[test]
    fn missing_fields_get_defaults() {
        let c = normalize_condition(&ExternalCondition::default());
        assert_eq!(c.name_cn, "未知疾病");
        assert_eq!(c.name_en, "Unknown Condition");
        assert_eq!(c.common_name, "未知");
        assert_eq!(c.severity, Severity::Moderate);
        assert_eq!(c.description, "Details unavailable");
        assert_eq!(c.icon, DEFAULT_ICON);
        assert_eq!(c.confidence, 60);
    }

    #[test]
    fn icon_found_by_either_name() {
        let c = normalize_condition(&external_condition("Scalp Psoriasis (plaque)", None, None));
        assert_eq!(c.icon, "🔵");
        let c = normalize_condition(&ExternalCondition {
            name_cn: Some("头癣".to_string()),
            ..ExternalCondition::default()
        });
        assert_eq!(c.icon, "🟢");
        assert_eq!(c.common_name, "头癣");
    }

    #[test]
    fn parses_loose_json_payload() {
        let payload = r#"{
            "scalp_type": "Oily",
            "conditions": [{"name_en": "Folliculitis", "severity": "中度", "confidence": "70"}],
            "recommendations": ["Wash more often"],
            "health_score": 64,
            "need_doctor": true
        }"#;
        let result: ExternalResult = serde_json::from_str(payload).unwrap();
        assert_eq!(result.conditions.len(), 1);
        assert_eq!(result.health_score, Some(64.0));
        assert_eq!(result.error, None);
        assert_eq!(normalize_condition(&result.conditions[0]).confidence, 70);
    }

    #[test]
    fn loosely_typed_fields_are_coerced() {
        let payload = r#"{
            "conditions": [
                {"name_en": "Folliculitis", "severity": "mild", "symptoms": "itching"},
                "not a condition"
            ],
            "recommendations": "Rinse thoroughly",
            "health_score": "72",
            "need_doctor": "yes",
            "scalp_type": 3
        }"#;
        let result: ExternalResult = serde_json::from_str(payload).unwrap();

        assert_eq!(result.conditions.len(), 1);
        assert_eq!(result.conditions[0].symptoms, vec!["itching".to_string()]);
        assert_eq!(result.recommendations, vec!["Rinse thoroughly".to_string()]);
        assert_eq!(result.health_score, Some(72.0));
        assert_eq!(result.need_doctor, Some(true));
        assert_eq!(result.scalp_type.as_deref(), Some("3"));
    }

    #[test]
    fn unusable_fields_read_as_absent() {
        let payload = r#"{"health_score": "n/a", "need_doctor": "maybe", "recommendations": {"a": 1}}"#;
        let result: ExternalResult = serde_json::from_str(payload).unwrap();

        assert_eq!(result.health_score, None);
        assert_eq!(result.need_doctor, None);
        assert!(result.recommendations.is_empty());
    }
}
