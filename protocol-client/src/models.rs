use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Format of `analysis_timestamp` as produced by the backend.
pub const ANALYSIS_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Structured content extracted from a clinical protocol document.
///
/// Unknown fields are kept in `extra` so that exporting a result posts back
/// exactly what the server sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub protocol_summary: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub main_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drugs: Option<Vec<Drug>>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub analysis_timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisResult {
    /// Drugs in response order; empty when the field was absent.
    pub fn drugs(&self) -> &[Drug] {
        self.drugs.as_deref().unwrap_or_default()
    }

    /// `true` when the body explicitly reports a failed analysis.
    pub fn is_rejected(&self) -> bool {
        self.success == Some(false)
    }

    /// Parsed `analysis_timestamp`, if present and well formed.
    pub fn analyzed_at(&self) -> Option<NaiveDateTime> {
        self.analysis_timestamp
            .as_deref()
            .and_then(|ts| NaiveDateTime::parse_from_str(ts, ANALYSIS_TIMESTAMP_FORMAT).ok())
    }
}

/// One extracted medication record. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drug {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub inn_english: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub inn_russian: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub indication: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub target_condition: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Drug {
    /// Name to use for literature lookups: the English INN when known.
    pub fn search_name(&self) -> Option<&str> {
        non_blank(self.inn_english.as_deref()).or_else(|| non_blank(self.name.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResponse {
    pub pdf_url: String,
}

/// Literature lookup payload. The shape is owned by the backend; every field
/// defaults so any JSON object decodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchResults {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pubmed: Vec<PubMedArticle>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub clinical_trials: Vec<ClinicalTrial>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fda: Vec<FdaApplication>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResearchResults {
    pub fn is_empty(&self) -> bool {
        self.pubmed.is_empty() && self.clinical_trials.is_empty() && self.fda.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PubMedArticle {
    #[serde(deserialize_with = "lenient_or_empty")]
    pub pmid: String,
    #[serde(deserialize_with = "lenient_or_empty")]
    pub title: String,
    #[serde(deserialize_with = "lenient_or_empty")]
    pub authors: String,
    #[serde(deserialize_with = "lenient_or_empty")]
    pub journal: String,
    #[serde(deserialize_with = "lenient_or_empty")]
    pub year: String,
    #[serde(rename = "type", deserialize_with = "lenient_or_empty")]
    pub study_type: String,
    #[serde(deserialize_with = "lenient_or_empty")]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClinicalTrial {
    #[serde(deserialize_with = "lenient_or_empty")]
    pub nct_id: String,
    #[serde(deserialize_with = "lenient_or_empty")]
    pub title: String,
    #[serde(deserialize_with = "lenient_or_empty")]
    pub status: String,
    #[serde(deserialize_with = "lenient_or_empty")]
    pub phase: String,
    #[serde(deserialize_with = "lenient_or_empty")]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FdaApplication {
    #[serde(deserialize_with = "lenient_or_empty")]
    pub application_number: String,
    #[serde(deserialize_with = "lenient_or_empty")]
    pub sponsor_name: String,
    #[serde(deserialize_with = "lenient_or_empty")]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub services: BTreeMap<String, bool>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Returns the value when it holds something other than whitespace.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accepts any JSON value; `null` becomes `None`. LLM-produced payloads
/// occasionally emit `"dosage": 10` or `"indication": ["stroke", "MI"]`.
/// Arrays are joined with ", ", objects kept as their JSON text.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(flatten_value))
}

fn flatten_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(flatten_value)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => Some(other.to_string()),
    }
}

/// [`lenient_string`] for fields that are plain `String`s.
fn lenient_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_string(deserializer).map(Option::unwrap_or_default)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_fields_stay_absent() {
        let result: AnalysisResult = serde_json::from_value(json!({
            "main_condition": "Hypertension",
            "drugs": [{ "name": "Lisinopril", "dosage": "10mg" }]
        }))
        .unwrap();

        assert_eq!(result.main_condition.as_deref(), Some("Hypertension"));
        assert!(result.protocol_summary.is_none());

        let drug = &result.drugs()[0];
        assert_eq!(drug.name.as_deref(), Some("Lisinopril"));
        assert!(drug.route.is_none());
        assert!(drug.frequency.is_none());
    }

    #[test]
    fn test_unknown_fields_survive_reserialization() {
        let body = json!({
            "success": true,
            "protocol_summary": "Summary",
            "drugs": [{ "name": "Aspirin", "innEnglish": "acetylsalicylic acid", "evidence": 3 }],
            "analysis_timestamp": "20240105_134501",
            "source_pages": [1, 2]
        });

        let result: AnalysisResult = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(result.extra.get("source_pages"), Some(&json!([1, 2])));
        assert_eq!(serde_json::to_value(&result).unwrap(), body);
    }

    #[test]
    fn test_numeric_fields_are_read_as_strings() {
        let drug: Drug = serde_json::from_value(json!({ "dosage": 10, "route": null })).unwrap();
        assert_eq!(drug.dosage.as_deref(), Some("10"));
        assert!(drug.route.is_none());
    }

    #[test]
    fn test_structured_drug_fields_keep_the_analysis() {
        let result: AnalysisResult = serde_json::from_value(json!({
            "drugs": [
                { "name": "Lisinopril", "dosage": "10mg" },
                {
                    "name": "Aspirin",
                    "indication": ["stroke", "MI"],
                    "dosage": { "amount": 75, "unit": "mg" }
                }
            ]
        }))
        .unwrap();

        assert_eq!(result.drugs().len(), 2);
        let aspirin = &result.drugs()[1];
        assert_eq!(aspirin.indication.as_deref(), Some("stroke, MI"));
        assert_eq!(aspirin.dosage.as_deref(), Some(r#"{"amount":75,"unit":"mg"}"#));
    }

    #[test]
    fn test_analyzed_at_parses_backend_format() {
        let result = AnalysisResult {
            analysis_timestamp: Some("20240105_134501".to_string()),
            ..Default::default()
        };
        let ts = result.analyzed_at().unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-05 13:45:01");

        let garbled = AnalysisResult {
            analysis_timestamp: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(garbled.analyzed_at().is_none());
    }

    #[test]
    fn test_search_name_prefers_inn() {
        let drug = Drug {
            name: Some("Лизиноприл".to_string()),
            inn_english: Some("lisinopril".to_string()),
            ..Default::default()
        };
        assert_eq!(drug.search_name(), Some("lisinopril"));

        let unnamed = Drug {
            inn_english: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(unnamed.search_name(), None);
    }

    #[test]
    fn test_research_payload_defaults() {
        let research: ResearchResults = serde_json::from_value(json!({
            "pubmed": [{ "pmid": "123", "title": "Trial", "type": "RCT" }]
        }))
        .unwrap();

        assert_eq!(research.pubmed[0].study_type, "RCT");
        assert!(research.clinical_trials.is_empty());
        assert!(!research.is_empty());
    }

    #[test]
    fn test_null_research_fields_do_not_hide_hits() {
        let research: ResearchResults = serde_json::from_value(json!({
            "pubmed": [{ "pmid": "1", "title": "T", "journal": null, "year": 2021 }],
            "clinical_trials": null,
            "fda": [{ "applicationNumber": "NDA019777", "sponsorName": null }]
        }))
        .unwrap();

        assert_eq!(research.pubmed[0].title, "T");
        assert_eq!(research.pubmed[0].journal, "");
        assert_eq!(research.pubmed[0].year, "2021");
        assert!(research.clinical_trials.is_empty());
        assert_eq!(research.fda[0].application_number, "NDA019777");
        assert_eq!(research.fda[0].sponsor_name, "");
    }
}
