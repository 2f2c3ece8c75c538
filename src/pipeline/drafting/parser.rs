//! Strict output parser: model text → typed artifact.
//!
//! The reply must be one bare JSON object. Prose, markdown fences or a JSON body
//! with missing or mistyped fields is a parse failure, and every schema violation
//! is reported rather than just the first.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::types::{ClinicalNote, MedCertDraft};
use crate::models::ArtifactType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Non-empty string.
    Text,
    Bool,
    /// `YYYY-MM-DD` string.
    Date,
    /// Non-negative integer that fits in u32.
    Count,
}

impl FieldKind {
    fn describe(&self) -> &'static str {
        match self {
            Self::Text => "a non-empty string",
            Self::Bool => "a boolean",
            Self::Date => "a YYYY-MM-DD date string",
            Self::Count => "a non-negative integer",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Text => value.as_str().is_some_and(|s| !s.trim().is_empty()),
            Self::Bool => value.is_boolean(),
            Self::Date => value
                .as_str()
                .is_some_and(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()),
            Self::Count => value.as_u64().is_some_and(|n| u32::try_from(n).is_ok()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaField {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Optional fields may be absent or null, but must have the right type when present.
    pub required: bool,
}

const fn field(name: &'static str, kind: FieldKind) -> SchemaField {
    SchemaField { name, kind, required: true }
}

const fn optional(name: &'static str, kind: FieldKind) -> SchemaField {
    SchemaField { name, kind, required: false }
}

pub const CLINICAL_NOTE_SCHEMA: &[SchemaField] = &[
    field("presentingComplaint", FieldKind::Text),
    field("historyOfPresentIllness", FieldKind::Text),
    field("relevantInformation", FieldKind::Text),
    field("certificateDetails", FieldKind::Text),
    field("planAndAdvice", FieldKind::Text),
    field("requiresReview", FieldKind::Bool),
    optional("reviewReason", FieldKind::Text),
];

pub const MED_CERT_SCHEMA: &[SchemaField] = &[
    field("patientName", FieldKind::Text),
    field("certificateType", FieldKind::Text),
    field("startDate", FieldKind::Date),
    field("endDate", FieldKind::Date),
    field("durationDays", FieldKind::Count),
    field("symptomsSummary", FieldKind::Text),
    field("statement", FieldKind::Text),
    field("requiresReview", FieldKind::Bool),
    optional("reviewReason", FieldKind::Text),
];

/// Why a reply could not be accepted as an artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub error: String,
    pub validation_errors: Vec<String>,
}

impl ParseFailure {
    fn new(error: impl Into<String>, validation_errors: Vec<String>) -> Self {
        Self {
            error: error.into(),
            validation_errors,
        }
    }
}

pub fn schema_for(artifact: ArtifactType) -> &'static [SchemaField] {
    match artifact {
        ArtifactType::ClinicalNote => CLINICAL_NOTE_SCHEMA,
        ArtifactType::MedCert => MED_CERT_SCHEMA,
    }
}

pub fn parse_clinical_note(text: &str) -> Result<ClinicalNote, ParseFailure> {
    parse_with_schema(text, ArtifactType::ClinicalNote)
}

pub fn parse_med_cert(text: &str) -> Result<MedCertDraft, ParseFailure> {
    parse_with_schema(text, ArtifactType::MedCert)
}

/// Parse `text` as a bare JSON object, check it against the artifact schema, then deserialize.
pub fn parse_with_schema<T: DeserializeOwned>(
    text: &str,
    artifact: ArtifactType,
) -> Result<T, ParseFailure> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ParseFailure::new("Response is not valid JSON", vec![e.to_string()]))?;

    let Value::Object(object) = &value else {
        return Err(ParseFailure::new(
            "Response is not a JSON object",
            vec![format!("expected an object, found {}", json_type_name(&value))],
        ));
    };

    let violations = check_schema(object, schema_for(artifact));
    if !violations.is_empty() {
        return Err(ParseFailure::new(
            format!("Response does not match the {artifact} schema"),
            violations,
        ));
    }

    serde_json::from_value(value).map_err(|e| {
        ParseFailure::new(
            format!("Response does not match the {artifact} schema"),
            vec![e.to_string()],
        )
    })
}

/// All schema violations in `object`, in schema order.
pub fn check_schema(object: &Map<String, Value>, schema: &[SchemaField]) -> Vec<String> {
    let mut violations = Vec::new();
    for field in schema {
        match object.get(field.name) {
            None | Some(Value::Null) if field.required => {
                violations.push(format!("{}: required field is missing", field.name));
            }
            None | Some(Value::Null) => {}
            Some(value) if !field.kind.accepts(value) => {
                violations.push(format!(
                    "{}: expected {}, found {}",
                    field.name,
                    field.kind.describe(),
                    json_type_name(value)
                ));
            }
            Some(_) => {}
        }
    }
    violations
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(s) if s.trim().is_empty() => "empty string",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_cert() -> Value {
        json!({
            "patientName": "Jordan Smith",
            "certificateType": "work",
            "startDate": "2026-03-10",
            "endDate": "2026-03-11",
            "durationDays": 2,
            "symptomsSummary": "Fever and cough",
            "statement": "Unfit for work from 10 March 2026 to 11 March 2026 inclusive.",
            "requiresReview": false,
            "reviewReason": null
        })
    }

    #[test]
    fn parses_valid_med_cert() {
        let cert = parse_med_cert(&valid_cert().to_string()).unwrap();
        assert_eq!(cert.patient_name, "Jordan Smith");
        assert_eq!(cert.start_date, NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
        assert_eq!(cert.duration_days, 2);
        assert!(!cert.requires_review);
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let text = format!("\n  {}\n", valid_cert());
        assert!(parse_med_cert(&text).is_ok());
    }

    #[test]
    fn prose_is_not_json() {
        let failure = parse_med_cert("I'm sorry, I can't write certificates.").unwrap_err();
        assert_eq!(failure.error, "Response is not valid JSON");
        assert_eq!(failure.validation_errors.len(), 1);
    }

    #[test]
    fn markdown_fenced_json_is_rejected() {
        let text = format!("```json\n{}\n```", valid_cert());
        let failure = parse_med_cert(&text).unwrap_err();
        assert_eq!(failure.error, "Response is not valid JSON");
    }

    #[test]
    fn json_followed_by_prose_is_rejected() {
        let text = format!("{}\nLet me know if you need changes.", valid_cert());
        assert!(parse_med_cert(&text).is_err());
    }

    #[test]
    fn non_object_json_is_rejected() {
        let failure = parse_clinical_note("[1, 2, 3]").unwrap_err();
        assert_eq!(failure.error, "Response is not a JSON object");
        assert_eq!(failure.validation_errors, vec!["expected an object, found array"]);
    }

    #[test]
    fn collects_every_schema_violation() {
        let mut cert = valid_cert();
        cert.as_object_mut().unwrap().remove("patientName");
        cert["durationDays"] = json!("two");
        cert["startDate"] = json!("10/03/2026");
        cert["requiresReview"] = json!("no");

        let failure = parse_med_cert(&cert.to_string()).unwrap_err();
        assert_eq!(failure.error, "Response does not match the med_cert schema");
        assert_eq!(
            failure.validation_errors,
            vec![
                "patientName: required field is missing",
                "startDate: expected a YYYY-MM-DD date string, found string",
                "durationDays: expected a non-negative integer, found string",
                "requiresReview: expected a boolean, found string",
            ]
        );
    }

    #[test]
    fn empty_required_text_is_a_violation() {
        let mut cert = valid_cert();
        cert["statement"] = json!("  ");
        let failure = parse_med_cert(&cert.to_string()).unwrap_err();
        assert_eq!(
            failure.validation_errors,
            vec!["statement: expected a non-empty string, found empty string"]
        );
    }

    #[test]
    fn optional_field_checked_when_present() {
        let mut cert = valid_cert();
        cert["reviewReason"] = json!(42);
        let failure = parse_med_cert(&cert.to_string()).unwrap_err();
        assert_eq!(
            failure.validation_errors,
            vec!["reviewReason: expected a non-empty string, found number"]
        );

        cert.as_object_mut().unwrap().remove("reviewReason");
        assert!(parse_med_cert(&cert.to_string()).is_ok());
    }

    #[test]
    fn negative_duration_is_a_violation() {
        let mut cert = valid_cert();
        cert["durationDays"] = json!(-2);
        let failure = parse_med_cert(&cert.to_string()).unwrap_err();
        assert_eq!(
            failure.validation_errors,
            vec!["durationDays: expected a non-negative integer, found number"]
        );
    }

    #[test]
    fn parses_valid_clinical_note() {
        let note = parse_clinical_note(
            &json!({
                "presentingComplaint": "Fever and cough for two days",
                "historyOfPresentIllness": "Onset Monday",
                "relevantInformation": "Not provided",
                "certificateDetails": "Work certificate, 10-11 March",
                "planAndAdvice": "Doctor to review",
                "requiresReview": true,
                "reviewReason": "Backdated request"
            })
            .to_string(),
        )
        .unwrap();
        assert!(note.requires_review);
        assert_eq!(note.review_reason.as_deref(), Some("Backdated request"));
    }

    #[test]
    fn cert_schema_does_not_satisfy_note_schema() {
        let failure = parse_clinical_note(&valid_cert().to_string()).unwrap_err();
        assert!(failure
            .validation_errors
            .contains(&"presentingComplaint: required field is missing".to_string()));
    }
}
