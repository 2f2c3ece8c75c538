use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Service the patient paid for. `service_type` is the pipeline discriminator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub service_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
}

/// A submitted questionnaire. Read-only ground truth for drafting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intake {
    pub id: String,
    pub service: Service,
    pub patient_id: String,
    pub answers: IntakeAnswers,
    pub created_at: NaiveDateTime,
}

impl Intake {
    /// Date the patient submitted the request.
    pub fn request_date(&self) -> NaiveDate {
        self.created_at.date()
    }
}

/// Intake plus everything loaded alongside it.
#[derive(Debug, Clone)]
pub struct IntakeRecord {
    pub intake: Intake,
    pub patient: Patient,
}

/// Unordered answer map. Every field is optional and may carry the wrong JSON type,
/// so accessors return `None` rather than guessing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntakeAnswers(pub Map<String, Value>);

impl IntakeAnswers {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// Non-empty trimmed string for `key`. Numbers are rendered as text.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        self.text(key).and_then(|s| parse_answer_date(&s))
    }

    pub fn certificate_type(&self) -> Option<String> {
        self.text("certificateType")
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.date("startDate")
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.date("endDate")
    }

    pub fn specific_date_from(&self) -> Option<NaiveDate> {
        self.date("specificDateFrom")
    }

    pub fn specific_date_to(&self) -> Option<NaiveDate> {
        self.date("specificDateTo")
    }

    /// Start date with the legacy `specificDateFrom` as fallback.
    pub fn effective_start_date(&self) -> Option<NaiveDate> {
        self.start_date().or_else(|| self.specific_date_from())
    }

    /// End date with the legacy `specificDateTo` as fallback.
    pub fn effective_end_date(&self) -> Option<NaiveDate> {
        self.end_date().or_else(|| self.specific_date_to())
    }

    /// `durationDays`, else `duration`. Accepts `5`, `"5"` and `"5 days"`.
    pub fn duration_days(&self) -> Option<i64> {
        ["durationDays", "duration"]
            .iter()
            .find_map(|key| self.0.get(*key).and_then(parse_duration_value))
    }

    pub fn symptoms(&self) -> Vec<String> {
        match self.0.get("symptoms") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn other_symptom_details(&self) -> Option<String> {
        self.text("otherSymptomDetails")
    }

    pub fn reason(&self) -> Option<String> {
        self.text("reason")
    }

    /// All patient-authored free text, lowercased, for grounding checks.
    pub fn patient_text(&self) -> String {
        let mut parts = self.symptoms();
        parts.extend(self.other_symptom_details());
        parts.extend(self.reason());
        parts.join(" ").to_lowercase()
    }
}

/// Parse `YYYY-MM-DD`, tolerating a trailing time component.
pub fn parse_answer_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let date_part = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn parse_duration_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .filter(|d| *d >= 0),
        Value::String(s) => {
            let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}
