//! Context formatter: intake answers → deterministic prompt text.
//!
//! Absent answers are omitted, never defaulted.

use crate::models::{Intake, IntakeAnswers, Patient};

/// Render the intake as `Label: value` lines in a fixed order.
pub fn format_context(intake: &Intake, patient: &Patient, answers: &IntakeAnswers) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut push = |label: &str, value: Option<String>| {
        if let Some(v) = value {
            lines.push(format!("{label}: {v}"));
        }
    };

    let name = patient.full_name.trim();
    push("Patient name", (!name.is_empty()).then(|| name.to_string()));
    push("Date of birth", patient.date_of_birth.map(|d| d.to_string()));
    push("Request date", Some(intake.request_date().to_string()));
    push("Certificate type", answers.certificate_type());
    push("Start date", answers.text("startDate"));
    push("End date", answers.text("endDate"));
    push("Duration (days)", answers.duration_days().map(|d| d.to_string()));

    let symptoms = answers.symptoms();
    push("Symptoms", (!symptoms.is_empty()).then(|| symptoms.join(", ")));
    push("Other symptom details", answers.other_symptom_details());
    push("Reason", answers.reason());

    // Legacy date fields only fill in when the current ones are missing.
    if answers.text("startDate").is_none() {
        push("Start date (legacy)", answers.text("specificDateFrom"));
    }
    if answers.text("endDate").is_none() {
        push("End date (legacy)", answers.text("specificDateTo"));
    }

    lines.join("\n")
}
