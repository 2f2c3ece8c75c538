// Ground-truth validation for parsed drafts.
// Cross-checks model output against the intake answers and the fixed safety
// vocabularies. Review-rule mismatches are auto-corrected (requiresReview forced on,
// correction recorded); every other mismatch fails the artifact.

use chrono::NaiveDate;

use super::safety::{
    find_forbidden_terms, mentioned_symptoms, patient_condition_terms, reported_symptoms,
};
use super::types::{ClinicalNote, MedCertDraft};
use crate::models::{Intake, Patient};

/// Source data a draft is checked against.
#[derive(Debug, Clone, Copy)]
pub struct GroundTruth<'a> {
    pub intake: &'a Intake,
    pub patient: &'a Patient,
    pub review_threshold_days: i64,
}

impl<'a> GroundTruth<'a> {
    pub fn new(intake: &'a Intake, patient: &'a Patient, review_threshold_days: i64) -> Self {
        Self {
            intake,
            patient,
            review_threshold_days,
        }
    }

    /// Duration the patient asked for: stated duration, else derived from their dates.
    pub fn requested_duration_days(&self) -> Option<i64> {
        let answers = &self.intake.answers;
        answers.duration_days().or_else(|| {
            let (start, end) = (answers.effective_start_date()?, answers.effective_end_date()?);
            (end >= start).then(|| (end - start).num_days() + 1)
        })
    }

    /// Why the draft needs a doctor's review, if it does.
    ///
    /// `certified` is the (start date, duration) the draft itself claims, when it has one.
    pub fn review_requirement(&self, certified: Option<(NaiveDate, i64)>) -> Option<String> {
        let threshold = self.review_threshold_days;
        let mut reasons = Vec::new();

        let duration = self
            .requested_duration_days()
            .into_iter()
            .chain(certified.map(|(_, d)| d))
            .max();
        if let Some(days) = duration.filter(|d| *d > threshold) {
            reasons.push(format!("Duration of {days} days exceeds {threshold} days"));
        }

        let start = self
            .intake
            .answers
            .effective_start_date()
            .into_iter()
            .chain(certified.map(|(s, _)| s))
            .min();
        if let Some(start) = start {
            let backdated = (self.intake.request_date() - start).num_days();
            if backdated > threshold {
                reasons.push(format!(
                    "Start date is backdated {backdated} days before the request date"
                ));
            }
        }

        (!reasons.is_empty()).then(|| reasons.join("; "))
    }
}

/// Validated (possibly corrected) content plus what went wrong.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruthReport<T> {
    pub content: T,
    pub errors: Vec<String>,
    pub corrections: Vec<String>,
}

impl<T> GroundTruthReport<T> {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate_clinical_note(mut note: ClinicalNote, truth: &GroundTruth<'_>) -> GroundTruthReport<ClinicalNote> {
    let mut errors = Vec::new();
    let mut corrections = Vec::new();

    check_text_fields(&note.text_fields(), truth, &mut errors);

    if let Some(reason) = truth.review_requirement(None) {
        force_review(&mut note.requires_review, &mut note.review_reason, &reason, &mut corrections);
    }

    GroundTruthReport {
        content: note,
        errors,
        corrections,
    }
}

pub fn validate_med_cert(mut cert: MedCertDraft, truth: &GroundTruth<'_>) -> GroundTruthReport<MedCertDraft> {
    let mut errors = Vec::new();
    let mut corrections = Vec::new();
    let answers = &truth.intake.answers;

    if normalize(&cert.patient_name) != normalize(&truth.patient.full_name) {
        errors.push("patientName does not match the patient record".to_string());
    }

    if let Some(expected) = answers.certificate_type() {
        if normalize(&cert.certificate_type) != normalize(&expected) {
            errors.push(format!(
                "certificateType '{}' does not match intake '{}'",
                cert.certificate_type, expected
            ));
        }
    }

    if let Some(expected) = answers.effective_start_date() {
        if cert.start_date != expected {
            errors.push(format!(
                "startDate {} does not match intake {}",
                cert.start_date, expected
            ));
        }
    }

    if let Some(expected) = answers.effective_end_date() {
        if cert.end_date != expected {
            errors.push(format!("endDate {} does not match intake {}", cert.end_date, expected));
        }
    }

    if cert.end_date < cert.start_date {
        errors.push("endDate is before startDate".to_string());
    } else {
        let span = (cert.end_date - cert.start_date).num_days() + 1;
        if i64::from(cert.duration_days) != span {
            errors.push(format!(
                "durationDays {} does not match the {span}-day period from startDate to endDate",
                cert.duration_days
            ));
        }
    }

    if let Some(expected) = answers.duration_days() {
        if i64::from(cert.duration_days) != expected {
            errors.push(format!(
                "durationDays {} does not match intake duration {expected}",
                cert.duration_days
            ));
        }
    }

    check_text_fields(&cert.text_fields(), truth, &mut errors);

    let certified = Some((cert.start_date, i64::from(cert.duration_days)));
    if let Some(reason) = truth.review_requirement(certified) {
        force_review(&mut cert.requires_review, &mut cert.review_reason, &reason, &mut corrections);
    }

    GroundTruthReport {
        content: cert,
        errors,
        corrections,
    }
}

/// Denylist and symptom-grounding checks over free-text fields.
fn check_text_fields(fields: &[(&'static str, &str)], truth: &GroundTruth<'_>, errors: &mut Vec<String>) {
    let patient_text = truth.intake.answers.patient_text();
    let reported = reported_symptoms(&patient_text);
    let patient_conditions = patient_condition_terms(&patient_text);

    for (name, text) in fields {
        let forbidden = find_forbidden_terms(text);
        for term in &forbidden {
            errors.push(format!("{name} names a {}: '{}'", term.category.as_str(), term.term));
        }
        let lowered = text.to_lowercase();
        for condition in &patient_conditions {
            if lowered.contains(condition.as_str()) && !forbidden.iter().any(|f| &f.term == condition) {
                errors.push(format!("{name} names a condition: '{condition}'"));
            }
        }
        for symptom in mentioned_symptoms(text) {
            if !reported.contains(&symptom) {
                errors.push(format!("{name} mentions '{symptom}', which the patient did not report"));
            }
        }
    }
}

fn force_review(
    requires_review: &mut bool,
    review_reason: &mut Option<String>,
    reason: &str,
    corrections: &mut Vec<String>,
) {
    if *requires_review {
        if review_reason.as_deref().map_or(true, |r| r.trim().is_empty()) {
            *review_reason = Some(reason.to_string());
        }
        return;
    }
    *requires_review = true;
    *review_reason = Some(reason.to_string());
    corrections.push(format!("requiresReview forced to true: {reason}"));
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
