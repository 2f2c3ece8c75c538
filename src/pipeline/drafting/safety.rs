//! Fixed vocabularies for ground-truth checks.
//!
//! Drafts must never name a condition or a medication, whatever the model claims
//! about its own compliance. Symptom vocabulary is used to spot symptoms the
//! patient never reported.

use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermCategory {
    Condition,
    Medication,
    Dosage,
    DiagnosticClaim,
}

impl TermCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Condition => "condition",
            Self::Medication => "medication",
            Self::Dosage => "dosage",
            Self::DiagnosticClaim => "diagnostic claim",
        }
    }
}

/// A compiled pattern with its category.
struct DenyPattern {
    regex: Regex,
    category: TermCategory,
}

/// A denylisted term found in generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForbiddenTerm {
    pub term: String,
    pub category: TermCategory,
}

const CONDITION_TERMS: &[&str] = &[
    "influenza",
    "covid",
    "covid-19",
    "coronavirus",
    "gastroenteritis",
    "gastro",
    "norovirus",
    "food poisoning",
    "migraine",
    "migraines",
    "tonsillitis",
    "sinusitis",
    "bronchitis",
    "pneumonia",
    "asthma",
    "diabetes",
    "depression",
    "anxiety",
    "hypertension",
    "urinary tract infection",
    "uti",
    "strep throat",
    "glandular fever",
    "mononucleosis",
    "conjunctivitis",
    "otitis",
    "appendicitis",
    "endometriosis",
    "concussion",
    "cancer",
    "viral infection",
    "bacterial infection",
];

const MEDICATION_TERMS: &[&str] = &[
    "paracetamol",
    "acetaminophen",
    "panadol",
    "ibuprofen",
    "nurofen",
    "naproxen",
    "aspirin",
    "codeine",
    "tramadol",
    "oxycodone",
    "amoxicillin",
    "antibiotic",
    "antibiotics",
    "antiviral",
    "antivirals",
    "oseltamivir",
    "tamiflu",
    "prednisolone",
    "prednisone",
    "salbutamol",
    "ventolin",
    "cetirizine",
    "loratadine",
    "metformin",
    "sertraline",
    "diazepam",
];

static DENY_PATTERNS: LazyLock<Vec<DenyPattern>> = LazyLock::new(|| {
    let mut patterns: Vec<DenyPattern> = CONDITION_TERMS
        .iter()
        .map(|t| term_pattern(t, TermCategory::Condition))
        .chain(MEDICATION_TERMS.iter().map(|t| term_pattern(t, TermCategory::Medication)))
        .collect();
    patterns.push(pattern(
        r"(?i)\b[\w']+\s+(?:disease|syndrome|disorder)\b",
        TermCategory::Condition,
    ));
    patterns.push(pattern(r"(?i)\b\w+itis\b", TermCategory::Condition));
    patterns.push(pattern(
        r"(?i)\b\d+(?:\.\d+)?\s?(?:mg|mcg|µg|ml)\b",
        TermCategory::Dosage,
    ));
    patterns.push(pattern(
        r"(?i)\b(?:diagnosed\s+with|diagnosis\s+of|diagnosis:|prescribed|prescription\s+for)",
        TermCategory::DiagnosticClaim,
    ));
    patterns
});

fn term_pattern(term: &str, category: TermCategory) -> DenyPattern {
    pattern(&format!(r"(?i)\b{}\b", regex::escape(term)), category)
}

fn pattern(re: &str, category: TermCategory) -> DenyPattern {
    DenyPattern {
        regex: Regex::new(re).expect("valid deny pattern"),
        category,
    }
}

/// Every denylisted term in `text`, in pattern order, deduplicated.
pub fn find_forbidden_terms(text: &str) -> Vec<ForbiddenTerm> {
    let mut found: Vec<ForbiddenTerm> = Vec::new();
    for p in DENY_PATTERNS.iter() {
        for m in p.regex.find_iter(text) {
            let term = m.as_str().to_lowercase();
            if !found.iter().any(|f| f.term == term) {
                found.push(ForbiddenTerm {
                    term,
                    category: p.category,
                });
            }
        }
    }
    found
}

static CONDITION_SHAPES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b[\w'-]+\s+(?:disease|syndrome|disorder|infection)\b",
        r"(?i)\b\w+itis\b",
    ]
    .into_iter()
    .map(|re| Regex::new(re).expect("valid condition shape"))
    .collect()
});

const SHAPE_STOPWORDS: &[&str] = &["a", "an", "the", "my", "of", "this", "that", "some", "any", "no"];

/// Condition-shaped phrases in the patient's own words, lowercased.
///
/// Catches conditions outside the fixed vocabulary ("crohn's disease",
/// "chest infection") so a draft cannot repeat them back.
pub fn patient_condition_terms(patient_text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for shape in CONDITION_SHAPES.iter() {
        for m in shape.find_iter(patient_text) {
            let term = m.as_str().to_lowercase();
            let lead = term.split_whitespace().next().unwrap_or_default();
            if term.contains(' ') && SHAPE_STOPWORDS.contains(&lead) {
                continue;
            }
            if !found.contains(&term) {
                found.push(term);
            }
        }
    }
    found
}

/// Canonical symptom name and the phrasings that count as mentioning it.
struct SymptomPattern {
    name: &'static str,
    regex: Regex,
}

static SYMPTOM_PATTERNS: LazyLock<Vec<SymptomPattern>> = LazyLock::new(|| {
    [
        ("fever", r"\b(?:fevers?|feverish|high temperature)\b"),
        ("cough", r"\bcough(?:s|ing)?\b"),
        ("sore throat", r"\bsore throat\b"),
        ("headache", r"\bheadaches?\b"),
        ("nausea", r"\bnause(?:a|ous)\b"),
        ("vomiting", r"\bvomit(?:s|ing|ed)?\b"),
        ("diarrhoea", r"\bdiarrh(?:o)?ea\b"),
        ("fatigue", r"\b(?:fatigue|fatigued|tiredness|exhaustion|exhausted)\b"),
        ("body aches", r"\b(?:body|muscle) ?aches?\b"),
        ("runny nose", r"\b(?:runny|blocked|stuffy) nose\b|\bnasal congestion\b"),
        ("dizziness", r"\bdizz(?:y|iness)\b"),
        ("abdominal pain", r"\b(?:abdominal|stomach|tummy) (?:pain|cramps?|ache)\b"),
        ("shortness of breath", r"\bshort(?:ness)? of breath\b|\bbreathless(?:ness)?\b"),
        ("chest pain", r"\bchest pain\b"),
        ("back pain", r"\bback (?:pain|ache)\b"),
        ("rash", r"\brash(?:es)?\b"),
        ("chills", r"\bchills\b"),
    ]
    .into_iter()
    .map(|(name, re)| SymptomPattern {
        name,
        regex: Regex::new(&format!("(?i){re}")).expect("valid symptom pattern"),
    })
    .collect()
});

static NEGATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:no|denies|denied|without|not|nil)\b").expect("valid regex"));

static CLAUSE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[.;,]|\b(?:but|and|with|however|although)\b").expect("valid regex"));

/// A negation word reaches forward at most 20 characters and never past the end of its clause.
fn is_negated(before: &str) -> bool {
    let Some(last) = NEGATION.find_iter(before).last() else {
        return false;
    };
    let scope = &before[last.end()..];
    scope.chars().count() <= 20 && !CLAUSE_BREAK.is_match(scope)
}

/// Canonical symptoms affirmatively mentioned in `text`. Negated mentions ("no fever") are skipped.
pub fn mentioned_symptoms(text: &str) -> Vec<&'static str> {
    SYMPTOM_PATTERNS
        .iter()
        .filter(|p| p.regex.find_iter(text).any(|m| !is_negated(&text[..m.start()])))
        .map(|p| p.name)
        .collect()
}

/// Canonical symptoms present anywhere in `text`, negated or not. Used on patient answers.
pub fn reported_symptoms(text: &str) -> Vec<&'static str> {
    SYMPTOM_PATTERNS
        .iter()
        .filter(|p| p.regex.is_match(text))
        .map(|p| p.name)
        .collect()
}
