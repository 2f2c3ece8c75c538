// PHI audit: static scan of every tracing call under src/ for fields or
// interpolations that would carry patient data into logs. Logs identify work by
// intake id, artifact type, status, counts and timings only.

use std::fs;
use std::path::Path;

/// Field names and interpolations that MUST NOT appear in tracing macro arguments.
const PHI_PATTERNS: &[&str] = &[
    // Patient record
    "full_name",
    "patient_name",
    "date_of_birth",
    "patient.",
    // Intake answers
    "answers",
    "symptoms",
    "other_symptom_details",
    "reason()",
    // Model input and output
    "response.text",
    "raw =",
    "%raw",
    "?raw",
    "prompt =",
    "%prompt",
    "?prompt",
    "context =",
    "%context",
    "?context",
    // Generated artifact bodies
    "content =",
    "%content",
    "?content",
    "symptoms_summary",
    "statement",
];

/// Files that mention the patterns outside tracing calls on purpose.
const ALLOWLIST: &[&str] = &["phi_audit.rs"];

const TRACING_MACROS: &[&str] = &[
    "tracing::info!",
    "tracing::warn!",
    "tracing::error!",
    "tracing::debug!",
    "tracing::trace!",
    "tracing::info_span!",
];

type Violation = (String, usize, String, String);

#[test]
fn no_phi_in_tracing_calls() {
    let src_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    assert!(src_dir.exists(), "Source directory not found: {}", src_dir.display());

    let mut violations = Vec::new();
    scan_directory(&src_dir, &src_dir, &mut violations);

    if !violations.is_empty() {
        let report = violations
            .iter()
            .map(|(file, line_num, call, pattern)| {
                format!("  {file}:{line_num}: found '{pattern}' in: {call}")
            })
            .collect::<Vec<_>>()
            .join("\n");
        panic!(
            "PHI AUDIT FAILED: {} violation(s) found in tracing calls:\n{}\n\n\
             Fix: log intake ids, counts and statuses instead of patient data.",
            violations.len(),
            report
        );
    }
}

#[test]
fn scanner_detects_known_violation() {
    let source = "fn f() {\n    tracing::info!(\n        name = %patient.full_name,\n        \"loaded\"\n    );\n}\n";
    let found = scan_source("synthetic.rs", source);
    assert_eq!(found.len(), 2, "{found:?}");
    assert_eq!(found[0].1, 2);
}

#[test]
fn scanner_passes_clean_tracing() {
    let source = r#"tracing::info!(intake_id, artifact = %artifact, prompt_tokens = ?usage.prompt_tokens, "stored");"#;
    assert!(scan_source("synthetic.rs", source).is_empty());
}

#[test]
fn scanner_ignores_non_tracing_lines() {
    let source = "let name = patient.full_name.clone();\n";
    assert!(scan_source("synthetic.rs", source).is_empty());
}

fn scan_directory(root: &Path, dir: &Path, violations: &mut Vec<Violation>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_directory(root, &path, violations);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            let filename = path.file_name().unwrap_or_default().to_string_lossy();
            if ALLOWLIST.iter().any(|a| filename.contains(a)) {
                continue;
            }
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let relative = path.strip_prefix(root).unwrap_or(&path).display().to_string();
            violations.extend(scan_source(&relative, &content));
        }
    }
}

/// Find PHI patterns inside tracing macro calls, which may span several lines.
fn scan_source(file: &str, content: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    let lines: Vec<&str> = content.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let trimmed = lines[i].trim();
        if !TRACING_MACROS.iter().any(|m| trimmed.starts_with(m)) {
            i += 1;
            continue;
        }

        let mut call = String::from(trimmed);
        let mut depth = paren_delta(trimmed);
        let mut j = i + 1;
        while depth > 0 && j < lines.len() {
            let next = lines[j].trim();
            call.push(' ');
            call.push_str(next);
            depth += paren_delta(next);
            j += 1;
        }

        for pattern in PHI_PATTERNS {
            if call.contains(pattern) {
                violations.push((file.to_string(), i + 1, call.clone(), pattern.to_string()));
            }
        }
        i = j;
    }
    violations
}

fn paren_delta(s: &str) -> i32 {
    s.chars().fold(0, |d, ch| match ch {
        '(' => d + 1,
        ')' => d - 1,
        _ => d,
    })
}
