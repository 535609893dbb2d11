//! Findings schema and report parsing.
//!
//! The assistant is instructed to return one strict JSON object. Models
//! routinely wrap it in a fenced code block anyway, so the parser strips an
//! optional fence before validating. Any schema violation fails the whole
//! run; there is no partial acceptance.

use crate::error::{Result, SleuthError};
use serde::{Deserialize, Serialize};

/// Structured root-cause analysis result for one bug. Immutable once
/// produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub probable_cause: String,
    pub reason: String,
    pub suggested_fixes: Vec<String>,
    pub confidence_score: f64,
    /// Free-form supporting material. Passed through unvalidated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<serde_json::Value>,
}

impl Finding {
    /// Extract and validate a finding from raw assistant output.
    pub fn parse_report(raw: &str) -> Result<Self> {
        let body = strip_code_fence(raw);
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| SleuthError::InvalidReport(format!("not valid JSON: {e}")))?;
        let obj = value.as_object().ok_or_else(|| {
            SleuthError::InvalidReport("expected a JSON object at the top level".into())
        })?;

        let probable_cause = required_string(obj, "probableCause")?;
        let reason = required_string(obj, "reason")?;

        let fixes = obj
            .get("suggestedFixes")
            .ok_or_else(|| SleuthError::InvalidReport("missing field 'suggestedFixes'".into()))?
            .as_array()
            .ok_or_else(|| {
                SleuthError::InvalidReport("suggestedFixes: expected an array".into())
            })?;
        let mut suggested_fixes = Vec::with_capacity(fixes.len());
        for (i, item) in fixes.iter().enumerate() {
            let fix = item.as_str().ok_or_else(|| {
                SleuthError::InvalidReport(format!("suggestedFixes[{i}]: expected a string"))
            })?;
            let fix = fix.trim();
            if fix.is_empty() {
                return Err(SleuthError::InvalidReport(format!(
                    "suggestedFixes[{i}]: must not be empty"
                )));
            }
            suggested_fixes.push(fix.to_string());
        }

        let confidence_score = obj
            .get("confidenceScore")
            .ok_or_else(|| SleuthError::InvalidReport("missing field 'confidenceScore'".into()))?
            .as_f64()
            .ok_or_else(|| {
                SleuthError::InvalidReport("confidenceScore: expected a number".into())
            })?;
        if !confidence_score.is_finite() || !(0.0..=1.0).contains(&confidence_score) {
            return Err(SleuthError::InvalidReport(format!(
                "confidenceScore: must be a finite number within [0, 1], got {confidence_score}"
            )));
        }

        let evidence = obj.get("evidence").filter(|v| !v.is_null()).cloned();

        Ok(Finding {
            probable_cause,
            reason,
            suggested_fixes,
            confidence_score,
            evidence,
        })
    }
}

fn required_string(
    obj: &serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> Result<String> {
    let value = obj
        .get(field)
        .ok_or_else(|| SleuthError::InvalidReport(format!("missing field '{field}'")))?
        .as_str()
        .ok_or_else(|| SleuthError::InvalidReport(format!("{field}: expected a string")))?
        .trim();
    if value.is_empty() {
        return Err(SleuthError::InvalidReport(format!(
            "{field}: must be a non-empty string"
        )));
    }
    Ok(value.to_string())
}

/// Strip an optional ```-fenced wrapper (with or without an info string)
/// around the report body.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(newline) = rest.find('\n') else {
        return trimmed;
    };
    let body = rest[newline + 1..].trim_end();
    match body.strip_suffix("```") {
        Some(inner) => inner.trim_end(),
        None => body,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"probableCause":"X","reason":"Y","suggestedFixes":["Z"],"confidenceScore":0.73}"#;

    #[test]
    fn parses_valid_report() {
        let finding = Finding::parse_report(VALID).unwrap();
        assert_eq!(finding.probable_cause, "X");
        assert_eq!(finding.reason, "Y");
        assert_eq!(finding.suggested_fixes, vec!["Z"]);
        assert!((finding.confidence_score - 0.73).abs() < 1e-9);
        assert!(finding.evidence.is_none());
    }

    #[test]
    fn strips_fenced_code_block() {
        let fenced = format!("```json\n{VALID}\n```");
        let finding = Finding::parse_report(&fenced).unwrap();
        assert_eq!(finding.probable_cause, "X");
    }

    #[test]
    fn strips_fence_without_info_string() {
        let fenced = format!("```\n{VALID}\n```");
        Finding::parse_report(&fenced).unwrap();
    }

    #[test]
    fn rejects_confidence_above_one() {
        let raw = VALID.replace("0.73", "1.5");
        let err = Finding::parse_report(&raw).unwrap_err().to_string();
        assert!(err.contains("confidenceScore"), "got: {err}");
    }

    #[test]
    fn rejects_negative_confidence() {
        let raw = VALID.replace("0.73", "-0.1");
        assert!(Finding::parse_report(&raw).is_err());
    }

    #[test]
    fn rejects_non_numeric_confidence() {
        let raw = VALID.replace("0.73", r#""high""#);
        let err = Finding::parse_report(&raw).unwrap_err().to_string();
        assert!(err.contains("expected a number"), "got: {err}");
    }

    #[test]
    fn rejects_non_object() {
        let err = Finding::parse_report(r#"["not","an","object"]"#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("JSON object"), "got: {err}");
    }

    #[test]
    fn rejects_non_json() {
        assert!(Finding::parse_report("the bug is in the parser").is_err());
    }

    #[test]
    fn rejects_empty_probable_cause() {
        let raw = VALID.replace(r#""probableCause":"X""#, r#""probableCause":"  ""#);
        let err = Finding::parse_report(&raw).unwrap_err().to_string();
        assert!(err.contains("probableCause"), "got: {err}");
    }

    #[test]
    fn rejects_missing_suggested_fixes() {
        let raw = r#"{"probableCause":"X","reason":"Y","confidenceScore":0.5}"#;
        let err = Finding::parse_report(raw).unwrap_err().to_string();
        assert!(err.contains("suggestedFixes"), "got: {err}");
    }

    #[test]
    fn rejects_empty_fix_entry() {
        let raw = VALID.replace(r#"["Z"]"#, r#"["Z","  "]"#);
        let err = Finding::parse_report(&raw).unwrap_err().to_string();
        assert!(err.contains("suggestedFixes[1]"), "got: {err}");
    }

    #[test]
    fn trims_fix_entries() {
        let raw = VALID.replace(r#"["Z"]"#, r#"["  patch the cache  "]"#);
        let finding = Finding::parse_report(&raw).unwrap();
        assert_eq!(finding.suggested_fixes, vec!["patch the cache"]);
    }

    #[test]
    fn evidence_passes_through_unvalidated() {
        let raw = VALID.replace(
            r#""confidenceScore":0.73"#,
            r#""confidenceScore":0.73,"evidence":[{"file":"a.rs","line":12}]"#,
        );
        let finding = Finding::parse_report(&raw).unwrap();
        assert!(finding.evidence.is_some());
    }

    #[test]
    fn serializes_camel_case_for_the_bug_file() {
        let finding = Finding::parse_report(VALID).unwrap();
        let json = serde_json::to_string(&finding).unwrap();
        assert!(json.contains("probableCause"));
        assert!(json.contains("suggestedFixes"));
        assert!(json.contains("confidenceScore"));
    }
}
