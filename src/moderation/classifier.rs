//! Safe/unsafe classification of raw moderation output.

use super::taxonomy::ModerationTaxonomy;
use crate::normalize::diagnostic_excerpt;
use crate::types::{ModerationFlag, ModerationResponse};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Safe,
    Unsafe(Vec<ModerationFlag>),
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe)
    }

    pub fn into_flags(self) -> Vec<ModerationFlag> {
        match self {
            Verdict::Safe => Vec::new(),
            Verdict::Unsafe(flags) => flags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("no output")]
    NoOutput,
    #[error("{reason}")]
    Malformed { reason: String },
}

/// Classify raw moderation text against `taxonomy`.
pub fn classify(raw: Option<&str>, taxonomy: &ModerationTaxonomy) -> Result<Verdict, ClassifyError> {
    let raw = raw.filter(|r| !r.trim().is_empty()).ok_or(ClassifyError::NoOutput)?;
    let mut lines = raw.lines();
    let verdict = lines.next().map(str::trim).unwrap_or_default();
    if verdict == "safe" {
        return Ok(Verdict::Safe);
    }

    let codes = lines.next().ok_or_else(|| ClassifyError::Malformed {
        reason: format!("expected a category line after '{}'", verdict),
    })?;
    let flags = codes
        .split(',')
        .map(str::trim)
        .filter_map(|code| taxonomy.flag(code))
        .collect();
    Ok(Verdict::Unsafe(flags))
}

/// Classify and wrap the outcome in a moderation envelope.
pub fn classify_response(raw: Option<&str>, taxonomy: &ModerationTaxonomy) -> ModerationResponse {
    match classify(raw, taxonomy) {
        Ok(verdict) => ModerationResponse::flags(verdict.into_flags()),
        Err(ClassifyError::NoOutput) => ModerationResponse::failure("API response error: no output"),
        Err(err) => {
            let raw = raw.map(|r| Value::String(r.to_string())).unwrap_or(Value::Null);
            ModerationResponse::failure(format!(
                "API response error: {}: {}",
                err,
                diagnostic_excerpt(&raw)
            ))
        }
    }
}
