use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::time::{iso_millis, iso_millis_option};
use super::violation::{non_negative, require_text, Violation};
use crate::api::DocumentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptSource {
    Zoom,
    Manual,
    Upload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TranscriptMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    /// Recognition confidence in `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Text of a consultation session attached to a child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Transcript {
    pub id: DocumentId,
    pub child_id: DocumentId,
    pub source: TranscriptSource,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<TranscriptMeta>,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "iso_millis_option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Transcript {
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        require_text("text", &self.text, &mut violations);
        if let Some(meta) = &self.meta {
            non_negative("meta.durationSeconds", meta.duration_seconds, &mut violations);
            if let Some(confidence) = meta.confidence {
                if !(0.0..=1.0).contains(&confidence) {
                    violations.push(Violation::new("meta.confidence", "must be between 0 and 1"));
                }
            }
        }
        violations
    }
}
