use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::time::{iso_millis, iso_millis_option};
use super::violation::{non_negative, optional_text, require_text, Violation};
use crate::api::DocumentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Active,
    Completed,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlanTarget {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A coaching plan with measurable targets for one child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Plan {
    pub id: DocumentId,
    pub child_id: DocumentId,
    pub status: PlanStatus,
    pub targets: Vec<PlanTarget>,
    #[serde(with = "iso_millis")]
    pub from: DateTime<Utc>,
    #[serde(default, with = "iso_millis_option", skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "iso_millis_option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Plan {
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        if self.targets.is_empty() {
            violations.push(Violation::new("targets", "must contain at least one target"));
        }
        for (index, target) in self.targets.iter().enumerate() {
            let prefix = format!("targets.{}", index);
            require_text(&format!("{}.key", prefix), &target.key, &mut violations);
            optional_text(
                &format!("{}.description", prefix),
                target.description.as_deref(),
                &mut violations,
            );
            non_negative(&format!("{}.targetValue", prefix), target.target_value, &mut violations);
        }

        if let Some(to) = self.to {
            if to < self.from {
                violations.push(Violation::new("to", "must not precede from"));
            }
        }

        violations
    }
}
