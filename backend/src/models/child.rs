use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::time::{iso_millis, iso_millis_option};
use super::violation::{require_text, Violation};
use crate::api::DocumentId;

fn default_timezone() -> String {
    "UTC".to_string()
}

/// A child profile owned by a parent user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Child {
    pub id: DocumentId,
    pub parent_id: DocumentId,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(with = "iso_millis")]
    pub birth_date: DateTime<Utc>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_plan_id: Option<DocumentId>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "iso_millis_option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl Child {
    /// Minimal child record with defaults for everything optional.
    pub fn new(id: DocumentId, parent_id: DocumentId, first_name: impl Into<String>, birth_date: DateTime<Utc>) -> Self {
        Self {
            id,
            parent_id,
            first_name: first_name.into(),
            last_name: None,
            birth_date,
            timezone: default_timezone(),
            active_plan_id: None,
            tags: Vec::new(),
            created_at: Utc::now(),
            updated_at: None,
            meta: None,
        }
    }

    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        require_text("firstName", &self.first_name, &mut violations);
        for (index, tag) in self.tags.iter().enumerate() {
            require_text(&format!("tags.{}", index), tag, &mut violations);
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_defaults_applied_on_deserialize() {
        let child: Child = serde_json::from_value(json!({
            "id": "65e0e6335dffb466f21a1c01",
            "parentId": "65e0e6335dffb466f21a1c00",
            "firstName": "Lucía",
            "birthDate": "2023-05-01",
            "createdAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(child.timezone, "UTC");
        assert!(child.tags.is_empty());
        assert_eq!(child.birth_date, Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap());
        assert!(child.validate().is_empty());
    }

    #[test]
    fn test_blank_name_and_tags_are_flagged() {
        let mut child = Child::new(
            DocumentId::generate(),
            DocumentId::generate(),
            "  ",
            Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap(),
        );
        child.tags = vec!["night-owl".to_string(), " ".to_string()];
        let fields: Vec<_> = child.validate().into_iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["firstName", "tags.1"]);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result = serde_json::from_value::<Child>(json!({
            "id": "65e0e6335dffb466f21a1c01",
            "parentId": "65e0e6335dffb466f21a1c00",
            "firstName": "Lucía",
            "birthDate": "2023-05-01",
            "createdAt": "2024-01-01T00:00:00Z",
            "nickname": "Lu"
        }));
        assert!(result.is_err());
    }
}
