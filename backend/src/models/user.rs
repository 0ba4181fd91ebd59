use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::time::{iso_millis, iso_millis_option};
use super::violation::{optional_text, Violation};
use crate::api::DocumentId;
use crate::auth::Role;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// An account as stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: DocumentId,
    pub email: String,
    /// Stored roles outside the known set read back as [`Role::User`]
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Role,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "iso_millis_option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
}

fn lenient_role<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Role, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().map(Role::parse_lenient).unwrap_or_default())
}

impl User {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            id: DocumentId::generate(),
            email: email.into(),
            role,
            created_at: Utc::now(),
            updated_at: None,
            profile: None,
        }
    }

    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        let email = self.email.trim();
        let valid_email = match email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
            None => false,
        };
        if !valid_email {
            violations.push(Violation::new("email", "must be a valid email address"));
        }
        if let Some(profile) = &self.profile {
            optional_text("profile.firstName", profile.first_name.as_deref(), &mut violations);
            optional_text("profile.lastName", profile.last_name.as_deref(), &mut violations);
            optional_text("profile.timezone", profile.timezone.as_deref(), &mut violations);
        }
        violations
    }
}
