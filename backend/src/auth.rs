//! Roles and resolved sessions.
//!
//! Authentication happens upstream. This module only models what the upstream
//! provider hands over: a user id and a role.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access level, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Pro,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Pro => "pro",
            Role::Admin => "admin",
        }
    }

    /// Parse a role string, treating anything unrecognised as [`Role::User`].
    pub fn parse_lenient(raw: &str) -> Role {
        raw.parse().unwrap_or_default()
    }

    /// Whether this role grants access to something that requires `required`.
    pub fn satisfies(&self, required: Role) -> bool {
        *self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "pro" => Ok(Role::Pro),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// The authenticated caller as resolved from the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub role: Role,
}
