//! Redacted user listing for the admin debug endpoint.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::api::DocumentId;
use crate::auth::Role;
use crate::db::repository::{FullRepository, RepositoryResult};
use crate::models::time::to_iso_string;

/// Maximum number of users returned by [`list_debug_users`].
pub const DEBUG_USER_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugUser {
    pub id: DocumentId,
    pub role: Role,
    pub email_hash: Option<String>,
    pub created_at: String,
}

/// First 12 hex characters of sha256 over the lowercased email.
pub fn hash_email(email: &str) -> Option<String> {
    if email.is_empty() {
        return None;
    }
    let digest = Sha256::digest(email.to_lowercase().as_bytes());
    let mut hashed = hex::encode(digest);
    hashed.truncate(12);
    Some(hashed)
}

pub async fn list_debug_users(repo: &dyn FullRepository) -> RepositoryResult<Vec<DebugUser>> {
    let users = repo.list_users(DEBUG_USER_LIMIT).await?;
    Ok(users
        .into_iter()
        .map(|user| DebugUser {
            id: user.id,
            role: user.role,
            email_hash: hash_email(&user.email),
            created_at: to_iso_string(&user.created_at),
        })
        .collect())
}
