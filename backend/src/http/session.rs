//! Session resolution from request headers.
//!
//! Authentication happens upstream. The gateway in front of this service
//! forwards the caller's identity in headers and proves it did so with a
//! shared secret.

use axum::http::HeaderMap;

use crate::auth::{Role, Session};

pub const GATEWAY_SECRET_HEADER: &str = "x-gateway-secret";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Turns request headers into a session, if there is one.
pub trait SessionResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<Session>;
}

/// Trusts identity headers only when `x-gateway-secret` matches `AUTH_SECRET`.
#[derive(Clone)]
pub struct GatewaySessionResolver {
    secret: String,
}

impl GatewaySessionResolver {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for GatewaySessionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySessionResolver").finish_non_exhaustive()
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

// Length leaks, contents do not.
fn secrets_match(provided: &str, expected: &str) -> bool {
    provided.len() == expected.len()
        && provided
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

impl SessionResolver for GatewaySessionResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<Session> {
        if self.secret.is_empty() {
            return None;
        }
        let provided = header(headers, GATEWAY_SECRET_HEADER)?;
        if !secrets_match(provided, &self.secret) {
            tracing::warn!("gateway secret mismatch");
            return None;
        }

        let user_id = header(headers, USER_ID_HEADER)?;
        let role = header(headers, USER_ROLE_HEADER)
            .map(Role::parse_lenient)
            .unwrap_or_default();

        Some(Session {
            user_id: user_id.to_string(),
            role,
        })
    }
}

/// Resolves nothing. Every guarded route answers 401.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSessionResolver;

impl SessionResolver for NoSessionResolver {
    fn resolve(&self, _headers: &HeaderMap) -> Option<Session> {
        None
    }
}
