//! Request guards and response decoration.
//!
//! - [`security_headers`] stamps every response, error responses included.
//! - [`origin_guard`] enforces the cross-origin policy and answers preflights.
//! - [`require_pro`] / [`require_admin`] resolve the session and check its role.

use axum::{
    extract::{Request, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
            ACCESS_CONTROL_REQUEST_HEADERS, CONTENT_SECURITY_POLICY, HOST, ORIGIN,
            REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, VARY, X_CONTENT_TYPE_OPTIONS,
        },
        HeaderMap, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use regex::{Regex, RegexBuilder};
use std::sync::Arc;

use super::error::{ApiError, AppError};
use super::state::AppState;
use crate::auth::Role;
use crate::db::repo_config::{OriginSettings, DEFAULT_ALLOWED_ORIGIN, DEFAULT_PREVIEW_PATTERN};

const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const DEFAULT_ALLOWED_HEADERS: &str = "Content-Type, Authorization";
const CONTENT_SECURITY: &str = "default-src 'self'; style-src 'self' 'unsafe-inline'; \
     script-src 'self'; img-src 'self' data:; connect-src 'self'";

/// Which cross-origin callers are let through.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    preview: Option<Regex>,
}

impl Default for OriginPolicy {
    fn default() -> Self {
        Self {
            allowed: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            preview: compile_preview(DEFAULT_PREVIEW_PATTERN).ok(),
        }
    }
}

fn compile_preview(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>, preview_pattern: Option<&str>) -> Result<Self, regex::Error> {
        let preview = preview_pattern
            .filter(|pattern| !pattern.is_empty())
            .map(compile_preview)
            .transpose()?;
        Ok(Self { allowed, preview })
    }

    pub fn from_settings(settings: &OriginSettings) -> Result<Self, regex::Error> {
        Self::new(settings.allowed.clone(), settings.preview_pattern.as_deref())
    }

    /// Exact match against the allow-list, then the preview pattern.
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed.iter().any(|allowed| allowed == origin)
            || self
                .preview
                .as_ref()
                .is_some_and(|preview| preview.is_match(origin))
    }
}

fn apply_security_headers(headers: &mut HeaderMap) {
    headers.insert(
        STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=63072000; includeSubDomains; preload"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(CONTENT_SECURITY));
}

fn apply_cors_headers(
    headers: &mut HeaderMap,
    origin: HeaderValue,
    requested_headers: Option<HeaderValue>,
) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.append(VARY, HeaderValue::from_static("Origin"));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        requested_headers.unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ALLOWED_HEADERS)),
    );
    headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
}

/// An origin naming the host the request was sent to is not cross-origin.
/// The scheme is ignored since TLS usually terminates upstream.
fn is_same_origin(origin: &str, headers: &HeaderMap) -> bool {
    let Some(host) = headers.get(HOST).and_then(|host| host.to_str().ok()) else {
        return false;
    };
    origin
        .split_once("://")
        .is_some_and(|(_, authority)| authority.eq_ignore_ascii_case(host))
}

pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    apply_security_headers(response.headers_mut());
    response
}

pub async fn origin_guard(
    State(policy): State<Arc<OriginPolicy>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(origin) = req.headers().get(ORIGIN).cloned() else {
        return next.run(req).await;
    };
    let origin_str = origin.to_str().unwrap_or_default();
    if is_same_origin(origin_str, req.headers()) {
        return next.run(req).await;
    }

    if !policy.is_allowed(origin_str) {
        tracing::warn!(origin = %origin_str, path = %req.uri().path(), "forbidden origin");
        return (StatusCode::FORBIDDEN, Json(ApiError::new("Forbidden origin"))).into_response();
    }

    let requested_headers = req.headers().get(ACCESS_CONTROL_REQUEST_HEADERS).cloned();
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };
    apply_cors_headers(response.headers_mut(), origin, requested_headers);
    response
}

async fn require_role(
    state: &AppState,
    required: Role,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = state
        .sessions
        .resolve(req.headers())
        .ok_or(AppError::Unauthorized)?;

    if !session.role.satisfies(required) {
        tracing::warn!(
            user_id = %session.user_id,
            role = %session.role,
            required = %required,
            "insufficient role"
        );
        return Err(AppError::Forbidden);
    }

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

pub async fn require_pro(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_role(&state, Role::Pro, req, next).await
}

pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_role(&state, Role::Admin, req, next).await
}
