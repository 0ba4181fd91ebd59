//! Process environment validation.
//!
//! A missing required secret does not stop the server. `/api/healthz` reports
//! degraded and `check-env` exits non-zero until it is fixed.

/// Keys that must be present and non-blank, in reporting order.
pub const REQUIRED_ENV_KEYS: [&str; 4] = [
    "ZOOM_WEBHOOK_SECRET",
    "GOOGLE_DRIVE_SERVICE_ACCOUNT_KEY",
    "MONGODB_URI",
    "AUTH_SECRET",
];

pub const ENABLE_DEBUG_ENDPOINTS: &str = "ENABLE_DEBUG_ENDPOINTS";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Missing or invalid environment variables: {}", .missing_keys.join(", "))]
pub struct EnvValidationError {
    pub missing_keys: Vec<String>,
}

/// Validated environment.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub zoom_webhook_secret: String,
    pub google_drive_service_account_key: String,
    pub mongodb_uri: String,
    pub auth_secret: String,
    pub enable_debug_endpoints: bool,
}

// Secrets stay out of logs.
impl std::fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvConfig")
            .field("enable_debug_endpoints", &self.enable_debug_endpoints)
            .finish_non_exhaustive()
    }
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, EnvValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Validate using an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EnvValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing_keys = Vec::new();
        let mut required = |key: &str| match lookup(key).map(|value| value.trim().to_string()) {
            Some(value) if !value.is_empty() => value,
            _ => {
                missing_keys.push(key.to_string());
                String::new()
            }
        };

        let zoom_webhook_secret = required(REQUIRED_ENV_KEYS[0]);
        let google_drive_service_account_key = required(REQUIRED_ENV_KEYS[1]);
        let mongodb_uri = required(REQUIRED_ENV_KEYS[2]);
        let auth_secret = required(REQUIRED_ENV_KEYS[3]);

        let enable_debug_endpoints = match lookup(ENABLE_DEBUG_ENDPOINTS).as_deref() {
            None | Some("false") => false,
            Some("true") => true,
            Some(_) => {
                missing_keys.push(ENABLE_DEBUG_ENDPOINTS.to_string());
                false
            }
        };

        if !missing_keys.is_empty() {
            return Err(EnvValidationError { missing_keys });
        }

        Ok(Self {
            zoom_webhook_secret,
            google_drive_service_account_key,
            mongodb_uri,
            auth_secret,
            enable_debug_endpoints,
        })
    }
}

/// Whether debug endpoints are switched on, without requiring the rest of the
/// environment to be valid.
pub fn debug_endpoints_enabled() -> bool {
    std::env::var(ENABLE_DEBUG_ENDPOINTS).is_ok_and(|value| value == "true")
}
