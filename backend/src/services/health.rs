//! Liveness report for `/api/healthz`.

use serde::Serialize;
use std::time::{Duration, Instant};

use super::build_info::BuildInfo;
use crate::config::{EnvConfig, EnvValidationError};
use crate::db::repository::FullRepository;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbStatus {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvStatus {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
}

impl EnvStatus {
    pub fn from_result(result: &Result<EnvConfig, EnvValidationError>) -> Self {
        match result {
            Ok(_) => EnvStatus { ok: true, missing: None },
            Err(err) => EnvStatus {
                ok: false,
                missing: Some(err.missing_keys.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub ok: bool,
    /// Seconds since the server started
    pub uptime: f64,
    pub db: DbStatus,
    pub env: EnvStatus,
    pub build: BuildInfo,
}

/// Ping the repository and time the round trip.
pub async fn db_status(repo: &dyn FullRepository) -> DbStatus {
    let started = Instant::now();
    match repo.health_check().await {
        Ok(true) => DbStatus {
            ok: true,
            ping_ms: Some(started.elapsed().as_millis() as u64),
            error: None,
        },
        Ok(false) => DbStatus {
            ok: false,
            ping_ms: None,
            error: Some("Database ping failed".to_string()),
        },
        Err(e) => DbStatus {
            ok: false,
            ping_ms: None,
            error: Some(e.to_string()),
        },
    }
}

/// Assemble the full report. `ok` requires both env and db to be healthy.
pub async fn build_health_report(
    repo: &dyn FullRepository,
    env: EnvStatus,
    build: BuildInfo,
    uptime: Duration,
) -> HealthReport {
    let db = db_status(repo).await;
    let report = HealthReport {
        ok: env.ok && db.ok,
        uptime: uptime.as_secs_f64(),
        db,
        env,
        build,
    };

    if let Some(missing) = &report.env.missing {
        tracing::error!(missing = ?missing, "environment validation failed");
    }
    if let Some(error) = &report.db.error {
        tracing::error!(error = %error, "database health check failed");
    }
    if report.ok {
        tracing::debug!(uptime = report.uptime, ping_ms = ?report.db.ping_ms, "healthz ok");
    } else {
        tracing::warn!("healthz degraded");
    }

    report
}
