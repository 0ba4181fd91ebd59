//! Dreamers HTTP Server Binary
//!
//! Loads configuration, builds the repository, and serves the REST API.
//!
//! # Usage
//!
//! ```bash
//! # Run with local (in-memory) repository (default)
//! cargo run --bin dreamers-server
//!
//! # Run against MongoDB
//! MONGODB_URI=mongodb://localhost:27017/dreamers \
//!   cargo run --bin dreamers-server --features mongo-repo
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `REPOSITORY_TYPE`: `local` or `mongo`
//! - `MONGODB_URI` / `MONGODB_DATABASE`: MongoDB connection
//! - `AUTH_SECRET`: Shared secret expected in `x-gateway-secret`
//! - `ENABLE_DEBUG_ENDPOINTS`: Serve `/api/users/debug` when `true`
//! - `RUST_LOG` / `APP_ENV`: Log filtering

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{error, info, warn};

use dreamers::config::{self, EnvConfig};
use dreamers::db::{RepositoryConfig, RepositoryFactory};
use dreamers::http::{create_router, AppState, GatewaySessionResolver, OriginPolicy};
use dreamers::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    info!("Starting Dreamers HTTP Server");

    let env = EnvConfig::from_env();
    if let Err(e) = &env {
        error!(missing = ?e.missing_keys, "environment validation failed; healthz will report degraded");
    }

    let settings = RepositoryConfig::load()?;
    let repository = RepositoryFactory::from_repository_config(&settings)
        .await
        .context("Failed to initialize repository")?;
    info!(repository = %settings.repository.repo_type, "Repository initialized successfully");

    let origins = OriginPolicy::from_settings(&settings.origins)
        .context("Invalid origins.preview_pattern")?;
    let debug_endpoints = config::debug_endpoints_enabled();
    if debug_endpoints {
        warn!("Debug endpoints are enabled");
    }

    let mut state = AppState::new(repository)
        .with_origins(origins)
        .with_debug_endpoints(debug_endpoints);
    match &env {
        Ok(env) => state = state.with_sessions(GatewaySessionResolver::new(env.auth_secret.clone())),
        Err(_) => warn!("AUTH_SECRET unavailable; guarded routes will answer 401"),
    }

    let app = create_router(state);

    let addr: SocketAddr = settings
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address {}", settings.bind_address()))?;

    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/api/healthz", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
