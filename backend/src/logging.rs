//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Default filter directive for an `APP_ENV` value.
pub fn default_directive(app_env: Option<&str>) -> &'static str {
    match app_env.map(str::trim) {
        Some("production") => "info",
        Some("test") => "off",
        _ => "debug",
    }
}

/// Build the filter: `RUST_LOG` when set, otherwise derived from `APP_ENV`.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let app_env = std::env::var("APP_ENV").ok();
        EnvFilter::new(default_directive(app_env.as_deref()))
    })
}

/// Install the global fmt subscriber. Calling it twice is harmless.
///
/// `log` records from the storage layer are forwarded through tracing's
/// `log` compatibility layer.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}

/// Hide the credentials part of a connection string.
pub fn mask_connection_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    match rest.rsplit_once('@') {
        Some((_, host)) => format!("{}://***@{}", scheme, host),
        None => uri.to_string(),
    }
}
