#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use dreamers::api::DocumentId;
use dreamers::db::{ChildRepository, FullRepository, LocalRepository};
use dreamers::models::Child;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Gateway secret used by HTTP tests.
pub const TEST_SECRET: &str = "test-gateway-secret";

/// A complete, valid set of required environment variables.
pub const COMPLETE_ENV: [(&str, Option<&str>); 5] = [
    ("ZOOM_WEBHOOK_SECRET", Some("zoom-secret")),
    ("GOOGLE_DRIVE_SERVICE_ACCOUNT_KEY", Some("{\"type\":\"service_account\"}")),
    ("MONGODB_URI", Some("mongodb://localhost:27017/dreamers")),
    ("AUTH_SECRET", Some(TEST_SECRET)),
    ("ENABLE_DEBUG_ENDPOINTS", None),
];

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the variables on unwind and serializes access to the process
/// environment, since tests run in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

/// Runs an async block on a fresh runtime inside [`with_scoped_env`].
pub fn block_on_with_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: std::future::Future<Output = R>,
{
    with_scoped_env(changes, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("test runtime")
            .block_on(f)
    })
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

pub fn local_repo() -> (Arc<LocalRepository>, Arc<dyn FullRepository>) {
    let local = Arc::new(LocalRepository::new());
    let repo = local.clone() as Arc<dyn FullRepository>;
    (local, repo)
}

/// Store a child and return its id.
pub async fn seed_child(repo: &dyn FullRepository) -> DocumentId {
    let child = Child::new(
        DocumentId::generate(),
        DocumentId::generate(),
        "Lucía",
        Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap(),
    );
    repo.insert_child(child).await.expect("seed child")
}
