//! Repository traits for document storage.
//!
//! Storage is split by collection so that handlers and services depend only on
//! what they use. [`FullRepository`] is the combined trait that backends
//! implement and that [`crate::http::AppState`] holds.

pub mod error;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

use async_trait::async_trait;

use crate::api::DocumentId;
use crate::models::{Child, Event, EventDraft, EventFilter, EventUpdate, User};

/// Names of the indexes ensured by [`MaintenanceRepository::ensure_indexes`].
pub const EVENTS_CHILD_START_INDEX: &str = "events_childId_startTime";
pub const CHILDREN_PARENT_INDEX: &str = "children_parentId";
pub const PLANS_CHILD_STATUS_INDEX: &str = "plans_childId_status";

#[async_trait]
pub trait ChildRepository: Send + Sync {
    /// Whether a child with this id exists.
    async fn child_exists(&self, child_id: DocumentId) -> RepositoryResult<bool>;

    async fn insert_child(&self, child: Child) -> RepositoryResult<DocumentId>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Events matching `filter`, sorted by start time then id, at most
    /// `filter.limit` of them.
    async fn list_events(&self, filter: &EventFilter) -> RepositoryResult<Vec<Event>>;

    /// Look up an event scoped to its owning child.
    async fn find_event(
        &self,
        child_id: DocumentId,
        event_id: DocumentId,
    ) -> RepositoryResult<Option<Event>>;

    /// Persist a validated draft and return the new id.
    async fn insert_event(&self, draft: EventDraft) -> RepositoryResult<DocumentId>;

    /// Apply a partial update. Returns `false` when no event matched.
    async fn update_event(
        &self,
        child_id: DocumentId,
        event_id: DocumentId,
        update: &EventUpdate,
    ) -> RepositoryResult<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_users(&self, limit: usize) -> RepositoryResult<Vec<User>>;

    async fn insert_user(&self, user: User) -> RepositoryResult<DocumentId>;
}

#[async_trait]
pub trait MaintenanceRepository: Send + Sync {
    /// Ping the backend.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Create the secondary indexes. Returns the names that were ensured.
    async fn ensure_indexes(&self) -> RepositoryResult<Vec<String>>;
}

/// Everything a backend must provide.
pub trait FullRepository:
    ChildRepository + EventRepository + UserRepository + MaintenanceRepository
{
}

impl<T> FullRepository for T where
    T: ChildRepository + EventRepository + UserRepository + MaintenanceRepository
{
}
