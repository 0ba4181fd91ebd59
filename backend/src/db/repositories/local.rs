//! In-memory repository for unit testing and local development.
//!
//! Data lives in hash maps behind a single `parking_lot::RwLock`. Nothing is
//! persisted across restarts.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::api::DocumentId;
use crate::db::repository::{
    ChildRepository, ErrorContext, EventRepository, MaintenanceRepository, RepositoryError,
    RepositoryResult, UserRepository, CHILDREN_PARENT_INDEX, EVENTS_CHILD_START_INDEX,
    PLANS_CHILD_STATUS_INDEX,
};
use crate::models::{Child, Event, EventDraft, EventFilter, EventUpdate, User};

#[derive(Debug, Default)]
struct LocalData {
    children: HashMap<DocumentId, Child>,
    events: HashMap<DocumentId, Event>,
    users: HashMap<DocumentId, User>,
}

/// In-memory implementation of every repository trait.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
    healthy: Arc<AtomicBool>,
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRepository {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
            healthy: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Make `health_check` report the given state.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    fn ensure_healthy(&self, operation: &str) -> RepositoryResult<()> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepositoryError::connection_with_context(
                "Local repository is marked unavailable",
                ErrorContext::new(operation),
            ))
        }
    }

    /// Remove all stored documents.
    pub fn clear(&self) {
        let mut data = self.data.write();
        data.children.clear();
        data.events.clear();
        data.users.clear();
    }

    pub fn event_count(&self) -> usize {
        self.data.read().events.len()
    }

    /// Store a fully formed event, keeping its id. Intended for seeding.
    pub fn insert_raw_event(&self, event: Event) {
        self.data.write().events.insert(event.id, event);
    }
}

#[async_trait]
impl ChildRepository for LocalRepository {
    async fn child_exists(&self, child_id: DocumentId) -> RepositoryResult<bool> {
        self.ensure_healthy("child_exists")?;
        Ok(self.data.read().children.contains_key(&child_id))
    }

    async fn insert_child(&self, child: Child) -> RepositoryResult<DocumentId> {
        self.ensure_healthy("insert_child")?;
        let mut data = self.data.write();
        if data.children.contains_key(&child.id) {
            return Err(RepositoryError::query_with_context(
                "Duplicate key",
                ErrorContext::new("insert_child")
                    .with_entity("children")
                    .with_entity_id(child.id),
            ));
        }
        let id = child.id;
        data.children.insert(id, child);
        Ok(id)
    }
}

#[async_trait]
impl EventRepository for LocalRepository {
    async fn list_events(&self, filter: &EventFilter) -> RepositoryResult<Vec<Event>> {
        self.ensure_healthy("list_events")?;
        let data = self.data.read();
        let mut events: Vec<Event> = data
            .events
            .values()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
        events.truncate(filter.limit);
        Ok(events)
    }

    async fn find_event(
        &self,
        child_id: DocumentId,
        event_id: DocumentId,
    ) -> RepositoryResult<Option<Event>> {
        self.ensure_healthy("find_event")?;
        Ok(self
            .data
            .read()
            .events
            .get(&event_id)
            .filter(|event| event.child_id == child_id)
            .cloned())
    }

    async fn insert_event(&self, draft: EventDraft) -> RepositoryResult<DocumentId> {
        self.ensure_healthy("insert_event")?;
        let id = DocumentId::generate();
        self.data.write().events.insert(id, draft.into_event(id));
        log::debug!("Inserted event {} into local repository", id);
        Ok(id)
    }

    async fn update_event(
        &self,
        child_id: DocumentId,
        event_id: DocumentId,
        update: &EventUpdate,
    ) -> RepositoryResult<bool> {
        self.ensure_healthy("update_event")?;
        let mut data = self.data.write();
        match data.events.get_mut(&event_id) {
            Some(event) if event.child_id == child_id => {
                update.apply_to(event);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl UserRepository for LocalRepository {
    async fn list_users(&self, limit: usize) -> RepositoryResult<Vec<User>> {
        self.ensure_healthy("list_users")?;
        let data = self.data.read();
        let mut users: Vec<User> = data.users.values().cloned().collect();
        users.sort_by_key(|user| user.id);
        users.truncate(limit);
        Ok(users)
    }

    async fn insert_user(&self, user: User) -> RepositoryResult<DocumentId> {
        self.ensure_healthy("insert_user")?;
        let id = user.id;
        self.data.write().users.insert(id, user);
        Ok(id)
    }
}

#[async_trait]
impl MaintenanceRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.healthy.load(Ordering::SeqCst))
    }

    async fn ensure_indexes(&self) -> RepositoryResult<Vec<String>> {
        self.ensure_healthy("ensure_indexes")?;
        log::info!("Local repository keeps no indexes; nothing to create");
        Ok(vec![
            EVENTS_CHILD_START_INDEX.to_string(),
            CHILDREN_PARENT_INDEX.to_string(),
            PLANS_CHILD_STATUS_INDEX.to_string(),
        ])
    }
}
