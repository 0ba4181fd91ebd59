//! MongoDB repository implementation.
//!
//! Documents use native BSON types: `ObjectId` for identifiers and BSON dates
//! for timestamps. Older documents that stored timestamps as strings are
//! still readable.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `MONGODB_URI`: Connection string (required)
//! - `MONGODB_DATABASE`: Database name (default: the one named in the URI, else `dreamers`)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Bson, Document};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use std::time::Duration;

use crate::api::DocumentId;
use crate::db::repository::{
    ChildRepository, ErrorContext, EventRepository, MaintenanceRepository, RepositoryError,
    RepositoryResult, UserRepository, CHILDREN_PARENT_INDEX, EVENTS_CHILD_START_INDEX,
    PLANS_CHILD_STATUS_INDEX,
};
use crate::logging::mask_connection_uri;
use crate::models::time::parse_timestamp;
use crate::models::{
    Child, Event, EventDraft, EventFilter, EventMeta, EventUpdate, FieldChange, User, UserProfile,
};
use crate::auth::Role;

const EVENTS: &str = "events";
const CHILDREN: &str = "children";
const PLANS: &str = "plans";
const USERS: &str = "users";

const DEFAULT_DATABASE: &str = "dreamers";

/// Configuration for connecting to MongoDB.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    /// Database name; `None` uses the database named in the URI
    pub database: Option<String>,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub max_idle_time_ms: u64,
    pub retry_writes: bool,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: String::new(),
            database: None,
            max_pool_size: 10,
            min_pool_size: 2,
            max_idle_time_ms: 30_000,
            retry_writes: true,
        }
    }
}

impl MongoConfig {
    pub fn from_env() -> Result<Self, String> {
        let uri = std::env::var("MONGODB_URI")
            .ok()
            .filter(|uri| !uri.trim().is_empty())
            .ok_or_else(|| "MONGODB_URI must be set".to_string())?;
        let database = std::env::var("MONGODB_DATABASE")
            .ok()
            .filter(|name| !name.trim().is_empty());

        Ok(Self {
            uri,
            database,
            ..Default::default()
        })
    }
}

/// MongoDB-backed implementation of every repository trait.
#[derive(Debug, Clone)]
pub struct MongoRepository {
    db: Database,
    config: MongoConfig,
}

impl MongoRepository {
    /// Build a client with the configured pool bounds.
    ///
    /// The driver connects lazily, so this succeeds without a reachable server.
    pub async fn connect(config: MongoConfig) -> RepositoryResult<Self> {
        log::debug!("Creating MongoDB client for {}", mask_connection_uri(&config.uri));

        let mut options = ClientOptions::parse(&config.uri).await.map_err(|e| {
            RepositoryError::configuration(format!("Invalid MongoDB URI: {}", e))
        })?;
        options.max_pool_size = Some(config.max_pool_size);
        options.min_pool_size = Some(config.min_pool_size);
        options.max_idle_time = Some(Duration::from_millis(config.max_idle_time_ms));
        options.retry_writes = Some(config.retry_writes);

        let client = Client::with_options(options)?;
        let db = match config.database.as_deref() {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(DEFAULT_DATABASE)),
        };

        log::info!("MongoDB repository using database '{}'", db.name());
        Ok(Self { db, config })
    }

    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

// =============================================================================
// BSON conversion
// =============================================================================

fn oid(id: DocumentId) -> ObjectId {
    ObjectId::from_bytes(id.bytes())
}

fn doc_id(id: ObjectId) -> DocumentId {
    DocumentId::from_bytes(id.bytes())
}

fn bson_date(value: DateTime<Utc>) -> Bson {
    Bson::DateTime(bson::DateTime::from_millis(value.timestamp_millis()))
}

fn read_date(doc: &Document, key: &str) -> Option<DateTime<Utc>> {
    match doc.get(key)? {
        Bson::DateTime(value) => DateTime::from_timestamp_millis(value.timestamp_millis()),
        Bson::String(raw) => parse_timestamp(raw),
        _ => None,
    }
}

fn read_oid(doc: &Document, key: &str) -> Option<DocumentId> {
    match doc.get(key)? {
        Bson::ObjectId(value) => Some(doc_id(*value)),
        Bson::String(raw) => DocumentId::parse_str(raw).ok(),
        _ => None,
    }
}

fn decode_error(collection: &str, doc: &Document, details: impl Into<String>) -> RepositoryError {
    let mut context = ErrorContext::new("decode").with_entity(collection).with_details(details);
    if let Ok(id) = doc.get_object_id("_id") {
        context = context.with_entity_id(id.to_hex());
    }
    RepositoryError::validation_with_context("Stored document has an unexpected shape", context)
}

fn meta_to_document(meta: &EventMeta) -> RepositoryResult<Document> {
    let mut document = bson::to_document(meta)
        .map_err(|e| RepositoryError::internal(format!("Serialization error: {}", e)))?;
    if let Some(caregiver_id) = meta.caregiver_id {
        document.insert("caregiverId", oid(caregiver_id));
    }
    Ok(document)
}

fn meta_from_document(mut document: Document) -> Result<EventMeta, String> {
    if let Some(Bson::ObjectId(caregiver_id)) = document.get("caregiverId").cloned() {
        document.insert("caregiverId", caregiver_id.to_hex());
    }
    bson::from_document(document).map_err(|e| e.to_string())
}

fn draft_to_document(draft: &EventDraft) -> RepositoryResult<Document> {
    let mut document = doc! {
        "childId": oid(draft.child_id),
        "type": draft.event_type.as_str(),
        "startTime": bson_date(draft.start_time),
        "source": draft.source.as_str(),
        "createdAt": bson_date(draft.created_at),
    };
    if let Some(end_time) = draft.end_time {
        document.insert("endTime", bson_date(end_time));
    }
    if let Some(parent_event_id) = draft.parent_event_id {
        document.insert("parentEventId", oid(parent_event_id));
    }
    if let Some(meta) = &draft.meta {
        document.insert("meta", meta_to_document(meta)?);
    }
    if let Some(updated_at) = draft.updated_at {
        document.insert("updatedAt", bson_date(updated_at));
    }
    Ok(document)
}

fn document_to_event(document: Document) -> RepositoryResult<Event> {
    let id = document
        .get_object_id("_id")
        .map_err(|e| decode_error(EVENTS, &document, e.to_string()))?;
    let child_id =
        read_oid(&document, "childId").ok_or_else(|| decode_error(EVENTS, &document, "childId"))?;
    let event_type = document
        .get_str("type")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| decode_error(EVENTS, &document, "type"))?;
    let start_time = read_date(&document, "startTime")
        .ok_or_else(|| decode_error(EVENTS, &document, "startTime"))?;
    let source = match document.get_str("source") {
        Ok(raw) => raw.parse().map_err(|e: String| decode_error(EVENTS, &document, e))?,
        Err(_) => Default::default(),
    };
    let meta = match document.get_document("meta") {
        Ok(meta) => Some(
            meta_from_document(meta.clone()).map_err(|e| decode_error(EVENTS, &document, e))?,
        ),
        Err(_) => None,
    };

    Ok(Event {
        id: doc_id(id),
        child_id,
        event_type,
        start_time,
        end_time: read_date(&document, "endTime"),
        parent_event_id: read_oid(&document, "parentEventId"),
        source,
        meta,
        // Documents written without a creation time report their start.
        created_at: read_date(&document, "createdAt").unwrap_or(start_time),
        updated_at: read_date(&document, "updatedAt"),
    })
}

fn update_to_document(update: &EventUpdate) -> RepositoryResult<Document> {
    let mut set = doc! { "updatedAt": bson_date(update.updated_at) };
    let mut unset = Document::new();

    if let Some(event_type) = update.event_type {
        set.insert("type", event_type.as_str());
    }
    if let Some(start_time) = update.start_time {
        set.insert("startTime", bson_date(start_time));
    }
    if let Some(source) = update.source {
        set.insert("source", source.as_str());
    }
    match &update.end_time {
        FieldChange::Keep => {}
        FieldChange::Set(end_time) => {
            set.insert("endTime", bson_date(*end_time));
        }
        FieldChange::Unset => {
            unset.insert("endTime", "");
        }
    }
    match &update.parent_event_id {
        FieldChange::Keep => {}
        FieldChange::Set(parent) => {
            set.insert("parentEventId", oid(*parent));
        }
        FieldChange::Unset => {
            unset.insert("parentEventId", "");
        }
    }
    match &update.meta {
        FieldChange::Keep => {}
        FieldChange::Set(meta) => {
            set.insert("meta", meta_to_document(meta)?);
        }
        FieldChange::Unset => {
            unset.insert("meta", "");
        }
    }

    let mut operation = doc! { "$set": set };
    if !unset.is_empty() {
        operation.insert("$unset", unset);
    }
    Ok(operation)
}

fn child_to_document(child: &Child) -> RepositoryResult<Document> {
    let mut document = doc! {
        "_id": oid(child.id),
        "parentId": oid(child.parent_id),
        "firstName": child.first_name.as_str(),
        "birthDate": bson_date(child.birth_date),
        "timezone": child.timezone.as_str(),
        "tags": child.tags.clone(),
        "createdAt": bson_date(child.created_at),
    };
    if let Some(last_name) = &child.last_name {
        document.insert("lastName", last_name.as_str());
    }
    if let Some(active_plan_id) = child.active_plan_id {
        document.insert("activePlanId", oid(active_plan_id));
    }
    if let Some(updated_at) = child.updated_at {
        document.insert("updatedAt", bson_date(updated_at));
    }
    if let Some(meta) = &child.meta {
        let meta = bson::to_document(meta)
            .map_err(|e| RepositoryError::internal(format!("Serialization error: {}", e)))?;
        document.insert("meta", meta);
    }
    Ok(document)
}

fn user_to_document(user: &User) -> RepositoryResult<Document> {
    let mut document = doc! {
        "_id": oid(user.id),
        "email": user.email.as_str(),
        "role": user.role.as_str(),
        "createdAt": bson_date(user.created_at),
    };
    if let Some(updated_at) = user.updated_at {
        document.insert("updatedAt", bson_date(updated_at));
    }
    if let Some(profile) = &user.profile {
        let profile = bson::to_document(profile)
            .map_err(|e| RepositoryError::internal(format!("Serialization error: {}", e)))?;
        document.insert("profile", profile);
    }
    Ok(document)
}

fn document_to_user(document: Document) -> RepositoryResult<User> {
    let id = document
        .get_object_id("_id")
        .map_err(|e| decode_error(USERS, &document, e.to_string()))?;
    let profile = document
        .get_document("profile")
        .ok()
        .and_then(|profile| bson::from_document::<UserProfile>(profile.clone()).ok());

    Ok(User {
        id: doc_id(id),
        email: document.get_str("email").unwrap_or_default().to_string(),
        role: document
            .get_str("role")
            .map(Role::parse_lenient)
            .unwrap_or_default(),
        created_at: read_date(&document, "createdAt")
            .or_else(|| DateTime::from_timestamp_millis(id.timestamp().timestamp_millis()))
            .unwrap_or_default(),
        updated_at: read_date(&document, "updatedAt"),
        profile,
    })
}

fn event_query(filter: &EventFilter) -> Document {
    let mut query = doc! { "childId": oid(filter.child_id) };
    if let Some(event_type) = filter.event_type {
        query.insert("type", event_type.as_str());
    }
    if filter.from.is_some() || filter.to.is_some() {
        let mut range = Document::new();
        if let Some(from) = filter.from {
            range.insert("$gte", bson_date(from));
        }
        if let Some(to) = filter.to {
            range.insert("$lte", bson_date(to));
        }
        query.insert("startTime", range);
    }
    query
}

// =============================================================================
// Trait implementations
// =============================================================================

#[async_trait]
impl ChildRepository for MongoRepository {
    async fn child_exists(&self, child_id: DocumentId) -> RepositoryResult<bool> {
        let found = self
            .collection(CHILDREN)
            .find_one(doc! { "_id": oid(child_id) })
            .projection(doc! { "_id": 1 })
            .await
            .map_err(|e| RepositoryError::from(e).with_operation("child_exists").with_entity(CHILDREN))?;
        Ok(found.is_some())
    }

    async fn insert_child(&self, child: Child) -> RepositoryResult<DocumentId> {
        let document = child_to_document(&child)?;
        self.collection(CHILDREN)
            .insert_one(document)
            .await
            .map_err(|e| RepositoryError::from(e).with_operation("insert_child").with_entity(CHILDREN))?;
        Ok(child.id)
    }
}

#[async_trait]
impl EventRepository for MongoRepository {
    async fn list_events(&self, filter: &EventFilter) -> RepositoryResult<Vec<Event>> {
        let documents: Vec<Document> = self
            .collection(EVENTS)
            .find(event_query(filter))
            .sort(doc! { "startTime": 1, "_id": 1 })
            .limit(filter.limit as i64)
            .await?
            .try_collect()
            .await
            .map_err(|e| RepositoryError::from(e).with_operation("list_events").with_entity(EVENTS))?;

        documents.into_iter().map(document_to_event).collect()
    }

    async fn find_event(
        &self,
        child_id: DocumentId,
        event_id: DocumentId,
    ) -> RepositoryResult<Option<Event>> {
        let found = self
            .collection(EVENTS)
            .find_one(doc! { "_id": oid(event_id), "childId": oid(child_id) })
            .await
            .map_err(|e| RepositoryError::from(e).with_operation("find_event").with_entity(EVENTS))?;
        found.map(document_to_event).transpose()
    }

    async fn insert_event(&self, draft: EventDraft) -> RepositoryResult<DocumentId> {
        let result = self
            .collection(EVENTS)
            .insert_one(draft_to_document(&draft)?)
            .await
            .map_err(|e| RepositoryError::from(e).with_operation("insert_event").with_entity(EVENTS))?;

        match result.inserted_id {
            Bson::ObjectId(id) => Ok(doc_id(id)),
            other => Err(RepositoryError::internal(format!(
                "Unexpected inserted id type: {:?}",
                other.element_type()
            ))),
        }
    }

    async fn update_event(
        &self,
        child_id: DocumentId,
        event_id: DocumentId,
        update: &EventUpdate,
    ) -> RepositoryResult<bool> {
        let result = self
            .collection(EVENTS)
            .update_one(
                doc! { "_id": oid(event_id), "childId": oid(child_id) },
                update_to_document(update)?,
            )
            .await
            .map_err(|e| RepositoryError::from(e).with_operation("update_event").with_entity(EVENTS))?;
        Ok(result.matched_count > 0)
    }
}

#[async_trait]
impl UserRepository for MongoRepository {
    async fn list_users(&self, limit: usize) -> RepositoryResult<Vec<User>> {
        let documents: Vec<Document> = self
            .collection(USERS)
            .find(doc! {})
            .projection(doc! { "email": 1, "role": 1, "createdAt": 1 })
            .limit(limit as i64)
            .await?
            .try_collect()
            .await
            .map_err(|e| RepositoryError::from(e).with_operation("list_users").with_entity(USERS))?;

        documents.into_iter().map(document_to_user).collect()
    }

    async fn insert_user(&self, user: User) -> RepositoryResult<DocumentId> {
        self.collection(USERS)
            .insert_one(user_to_document(&user)?)
            .await
            .map_err(|e| RepositoryError::from(e).with_operation("insert_user").with_entity(USERS))?;
        Ok(user.id)
    }
}

#[async_trait]
impl MaintenanceRepository for MongoRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        match self.db.run_command(doc! { "ping": 1 }).await {
            Ok(_) => Ok(true),
            Err(e) => {
                log::warn!("MongoDB health check failed: {}", e);
                Err(RepositoryError::from(e).with_operation("health_check"))
            }
        }
    }

    async fn ensure_indexes(&self) -> RepositoryResult<Vec<String>> {
        let specs = [
            (EVENTS, doc! { "childId": 1, "startTime": 1 }, EVENTS_CHILD_START_INDEX),
            (CHILDREN, doc! { "parentId": 1 }, CHILDREN_PARENT_INDEX),
            (PLANS, doc! { "childId": 1, "status": 1 }, PLANS_CHILD_STATUS_INDEX),
        ];

        let mut ensured = Vec::with_capacity(specs.len());
        for (collection, keys, name) in specs {
            let model = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(name.to_string()).build())
                .build();
            self.collection(collection)
                .create_index(model)
                .await
                .map_err(|e| {
                    RepositoryError::from(e)
                        .with_operation("ensure_indexes")
                        .with_entity(collection)
                })?;
            log::info!("Index {} ensured on {}", name, collection);
            ensured.push(name.to_string());
        }
        Ok(ensured)
    }
}
