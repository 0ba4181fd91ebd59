//! Child event listing, creation and partial update.
//!
//! All checks run before anything is written. A write either passes every
//! check or leaves storage untouched.

use chrono::Utc;
use tracing::{info, warn};

use super::event_payload::EventPatch;
use super::event_validation::{validate_event, EventInput, NightBlockContext, ValidationContext};
use crate::api::DocumentId;
use crate::db::repository::{FullRepository, RepositoryError};
use crate::models::time::parse_timestamp;
use crate::models::{Event, EventFilter, EventType, Violation};

/// Maximum number of events returned by a listing.
pub const MAX_EVENTS: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum EventServiceError {
    #[error("Child not found")]
    ChildNotFound,

    #[error("Event not found")]
    EventNotFound,

    #[error("parentEventId not found for the provided child")]
    ParentNotFound,

    #[error("Invalid event payload")]
    Invalid(Vec<Violation>),

    /// The write went through but the record could not be read back.
    #[error("{0}")]
    Persistence(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Raw listing parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct EventListQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

fn parse_date_param(raw: Option<&str>, label: &str) -> Result<Option<chrono::DateTime<Utc>>, String> {
    let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(format!("{} must not be empty", label));
    }
    parse_timestamp(trimmed)
        .map(Some)
        .ok_or_else(|| format!("{} must be a valid ISO date", label))
}

impl EventListQuery {
    /// Validate the parameters into a filter for `child_id`.
    ///
    /// The error is the message for a `400` response.
    pub fn into_filter(self, child_id: DocumentId) -> Result<EventFilter, String> {
        let from = parse_date_param(self.from.as_deref(), "from")?;
        let to = parse_date_param(self.to.as_deref(), "to")?;

        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err("from must be earlier than to".to_string());
            }
        }

        let event_type = match self.event_type.as_deref().filter(|raw| !raw.is_empty()) {
            None => None,
            Some(raw) => Some(
                raw.parse::<EventType>()
                    .map_err(|_| "Invalid event type".to_string())?,
            ),
        };

        Ok(EventFilter {
            child_id,
            event_type,
            from,
            to,
            limit: MAX_EVENTS,
        })
    }
}

async fn ensure_child_exists(
    repo: &dyn FullRepository,
    child_id: DocumentId,
) -> Result<(), EventServiceError> {
    if repo.child_exists(child_id).await? {
        Ok(())
    } else {
        warn!(child_id = %child_id, "child not found");
        Err(EventServiceError::ChildNotFound)
    }
}

/// Build the validation context from the candidate's parent reference.
///
/// With no parent the context is empty. A parent that does not exist for
/// this child rejects the write.
pub async fn resolve_validation_context(
    repo: &dyn FullRepository,
    child_id: DocumentId,
    parent_event_id: Option<DocumentId>,
) -> Result<ValidationContext, EventServiceError> {
    let Some(parent_event_id) = parent_event_id else {
        return Ok(ValidationContext::default());
    };

    let parent = repo
        .find_event(child_id, parent_event_id)
        .await?
        .ok_or(EventServiceError::ParentNotFound)?;

    Ok(ValidationContext::with_block(NightBlockContext {
        event_id: parent.id,
        start_time: parent.start_time,
        end_time: parent.end_time,
    }))
}

/// List a child's events matching `filter`.
pub async fn list_events(
    repo: &dyn FullRepository,
    filter: &EventFilter,
) -> Result<Vec<Event>, EventServiceError> {
    ensure_child_exists(repo, filter.child_id).await?;

    let events = repo.list_events(filter).await?;
    info!(
        child_id = %filter.child_id,
        count = events.len(),
        event_type = ?filter.event_type,
        "child events retrieved"
    );
    Ok(events)
}

/// Validate and store a new event.
pub async fn create_event(
    repo: &dyn FullRepository,
    input: EventInput,
) -> Result<Event, EventServiceError> {
    let child_id = input.child_id;
    ensure_child_exists(repo, child_id).await?;

    let context = resolve_validation_context(repo, child_id, input.parent_event_id).await?;
    let draft = validate_event(&input, &context).map_err(EventServiceError::Invalid)?;

    let event_id = repo.insert_event(draft).await?;
    let event = repo
        .find_event(child_id, event_id)
        .await?
        .ok_or_else(|| EventServiceError::Persistence("Failed to load inserted event".to_string()))?;

    info!(
        child_id = %child_id,
        event_id = %event_id,
        event_type = %event.event_type,
        "child event created"
    );
    Ok(event)
}

/// Merge `patch` into a stored event, revalidate the whole record, and write
/// only the patched fields.
pub async fn patch_event(
    repo: &dyn FullRepository,
    child_id: DocumentId,
    event_id: DocumentId,
    patch: &EventPatch,
) -> Result<Event, EventServiceError> {
    ensure_child_exists(repo, child_id).await?;

    let existing = match repo.find_event(child_id, event_id).await? {
        Some(event) => event,
        None => {
            warn!(child_id = %child_id, event_id = %event_id, "event not found");
            return Err(EventServiceError::EventNotFound);
        }
    };

    let candidate = patch.merge(&existing, Utc::now());
    let context = resolve_validation_context(repo, child_id, candidate.parent_event_id).await?;
    let validated = validate_event(&candidate, &context).map_err(EventServiceError::Invalid)?;

    let update = patch.to_update(&validated);
    if !repo.update_event(child_id, event_id, &update).await? {
        warn!(child_id = %child_id, event_id = %event_id, "event not found during update");
        return Err(EventServiceError::EventNotFound);
    }

    let event = repo
        .find_event(child_id, event_id)
        .await?
        .ok_or_else(|| EventServiceError::Persistence("Failed to load updated event".to_string()))?;

    info!(child_id = %child_id, event_id = %event_id, "child event updated");
    Ok(event)
}
