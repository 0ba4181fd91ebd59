//! Request-body parsing for event writes.
//!
//! These checks run before any storage access. Their failures map directly to
//! `400` responses with a fixed message, unlike validation violations which
//! are reported as a list.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::event_validation::EventInput;
use crate::api::DocumentId;
use crate::models::time::{parse_timestamp, to_iso_string};
use crate::models::{Event, EventDraft, EventType, EventUpdate, FieldChange};

/// Fields a PATCH request may touch.
pub const ALLOWED_PATCH_FIELDS: [&str; 6] =
    ["type", "startTime", "endTime", "parentEventId", "source", "meta"];

/// A request body that cannot be turned into a candidate event.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct PayloadError {
    pub message: String,
    /// Offending keys, for allow-list failures
    pub fields: Option<Vec<String>>,
}

impl PayloadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: None,
        }
    }

    pub fn with_fields(message: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            message: message.into(),
            fields: Some(fields),
        }
    }
}

fn as_object(payload: Value) -> Result<Map<String, Value>, PayloadError> {
    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(PayloadError::new("Payload must be an object")),
    }
}

fn non_null(value: Option<Value>) -> Option<Value> {
    value.filter(|value| !value.is_null())
}

/// Parse a POST body into a candidate for `child_id`.
///
/// Keys other than the event fields are ignored.
pub fn parse_create_payload(payload: Value, child_id: DocumentId) -> Result<EventInput, PayloadError> {
    let mut body = as_object(payload)?;

    let parent_event_id = match non_null(body.remove("parentEventId")) {
        None => None,
        Some(Value::String(raw)) => Some(
            DocumentId::parse_str(&raw)
                .map_err(|_| PayloadError::new("parentEventId must be a valid identifier"))?,
        ),
        Some(_) => return Err(PayloadError::new("parentEventId must be a valid identifier")),
    };

    let meta = match non_null(body.remove("meta")) {
        None => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => return Err(PayloadError::new("meta must be an object")),
    };

    Ok(EventInput {
        child_id,
        event_type: body.remove("type"),
        start_time: body.remove("startTime"),
        end_time: non_null(body.remove("endTime")),
        parent_event_id,
        source: non_null(body.remove("source")),
        meta,
        created_at: None,
        updated_at: None,
    })
}

/// A parsed PATCH body. Only the keys the request named are set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub event_type: Option<EventType>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: FieldChange<DateTime<Utc>>,
    pub parent_event_id: FieldChange<DocumentId>,
    /// Enumeration membership is checked by the schema stage
    pub source: Option<String>,
    pub meta: FieldChange<Map<String, Value>>,
}

/// Parse a PATCH body, enforcing the allow-list and per-field types.
pub fn parse_patch_payload(payload: Value) -> Result<EventPatch, PayloadError> {
    let body = as_object(payload)?;

    if body.is_empty() {
        return Err(PayloadError::new("Payload must not be empty"));
    }

    let unknown: Vec<String> = body
        .keys()
        .filter(|key| !ALLOWED_PATCH_FIELDS.contains(&key.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(PayloadError::with_fields("Unsupported fields in payload", unknown));
    }

    let mut patch = EventPatch::default();

    if let Some(raw) = body.get("type") {
        patch.event_type = Some(
            raw.as_str()
                .and_then(|raw| raw.parse().ok())
                .ok_or_else(|| PayloadError::new("Invalid event type"))?,
        );
    }

    if let Some(raw) = body.get("startTime") {
        let raw = raw
            .as_str()
            .ok_or_else(|| PayloadError::new("startTime must be an ISO string"))?;
        patch.start_time = Some(
            parse_timestamp(raw).ok_or_else(|| PayloadError::new("startTime must be a valid ISO date"))?,
        );
    }

    if let Some(raw) = body.get("endTime") {
        patch.end_time = match raw {
            Value::Null => FieldChange::Unset,
            Value::String(raw) => FieldChange::Set(
                parse_timestamp(raw)
                    .ok_or_else(|| PayloadError::new("endTime must be a valid ISO date"))?,
            ),
            _ => return Err(PayloadError::new("endTime must be null or an ISO string")),
        };
    }

    if let Some(raw) = body.get("parentEventId") {
        let invalid = || PayloadError::new("parentEventId must be a valid identifier or null");
        patch.parent_event_id = match raw {
            Value::Null => FieldChange::Unset,
            Value::String(raw) => FieldChange::Set(DocumentId::parse_str(raw).map_err(|_| invalid())?),
            _ => return Err(invalid()),
        };
    }

    if let Some(raw) = body.get("source") {
        match raw.as_str() {
            Some(source) if !source.trim().is_empty() => patch.source = Some(source.to_string()),
            _ => return Err(PayloadError::new("source must be a non-empty string")),
        }
    }

    if let Some(raw) = body.get("meta") {
        patch.meta = match raw {
            Value::Null => FieldChange::Unset,
            Value::Object(map) => FieldChange::Set(map.clone()),
            _ => return Err(PayloadError::new("meta must be an object or null")),
        };
    }

    Ok(patch)
}

fn merge_field<T: Clone>(change: &FieldChange<T>, stored: Option<T>) -> Option<T> {
    match change {
        FieldChange::Keep => stored,
        FieldChange::Set(value) => Some(value.clone()),
        FieldChange::Unset => None,
    }
}

impl EventPatch {
    /// The stored record with this patch applied, as a full candidate.
    ///
    /// `created_at` is carried over and `updated_at` is set to `now`.
    pub fn merge(&self, existing: &Event, now: DateTime<Utc>) -> EventInput {
        let stored_meta = existing
            .meta
            .as_ref()
            .and_then(|meta| serde_json::to_value(meta).ok())
            .and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            });

        let event_type = self.event_type.unwrap_or(existing.event_type);
        let start_time = self.start_time.unwrap_or(existing.start_time);
        let end_time = merge_field(&self.end_time, existing.end_time);
        let source = self
            .source
            .clone()
            .unwrap_or_else(|| existing.source.as_str().to_string());

        EventInput {
            child_id: existing.child_id,
            event_type: Some(Value::String(event_type.as_str().to_string())),
            start_time: Some(Value::String(to_iso_string(&start_time))),
            end_time: end_time.map(|end| Value::String(to_iso_string(&end))),
            parent_event_id: merge_field(&self.parent_event_id, existing.parent_event_id),
            source: Some(Value::String(source)),
            meta: merge_field(&self.meta, stored_meta),
            created_at: Some(existing.created_at),
            updated_at: Some(now),
        }
    }

    /// The write for a validated merged record, touching only patched fields.
    pub fn to_update(&self, validated: &EventDraft) -> EventUpdate {
        EventUpdate {
            event_type: self.event_type.map(|_| validated.event_type),
            start_time: self.start_time.map(|_| validated.start_time),
            end_time: if self.end_time.is_keep() {
                FieldChange::Keep
            } else {
                FieldChange::from_option(validated.end_time)
            },
            parent_event_id: if self.parent_event_id.is_keep() {
                FieldChange::Keep
            } else {
                FieldChange::from_option(validated.parent_event_id)
            },
            source: self.source.as_ref().map(|_| validated.source),
            meta: if self.meta.is_keep() {
                FieldChange::Keep
            } else {
                FieldChange::from_option(validated.meta.clone())
            },
            updated_at: validated.updated_at.unwrap_or_else(Utc::now),
        }
    }
}
