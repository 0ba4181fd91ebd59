//! Child-care event records.
//!
//! An [`Event`] is a point or interval occurrence belonging to a child: sleep
//! blocks, night wakes, feedings, medication. [`EventDraft`] is the same
//! record before it has been assigned an identifier, as produced by the
//! validation pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::time::{iso_millis, iso_millis_option};
use super::violation::{non_negative, Violation};
use crate::api::DocumentId;

/// Kind of event. The wire form is snake_case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SleepStart,
    SleepEnd,
    NightWake,
    FeedingBottle,
    FeedingBreast,
    FeedingSolids,
    Medication,
    Extra,
}

impl EventType {
    pub const ALL: [EventType; 8] = [
        EventType::SleepStart,
        EventType::SleepEnd,
        EventType::NightWake,
        EventType::FeedingBottle,
        EventType::FeedingBreast,
        EventType::FeedingSolids,
        EventType::Medication,
        EventType::Extra,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::SleepStart => "sleep_start",
            EventType::SleepEnd => "sleep_end",
            EventType::NightWake => "night_wake",
            EventType::FeedingBottle => "feeding_bottle",
            EventType::FeedingBreast => "feeding_breast",
            EventType::FeedingSolids => "feeding_solids",
            EventType::Medication => "medication",
            EventType::Extra => "extra",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|event_type| event_type.as_str() == s)
            .ok_or_else(|| format!("Unknown event type: {}", s))
    }
}

/// Where an event came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    #[default]
    Manual,
    Imported,
    Sensor,
}

impl EventSource {
    pub const ALL: [EventSource; 3] = [EventSource::Manual, EventSource::Imported, EventSource::Sensor];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Manual => "manual",
            EventSource::Imported => "imported",
            EventSource::Sensor => "sensor",
        }
    }
}

impl FromStr for EventSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventSource::ALL
            .iter()
            .copied()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| format!("Unknown event source: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedingSide {
    Left,
    Right,
}

/// Feeding-specific details carried in [`EventMeta::feeding`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FeedingDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_ml: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<FeedingSide>,
}

/// Optional metadata attached to an event.
///
/// Unknown keys are rejected at deserialization time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caregiver_id: Option<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feeding: Option<FeedingDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub night_feeding: Option<bool>,
}

impl EventMeta {
    /// Trim free-text fields.
    pub fn normalized(mut self) -> Self {
        self.notes = self.notes.map(|notes| notes.trim().to_string());
        if let Some(feeding) = self.feeding.as_mut() {
            feeding.formula = feeding.formula.take().map(|formula| formula.trim().to_string());
        }
        self
    }

    /// Numeric range checks that serde cannot express.
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        non_negative("meta.durationMinutes", self.duration_minutes, &mut violations);
        if let Some(feeding) = &self.feeding {
            non_negative("meta.feeding.volumeMl", feeding.volume_ml, &mut violations);
        }
        violations
    }

    pub fn is_night_feeding(&self) -> bool {
        self.night_feeding.unwrap_or(false)
    }
}

/// A candidate event that passed the shape checks and is ready for the
/// consistency rules and, after that, for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub child_id: DocumentId,
    pub event_type: EventType,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub parent_event_id: Option<DocumentId>,
    pub source: EventSource,
    pub meta: Option<EventMeta>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EventDraft {
    /// Attach an identifier, producing the stored form.
    pub fn into_event(self, id: DocumentId) -> Event {
        Event {
            id,
            child_id: self.child_id,
            event_type: self.event_type,
            start_time: self.start_time,
            end_time: self.end_time,
            parent_event_id: self.parent_event_id,
            source: self.source,
            meta: self.meta,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A stored event, serialized as the API representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: DocumentId,
    pub child_id: DocumentId,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(with = "iso_millis")]
    pub start_time: DateTime<Utc>,
    #[serde(default, with = "iso_millis_option", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<DocumentId>,
    #[serde(default)]
    pub source: EventSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<EventMeta>,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "iso_millis_option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A field that a partial update may set, clear, or leave alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldChange<T> {
    #[default]
    Keep,
    Set(T),
    Unset,
}

impl<T> FieldChange<T> {
    /// Build a change from a validated optional value.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(value) => FieldChange::Set(value),
            None => FieldChange::Unset,
        }
    }

    /// Apply the change to a stored value.
    pub fn apply(self, current: &mut Option<T>) {
        match self {
            FieldChange::Keep => {}
            FieldChange::Set(value) => *current = Some(value),
            FieldChange::Unset => *current = None,
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, FieldChange::Keep)
    }
}

/// Write description for a partial event update.
///
/// Only fields named by the request are touched; `updated_at` is always set.
#[derive(Debug, Clone, PartialEq)]
pub struct EventUpdate {
    pub event_type: Option<EventType>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: FieldChange<DateTime<Utc>>,
    pub parent_event_id: FieldChange<DocumentId>,
    pub source: Option<EventSource>,
    pub meta: FieldChange<EventMeta>,
    pub updated_at: DateTime<Utc>,
}

impl EventUpdate {
    /// An update that only bumps `updated_at`.
    pub fn touch(updated_at: DateTime<Utc>) -> Self {
        Self {
            event_type: None,
            start_time: None,
            end_time: FieldChange::Keep,
            parent_event_id: FieldChange::Keep,
            source: None,
            meta: FieldChange::Keep,
            updated_at,
        }
    }

    /// Apply this update to a stored event in place.
    pub fn apply_to(&self, event: &mut Event) {
        if let Some(event_type) = self.event_type {
            event.event_type = event_type;
        }
        if let Some(start_time) = self.start_time {
            event.start_time = start_time;
        }
        if let Some(source) = self.source {
            event.source = source;
        }
        self.end_time.clone().apply(&mut event.end_time);
        self.parent_event_id.clone().apply(&mut event.parent_event_id);
        self.meta.clone().apply(&mut event.meta);
        event.updated_at = Some(self.updated_at);
    }
}

/// Query filter for listing a child's events.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFilter {
    pub child_id: DocumentId,
    pub event_type: Option<EventType>,
    /// Inclusive lower bound on `start_time`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `start_time`
    pub to: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        event.child_id == self.child_id
            && self.event_type.map_or(true, |t| t == event.event_type)
            && self.from.map_or(true, |from| event.start_time >= from)
            && self.to.map_or(true, |to| event.start_time <= to)
    }
}
