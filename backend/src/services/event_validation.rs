//! Event validation.
//!
//! A candidate event goes through two stages:
//!
//! 1. **Schema**: the loosely typed [`EventInput`] is coerced into an
//!    [`EventDraft`]. Every shape problem is collected. If there is any, the
//!    second stage is skipped.
//! 2. **Rules**: independent consistency checks over the typed draft and the
//!    [`ValidationContext`]. Each rule appends its own violations and none
//!    of them stops another from running.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::api::DocumentId;
use crate::models::time::coerce_timestamp;
use crate::models::{EventDraft, EventMeta, EventSource, EventType, Violation};

/// The sleep block a `night_wake` must nest inside.
#[derive(Debug, Clone, PartialEq)]
pub struct NightBlockContext {
    pub event_id: DocumentId,
    pub start_time: DateTime<Utc>,
    /// `None` while the block is still open
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationContext {
    pub active_night_block: Option<NightBlockContext>,
}

impl ValidationContext {
    pub fn with_block(block: NightBlockContext) -> Self {
        Self {
            active_night_block: Some(block),
        }
    }
}

/// A candidate event before shape checks.
///
/// Identifier fields are already parsed by the payload layer; everything else
/// is kept as raw JSON so that all shape problems can be reported together.
#[derive(Debug, Clone, PartialEq)]
pub struct EventInput {
    pub child_id: DocumentId,
    pub event_type: Option<Value>,
    pub start_time: Option<Value>,
    pub end_time: Option<Value>,
    pub parent_event_id: Option<DocumentId>,
    pub source: Option<Value>,
    pub meta: Option<Map<String, Value>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EventInput {
    pub fn new(child_id: DocumentId) -> Self {
        Self {
            child_id,
            event_type: None,
            start_time: None,
            end_time: None,
            parent_event_id: None,
            source: None,
            meta: None,
            created_at: None,
            updated_at: None,
        }
    }
}

fn present(value: &Option<Value>) -> Option<&Value> {
    value.as_ref().filter(|value| !value.is_null())
}

fn parse_event_type(value: Option<&Value>, violations: &mut Vec<Violation>) -> Option<EventType> {
    let Some(value) = value else {
        violations.push(Violation::new("type", "is required"));
        return None;
    };
    match value.as_str().and_then(|raw| raw.parse::<EventType>().ok()) {
        Some(event_type) => Some(event_type),
        None => {
            let allowed: Vec<&str> = EventType::ALL.iter().map(|t| t.as_str()).collect();
            violations.push(Violation::new(
                "type",
                format!("must be one of {}", allowed.join(", ")),
            ));
            None
        }
    }
}

fn parse_time(
    field: &str,
    value: Option<&Value>,
    violations: &mut Vec<Violation>,
) -> Option<DateTime<Utc>> {
    let value = value?;
    let parsed = coerce_timestamp(value);
    if parsed.is_none() {
        violations.push(Violation::new(field, "must be a valid date"));
    }
    parsed
}

fn parse_source(value: Option<&Value>, violations: &mut Vec<Violation>) -> Option<EventSource> {
    let Some(value) = value else {
        return Some(EventSource::default());
    };
    match value.as_str().and_then(|raw| raw.parse::<EventSource>().ok()) {
        Some(source) => Some(source),
        None => {
            violations.push(Violation::new("source", "must be one of manual, imported, sensor"));
            None
        }
    }
}

fn parse_meta(
    value: Option<&Map<String, Value>>,
    violations: &mut Vec<Violation>,
) -> Option<Option<EventMeta>> {
    let Some(map) = value else {
        return Some(None);
    };
    match serde_json::from_value::<EventMeta>(Value::Object(map.clone())) {
        Ok(meta) => {
            let meta = meta.normalized();
            let issues = meta.validate();
            if issues.is_empty() {
                Some(Some(meta))
            } else {
                violations.extend(issues);
                None
            }
        }
        Err(err) => {
            violations.push(Violation::new("meta", err.to_string()));
            None
        }
    }
}

/// Schema stage: coerce raw input into a typed draft.
pub fn parse_event_input(input: &EventInput) -> Result<EventDraft, Vec<Violation>> {
    let mut violations = Vec::new();

    let event_type = parse_event_type(present(&input.event_type), &mut violations);
    let start_time = match present(&input.start_time) {
        Some(value) => parse_time("startTime", Some(value), &mut violations),
        None => {
            violations.push(Violation::new("startTime", "is required"));
            None
        }
    };
    let end_time = parse_time("endTime", present(&input.end_time), &mut violations);
    let source = parse_source(present(&input.source), &mut violations);
    let meta = parse_meta(input.meta.as_ref(), &mut violations);

    match (event_type, start_time, source, meta) {
        (Some(event_type), Some(start_time), Some(source), Some(meta)) if violations.is_empty() => {
            Ok(EventDraft {
                child_id: input.child_id,
                event_type,
                start_time,
                end_time,
                parent_event_id: input.parent_event_id,
                source,
                meta,
                created_at: input.created_at.unwrap_or_else(Utc::now),
                updated_at: input.updated_at,
            })
        }
        _ => Err(violations),
    }
}

/// A single consistency rule.
pub type Rule = fn(&EventDraft, &ValidationContext, &mut Vec<Violation>);

/// Rules applied by [`check_rules`], in reporting order.
pub const RULES: &[Rule] = &[
    ensure_temporal_consistency,
    ensure_night_feeding_consistency,
    ensure_night_wake_within_block,
];

/// An end time, when present, must come strictly after the start.
pub fn ensure_temporal_consistency(
    event: &EventDraft,
    _context: &ValidationContext,
    violations: &mut Vec<Violation>,
) {
    if let Some(end_time) = event.end_time {
        if end_time <= event.start_time {
            violations.push(Violation::new("endTime", "must be later than startTime"));
        }
    }
}

/// Solid feedings are never night feedings.
pub fn ensure_night_feeding_consistency(
    event: &EventDraft,
    _context: &ValidationContext,
    violations: &mut Vec<Violation>,
) {
    let night_feeding = event.meta.as_ref().is_some_and(EventMeta::is_night_feeding);
    if event.event_type == EventType::FeedingSolids && night_feeding {
        violations.push(Violation::new(
            "meta.nightFeeding",
            "feeding_solids can never be marked as a night feeding",
        ));
    }
}

/// A night wake belongs to the active night block and starts inside it.
pub fn ensure_night_wake_within_block(
    event: &EventDraft,
    context: &ValidationContext,
    violations: &mut Vec<Violation>,
) {
    if event.event_type != EventType::NightWake {
        return;
    }

    let Some(block) = &context.active_night_block else {
        violations.push(Violation::new("type", "night_wake requires an active night block"));
        return;
    };

    let Some(parent_event_id) = event.parent_event_id else {
        violations.push(Violation::new(
            "parentEventId",
            "night_wake requires a parentEventId linked to the night block",
        ));
        return;
    };

    if parent_event_id != block.event_id {
        violations.push(Violation::new(
            "parentEventId",
            "night_wake must be linked to the active night block",
        ));
    }

    let before_start = event.start_time < block.start_time;
    let after_end = block.end_time.is_some_and(|end| event.start_time > end);
    if before_start || after_end {
        violations.push(Violation::new(
            "startTime",
            "night_wake must occur within the active night block window",
        ));
    }
}

/// Rule stage: run every rule and collect what they report.
pub fn check_rules(event: &EventDraft, context: &ValidationContext) -> Vec<Violation> {
    let mut violations = Vec::new();
    for rule in RULES {
        rule(event, context, &mut violations);
    }
    violations
}

/// Full pipeline: schema stage, then rule stage.
pub fn validate_event(
    input: &EventInput,
    context: &ValidationContext,
) -> Result<EventDraft, Vec<Violation>> {
    let draft = parse_event_input(input)?;
    let violations = check_rules(&draft, context);
    if violations.is_empty() {
        Ok(draft)
    } else {
        Err(violations)
    }
}

#[cfg(test)]
#[path = "event_validation_tests.rs"]
mod tests;
