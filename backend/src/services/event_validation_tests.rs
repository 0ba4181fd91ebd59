use super::*;
use chrono::{Duration, TimeZone};
use proptest::prelude::*;
use serde_json::json;

fn child_id() -> DocumentId {
    DocumentId::parse_str("65e0e6335dffb466f21a1c01").unwrap()
}

fn block_id() -> DocumentId {
    DocumentId::parse_str("65e0e6335dffb466f21a1c02").unwrap()
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    let day = if hour < 12 { 2 } else { 1 };
    Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
}

fn input(event_type: &str, start: &str) -> EventInput {
    EventInput {
        event_type: Some(json!(event_type)),
        start_time: Some(json!(start)),
        ..EventInput::new(child_id())
    }
}

fn draft(event_type: EventType, start_time: DateTime<Utc>) -> EventDraft {
    EventDraft {
        child_id: child_id(),
        event_type,
        start_time,
        end_time: None,
        parent_event_id: None,
        source: EventSource::Manual,
        meta: None,
        created_at: start_time,
        updated_at: None,
    }
}

fn open_block() -> ValidationContext {
    ValidationContext::with_block(NightBlockContext {
        event_id: block_id(),
        start_time: at(20, 0),
        end_time: None,
    })
}

fn fields(violations: &[Violation]) -> Vec<&str> {
    violations.iter().map(|v| v.field.as_str()).collect()
}

// =============================================================================
// Schema stage
// =============================================================================

#[test]
fn test_minimal_input_defaults_source_to_manual() {
    let draft = parse_event_input(&input("sleep_start", "2024-01-01T20:00:00Z")).unwrap();
    assert_eq!(draft.event_type, EventType::SleepStart);
    assert_eq!(draft.source, EventSource::Manual);
    assert_eq!(draft.start_time, at(20, 0));
    assert!(draft.meta.is_none());
}

#[test]
fn test_missing_type_and_start_are_both_reported() {
    let violations = parse_event_input(&EventInput::new(child_id())).unwrap_err();
    assert_eq!(fields(&violations), vec!["type", "startTime"]);
}

#[test]
fn test_bad_shapes_collected_together() {
    let raw = EventInput {
        event_type: Some(json!("nap")),
        start_time: Some(json!("yesterday")),
        end_time: Some(json!(42.5)),
        source: Some(json!("fax")),
        ..EventInput::new(child_id())
    };
    let violations = parse_event_input(&raw).unwrap_err();
    assert_eq!(fields(&violations), vec!["type", "startTime", "endTime", "source"]);
}

#[test]
fn test_null_optionals_are_absent() {
    let raw = EventInput {
        end_time: Some(Value::Null),
        source: Some(Value::Null),
        ..input("extra", "2024-01-01T20:00:00Z")
    };
    let draft = parse_event_input(&raw).unwrap();
    assert_eq!(draft.end_time, None);
    assert_eq!(draft.source, EventSource::Manual);
}

#[test]
fn test_epoch_millis_accepted_for_times() {
    let raw = EventInput {
        start_time: Some(json!(1_704_139_200_000_i64)),
        ..input("medication", "")
    };
    assert_eq!(parse_event_input(&raw).unwrap().start_time, at(20, 0));
}

#[test]
fn test_meta_unknown_key_is_schema_violation() {
    let mut meta = Map::new();
    meta.insert("mood".to_string(), json!("calm"));
    let raw = EventInput {
        meta: Some(meta),
        ..input("extra", "2024-01-01T20:00:00Z")
    };
    let violations = parse_event_input(&raw).unwrap_err();
    assert_eq!(fields(&violations), vec!["meta"]);
}

#[test]
fn test_meta_negative_duration_is_schema_violation() {
    let mut meta = Map::new();
    meta.insert("durationMinutes".to_string(), json!(-10));
    let raw = EventInput {
        meta: Some(meta),
        ..input("feeding_breast", "2024-01-01T20:00:00Z")
    };
    let violations = parse_event_input(&raw).unwrap_err();
    assert_eq!(fields(&violations), vec!["meta.durationMinutes"]);
}

#[test]
fn test_schema_failure_skips_rules() {
    // The end time precedes the start, but the bad type must be the only report.
    let raw = EventInput {
        event_type: Some(json!("nap")),
        end_time: Some(json!("2024-01-01T19:00:00Z")),
        ..input("", "2024-01-01T20:00:00Z")
    };
    let violations = validate_event(&raw, &ValidationContext::default()).unwrap_err();
    assert_eq!(fields(&violations), vec!["type"]);
}

// =============================================================================
// Rule stage
// =============================================================================

#[test]
fn test_end_must_follow_start() {
    let mut event = draft(EventType::SleepStart, at(20, 0));
    event.end_time = Some(at(20, 0));
    assert_eq!(fields(&check_rules(&event, &ValidationContext::default())), vec!["endTime"]);

    event.end_time = Some(at(6, 0));
    assert!(check_rules(&event, &ValidationContext::default()).is_empty());
}

#[test]
fn test_solids_never_night_feeding() {
    let mut event = draft(EventType::FeedingSolids, at(21, 0));
    event.meta = Some(EventMeta {
        night_feeding: Some(true),
        ..Default::default()
    });
    assert_eq!(
        fields(&check_rules(&event, &ValidationContext::default())),
        vec!["meta.nightFeeding"]
    );

    event.event_type = EventType::FeedingBottle;
    assert!(check_rules(&event, &ValidationContext::default()).is_empty());
}

#[test]
fn test_night_wake_without_block() {
    let mut event = draft(EventType::NightWake, at(23, 0));
    event.parent_event_id = Some(block_id());
    let violations = check_rules(&event, &ValidationContext::default());
    assert_eq!(fields(&violations), vec!["type"]);
    assert!(violations[0].message.contains("active night block"));
}

#[test]
fn test_night_wake_without_parent_stops_there() {
    // Starts before the block, but only the missing parent is reported.
    let event = draft(EventType::NightWake, at(19, 0));
    assert_eq!(fields(&check_rules(&event, &open_block())), vec!["parentEventId"]);
}

#[test]
fn test_night_wake_inside_open_block() {
    let mut event = draft(EventType::NightWake, at(2, 30));
    event.parent_event_id = Some(block_id());
    assert!(check_rules(&event, &open_block()).is_empty());
}

#[test]
fn test_night_wake_wrong_parent_and_outside_window() {
    let mut event = draft(EventType::NightWake, at(19, 0));
    event.parent_event_id = Some(child_id());
    assert_eq!(
        fields(&check_rules(&event, &open_block())),
        vec!["parentEventId", "startTime"]
    );
}

#[test]
fn test_night_wake_after_closed_block() {
    let context = ValidationContext::with_block(NightBlockContext {
        event_id: block_id(),
        start_time: at(20, 0),
        end_time: Some(at(6, 0)),
    });
    let mut event = draft(EventType::NightWake, at(6, 0));
    event.parent_event_id = Some(block_id());
    assert!(check_rules(&event, &context).is_empty(), "block end is inclusive");

    event.start_time = at(6, 1);
    assert_eq!(fields(&check_rules(&event, &context)), vec!["startTime"]);
}

#[test]
fn test_rules_accumulate_across_checks() {
    let mut event = draft(EventType::FeedingSolids, at(21, 0));
    event.end_time = Some(at(20, 0));
    event.meta = Some(EventMeta {
        night_feeding: Some(true),
        ..Default::default()
    });
    assert_eq!(
        fields(&check_rules(&event, &ValidationContext::default())),
        vec!["endTime", "meta.nightFeeding"]
    );
}

#[test]
fn test_validate_event_accepts_valid_night_wake() {
    let raw = EventInput {
        parent_event_id: Some(block_id()),
        ..input("night_wake", "2024-01-02T02:00:00Z")
    };
    let draft = validate_event(&raw, &open_block()).unwrap();
    assert_eq!(draft.parent_event_id, Some(block_id()));
}

// =============================================================================
// Properties
// =============================================================================

fn any_event_type() -> impl Strategy<Value = EventType> {
    prop::sample::select(EventType::ALL.to_vec())
}

proptest! {
    #[test]
    fn prop_end_not_after_start_is_rejected(
        event_type in any_event_type(),
        start in 0i64..4_000_000_000,
        back in 0i64..100_000,
    ) {
        let start_time = DateTime::<Utc>::from_timestamp(start, 0).unwrap();
        let mut event = draft(event_type, start_time);
        event.end_time = Some(start_time - Duration::seconds(back));
        let violations = check_rules(&event, &open_block());
        prop_assert!(violations.iter().any(|v| v.field == "endTime"));
    }

    #[test]
    fn prop_night_wake_without_parent_is_rejected(
        offset in -10_000i64..10_000,
        with_block in any::<bool>(),
    ) {
        let event = draft(EventType::NightWake, at(20, 0) + Duration::minutes(offset));
        let context = if with_block { open_block() } else { ValidationContext::default() };
        prop_assert!(!check_rules(&event, &context).is_empty());
    }

    #[test]
    fn prop_night_wake_with_foreign_parent_is_rejected(bytes in any::<[u8; 12]>()) {
        let parent = DocumentId::from_bytes(bytes);
        prop_assume!(parent != block_id());
        let mut event = draft(EventType::NightWake, at(23, 0));
        event.parent_event_id = Some(parent);
        let violations = check_rules(&event, &open_block());
        prop_assert!(violations.iter().any(|v| v.field == "parentEventId"));
    }

    #[test]
    fn prop_night_wake_outside_window_is_rejected(
        minutes_before in 1i64..10_000,
        minutes_after in 1i64..10_000,
    ) {
        let context = ValidationContext::with_block(NightBlockContext {
            event_id: block_id(),
            start_time: at(20, 0),
            end_time: Some(at(6, 0)),
        });
        for start_time in [
            at(20, 0) - Duration::minutes(minutes_before),
            at(6, 0) + Duration::minutes(minutes_after),
        ] {
            let mut event = draft(EventType::NightWake, start_time);
            event.parent_event_id = Some(block_id());
            let violations = check_rules(&event, &context);
            prop_assert_eq!(fields(&violations), vec!["startTime"]);
        }
    }

    #[test]
    fn prop_solids_night_feeding_always_rejected(
        start in 0i64..4_000_000_000,
        minutes in proptest::option::of(0.0f64..600.0),
        notes in proptest::option::of("[a-z ]{0,20}"),
    ) {
        let mut event = draft(
            EventType::FeedingSolids,
            DateTime::<Utc>::from_timestamp(start, 0).unwrap(),
        );
        event.meta = Some(EventMeta {
            notes,
            duration_minutes: minutes,
            night_feeding: Some(true),
            ..Default::default()
        });
        let violations = check_rules(&event, &ValidationContext::default());
        prop_assert!(violations.iter().any(|v| v.field == "meta.nightFeeding"));
    }
}
