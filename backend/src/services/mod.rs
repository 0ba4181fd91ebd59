//! Service layer for business logic and orchestration.
//!
//! Services sit between the HTTP handlers and the repository traits. They take
//! the repository as `&dyn FullRepository` so any backend can be plugged in.

pub mod build_info;
pub mod event_payload;
pub mod event_validation;
pub mod events;
pub mod health;
pub mod users;

pub use build_info::BuildInfo;
pub use event_payload::{parse_create_payload, parse_patch_payload, EventPatch, PayloadError};
pub use event_validation::{
    check_rules, validate_event, EventInput, NightBlockContext, ValidationContext,
};
pub use events::{
    create_event, list_events, patch_event, resolve_validation_context, EventListQuery,
    EventServiceError, MAX_EVENTS,
};
pub use health::{build_health_report, DbStatus, EnvStatus, HealthReport};
pub use users::{hash_email, list_debug_users, DebugUser};
