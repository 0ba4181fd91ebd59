//! Domain records and their shape checks.

pub mod child;
pub mod event;
pub mod plan;
pub mod time;
pub mod transcript;
pub mod user;
pub mod violation;

pub use child::Child;
pub use event::{
    Event, EventDraft, EventFilter, EventMeta, EventSource, EventType, EventUpdate, FeedingDetails,
    FeedingSide, FieldChange,
};
pub use plan::{Plan, PlanStatus, PlanTarget};
pub use transcript::{Transcript, TranscriptMeta, TranscriptSource};
pub use user::{User, UserProfile};
pub use violation::Violation;
