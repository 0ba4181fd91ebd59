//! Data Transfer Objects for the HTTP API.
//!
//! Record types already serialize to their wire shape, so these are thin
//! envelopes around them.

use serde::{Deserialize, Serialize};

use crate::models::Event;
use crate::services::DebugUser;

/// Response for `GET /api/children/{childId}/events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
    pub count: usize,
    /// Upper bound applied to the listing
    pub limit: usize,
}

impl EventsResponse {
    pub fn new(events: Vec<Event>, limit: usize) -> Self {
        Self {
            count: events.len(),
            events,
            limit,
        }
    }
}

/// Single-event envelope for create and patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResponse {
    pub event: Event,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsersDebugResponse {
    pub users: Vec<DebugUser>,
    pub count: usize,
}
