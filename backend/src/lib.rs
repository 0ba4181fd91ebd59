//! # Dreamers backend
//!
//! Tracks child sleep and feeding events for a coaching service.
//!
//! The crate exposes a REST API via Axum over a document store. Requests are
//! authorized by role, and every write goes through a temporal-consistency
//! validator before it reaches storage.
//!
//! ## Architecture
//!
//! - [`api`]: Shared identifier types
//! - [`models`]: Stored records and their field-level checks
//! - [`auth`]: Roles and resolved sessions
//! - [`services`]: Event validation, PATCH merge, health and debug listings
//! - [`db`]: Repository traits, the in-memory and MongoDB backends, factory
//! - [`config`]: Process environment validation
//! - [`logging`]: Tracing subscriber setup
//! - [`http`]: Axum router, handlers and middleware

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
