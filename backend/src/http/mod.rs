//! HTTP server module.
//!
//! An axum server exposing the event, health and debug endpoints under
//! `/api`. Handlers stay thin and delegate to the service layer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Middleware                                              │
//! │  - Correlation id, request span                          │
//! │  - Security headers, origin policy                       │
//! │  - Role guards (session resolved from headers)           │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Handlers: path/body parsing, DTO wrapping               │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  crate::services → crate::db repositories                │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod session;
pub mod state;

pub use error::{ApiError, AppError};
pub use middleware::OriginPolicy;
pub use router::{create_router, CORRELATION_ID_HEADER};
pub use session::{GatewaySessionResolver, NoSessionResolver, SessionResolver};
pub use state::AppState;
