//! Document storage for children, events, plans and users.
//!
//! Storage is reached only through the repository traits, so the backend can
//! be swapped without touching services or handlers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP layer (axum handlers, middleware)                 │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service layer (crate::services)                        │
//! │  - Event validation and PATCH merge                     │
//! │  - Health reporting, debug listings                     │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository traits (repository/mod.rs)                  │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!          ┌──────────┴───────────┐
//!   ┌──────▼──────┐        ┌──────▼──────┐
//!   │    Local    │        │   MongoDB   │
//!   │ (in-memory) │        │ (mongo-repo)│
//!   └─────────────┘        └─────────────┘
//! ```
//!
//! Use [`RepositoryFactory`] or [`RepositoryBuilder`] to obtain an
//! `Arc<dyn FullRepository>` and pass it to the services explicitly.

#[cfg(not(any(feature = "mongo-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
#[cfg(feature = "mongo-repo")]
pub use repositories::{MongoConfig, MongoRepository};
pub use repository::{
    ChildRepository, ErrorContext, EventRepository, FullRepository, MaintenanceRepository,
    RepositoryError, RepositoryResult, UserRepository,
};
