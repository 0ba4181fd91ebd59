//! Repository implementations module.
//!
//! - `local`: In-memory implementation for unit testing and local development
//! - `mongo`: MongoDB implementation using the official driver
pub mod local;
#[cfg(feature = "mongo-repo")]
pub mod mongo;

pub use local::LocalRepository;
#[cfg(feature = "mongo-repo")]
pub use mongo::{MongoConfig, MongoRepository};
