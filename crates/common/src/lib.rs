//! Global South Research Repository common library
//!
//! Shared code for the catalog gateway and the submission client:
//! - Paper domain model, classifications and the `papers` entity
//! - Persistence, object storage, identity and pending-slot ports
//! - Query composition, pagination and the listing cache
//! - Validation and the client submission pipeline
//! - Error types, configuration, authentication and metrics

pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod metrics;
pub mod pagination;
pub mod query;
pub mod storage;
pub mod submission;
pub mod validation;

// Re-export commonly used types
pub use catalog::{PaperCatalog, SearchOutcome};
pub use config::AppConfig;
pub use db::models::Paper;
pub use db::{MemoryPaperStore, PaperStore, PaperWriter, Repository};
pub use errors::{AppError, Result};
pub use storage::{ObjectStorage, ObjectStoreBackend};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
