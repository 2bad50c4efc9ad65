//! Persistence ports
//!
//! The gateway talks to papers only through these traits, so the Postgres
//! repository and the in-memory store are interchangeable.

use crate::db::models::Paper;
use crate::domain::NewPaper;
use crate::errors::Result;
use crate::query::{PaperFilter, PaperQuery, SortOrder};
use async_trait::async_trait;
use uuid::Uuid;

/// Insert-only access, also implemented by remote clients
#[async_trait]
pub trait PaperWriter: Send + Sync {
    /// Persist a new paper. The store assigns the id and `submitted`.
    async fn insert_paper(&self, paper: NewPaper) -> Result<Paper>;
}

/// Full read/write access to the paper catalog
#[async_trait]
pub trait PaperStore: PaperWriter {
    /// One page of matching papers plus the total match count
    async fn query_papers(&self, query: &PaperQuery) -> Result<(Vec<Paper>, u64)>;

    /// Every matching paper, ordered
    async fn list_papers(&self, filter: &PaperFilter, sort: SortOrder) -> Result<Vec<Paper>>;

    async fn find_paper(&self, id: Uuid) -> Result<Option<Paper>>;

    /// Connectivity check for readiness probes
    async fn ping(&self) -> Result<()>;
}
