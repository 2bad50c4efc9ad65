//! Read side of the paper catalog
//!
//! Wraps a [`PaperStore`] with the listing memo and turns store failures
//! into an empty result carrying an error message. Readers never see an
//! `Err` from here.

use crate::cache::{cache_key, Memo, TtlCache};
use crate::db::models::Paper;
use crate::db::PaperStore;
use crate::errors::{AppError, Result};
use crate::metrics::record_search;
use crate::pagination::{paginate, PaginationInfo};
use crate::query::{PaperFilter, SearchCriteria, SortOrder};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, instrument};
use uuid::Uuid;

/// Message surfaced when a listing could not be loaded
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load papers";

/// One page of papers
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub papers: Vec<Paper>,
    pub pagination: PaginationInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    fn failed(criteria: &SearchCriteria) -> Self {
        Self {
            papers: Vec::new(),
            pagination: PaginationInfo::new(criteria.page, criteria.page_size, 0),
            error: Some(LOAD_FAILED_MESSAGE.to_string()),
        }
    }
}

/// Memo key argument: a filter plus its ordering
pub type ListingKey = (PaperFilter, SortOrder);

fn listing_key(key: &ListingKey) -> String {
    let (filter, sort) = key;
    let mut params = filter.cache_params();
    params.push(("sort", sort.as_str().to_string()));
    cache_key("papers", &params)
}

pub struct PaperCatalog {
    store: Arc<dyn PaperStore>,
    listings: Memo<ListingKey, Arc<Vec<Paper>>>,
}

impl PaperCatalog {
    pub fn new(store: Arc<dyn PaperStore>, listing_ttl: Duration) -> Self {
        Self {
            store,
            listings: Memo::new("listings", TtlCache::new(listing_ttl), listing_key, listing_ttl),
        }
    }

    /// Server-side paging: the store applies offset and limit
    #[instrument(skip(self), fields(page = criteria.page, limit = criteria.page_size))]
    pub async fn search(&self, criteria: &SearchCriteria) -> SearchOutcome {
        let start = Instant::now();
        match self.store.query_papers(&criteria.to_query()).await {
            Ok((papers, total)) => {
                record_search(start.elapsed().as_secs_f64(), "server", total, true);
                SearchOutcome {
                    papers,
                    pagination: PaginationInfo::new(criteria.page, criteria.page_size, total),
                    error: None,
                }
            }
            Err(e) => {
                error!(error = %e, "Paper query failed");
                record_search(start.elapsed().as_secs_f64(), "server", 0, false);
                SearchOutcome::failed(criteria)
            }
        }
    }

    /// Client-side paging: the full filtered set is loaded once per TTL
    /// and only the slice changes between pages
    #[instrument(skip(self), fields(page = criteria.page, limit = criteria.page_size))]
    pub async fn browse(&self, criteria: &SearchCriteria) -> SearchOutcome {
        let start = Instant::now();
        let key = (criteria.filter.clone(), criteria.sort);
        let loaded = self
            .listings
            .get_or_try_load(&key, || async {
                self.store
                    .list_papers(&criteria.filter, criteria.sort)
                    .await
                    .map(Arc::new)
            })
            .await;

        match loaded {
            Ok(all) => {
                let total = all.len() as u64;
                record_search(start.elapsed().as_secs_f64(), "client", total, true);
                let (slice, _) = paginate(all.as_slice(), criteria.page, criteria.page_size);
                SearchOutcome {
                    papers: slice.to_vec(),
                    pagination: PaginationInfo::new(criteria.page, criteria.page_size, total),
                    error: None,
                }
            }
            Err(e) => {
                error!(error = %e, "Paper listing failed");
                record_search(start.elapsed().as_secs_f64(), "client", 0, false);
                SearchOutcome::failed(criteria)
            }
        }
    }

    /// Single paper, `PaperNotFound` if absent
    pub async fn find(&self, id: Uuid) -> Result<Paper> {
        self.store
            .find_paper(id)
            .await?
            .ok_or_else(|| AppError::PaperNotFound { id: id.to_string() })
    }

    /// Forget memoized listings after the catalog changes
    pub async fn invalidate(&self) {
        self.listings.invalidate().await;
    }

    /// Drop listings nobody has read since they expired
    pub async fn purge_expired(&self) -> usize {
        self.listings.purge_expired().await
    }

    pub fn store(&self) -> &Arc<dyn PaperStore> {
        &self.store
    }
}
