//! Postgres-backed implementation of the persistence ports

use crate::db::models::*;
use crate::db::store::{PaperStore, PaperWriter};
use crate::db::DbPool;
use crate::domain::NewPaper;
use crate::errors::Result;
use crate::query::{PaperFilter, PaperQuery, SortOrder};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QuerySelect, Set,
};
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.connection()
    }
}

#[async_trait]
impl PaperWriter for Repository {
    #[instrument(skip(self, paper), fields(title = %paper.title))]
    async fn insert_paper(&self, paper: NewPaper) -> Result<Paper> {
        let now = chrono::Utc::now();

        let model = PaperActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(paper.title),
            authors: Set(paper.authors),
            abstract_text: Set(paper.abstract_text),
            institution: Set(paper.institution),
            country: Set(paper.country),
            subject: Set(paper.subject),
            level: Set(paper.level),
            paper_type: Set(paper.paper_type),
            file_path: Set(paper.file_path),
            user_id: Set(paper.user_id),
            submitted: Set(now.into()),
            downloads: Set(0),
            views: Set(0),
        };

        model.insert(self.conn()).await.map_err(Into::into)
    }
}

#[async_trait]
impl PaperStore for Repository {
    #[instrument(skip(self, query), fields(offset = query.offset, limit = query.limit))]
    async fn query_papers(&self, query: &PaperQuery) -> Result<(Vec<Paper>, u64)> {
        let select = query.filter.select(query.sort);

        let total = select.clone().count(self.conn()).await?;
        let papers = select
            .offset(query.offset)
            .limit(query.limit)
            .all(self.conn())
            .await?;

        debug!(total, returned = papers.len(), "Paper page fetched");
        Ok((papers, total))
    }

    async fn list_papers(&self, filter: &PaperFilter, sort: SortOrder) -> Result<Vec<Paper>> {
        filter
            .select(sort)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn find_paper(&self, id: Uuid) -> Result<Option<Paper>> {
        PaperEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}
