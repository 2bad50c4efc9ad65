//! In-memory paper store for tests and local runs without Postgres

use crate::db::models::Paper;
use crate::db::store::{PaperStore, PaperWriter};
use crate::domain::NewPaper;
use crate::errors::Result;
use crate::query::{PaperFilter, PaperQuery, SortOrder};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct MemoryPaperStore {
    papers: Arc<RwLock<Vec<Paper>>>,
}

impl MemoryPaperStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records
    pub fn with_papers(papers: Vec<Paper>) -> Self {
        Self {
            papers: Arc::new(RwLock::new(papers)),
        }
    }

    pub async fn len(&self) -> usize {
        self.papers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.papers.read().await.is_empty()
    }

    async fn matching(&self, filter: &PaperFilter, sort: SortOrder) -> Vec<Paper> {
        let mut found: Vec<Paper> = self
            .papers
            .read()
            .await
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        sort.sort(&mut found);
        found
    }
}

#[async_trait]
impl PaperWriter for MemoryPaperStore {
    async fn insert_paper(&self, paper: NewPaper) -> Result<Paper> {
        let record = Paper {
            id: Uuid::new_v4(),
            title: paper.title,
            authors: paper.authors,
            abstract_text: paper.abstract_text,
            institution: paper.institution,
            country: paper.country,
            subject: paper.subject,
            level: paper.level,
            paper_type: paper.paper_type,
            file_path: paper.file_path,
            user_id: paper.user_id,
            submitted: Utc::now().fixed_offset(),
            downloads: 0,
            views: 0,
        };
        self.papers.write().await.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl PaperStore for MemoryPaperStore {
    async fn query_papers(&self, query: &PaperQuery) -> Result<(Vec<Paper>, u64)> {
        let found = self.matching(&query.filter, query.sort).await;
        let total = found.len() as u64;
        let page = found
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn list_papers(&self, filter: &PaperFilter, sort: SortOrder) -> Result<Vec<Paper>> {
        Ok(self.matching(filter, sort).await)
    }

    async fn find_paper(&self, id: Uuid) -> Result<Option<Paper>> {
        Ok(self.papers.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Country, Level, PaperType, Subject};

    fn new_paper(title: &str, country: Country) -> NewPaper {
        NewPaper {
            title: title.into(),
            authors: vec!["Thandiwe Nkosi".into()],
            abstract_text: "s".repeat(60),
            institution: None,
            country,
            subject: Subject::Education,
            level: Level::Community,
            paper_type: PaperType::CommunityReport,
            file_path: "papers/1_r.pdf".into(),
            user_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_server_fields() {
        let store = MemoryPaperStore::new();
        let paper = store.insert_paper(new_paper("Literacy circles", Country::SouthAfrica)).await.unwrap();
        assert_eq!(paper.downloads, 0);
        assert_eq!(store.find_paper(paper.id).await.unwrap(), Some(paper));
    }

    #[tokio::test]
    async fn test_query_pages_and_counts() {
        let store = MemoryPaperStore::new();
        for i in 0..12 {
            let country = if i % 2 == 0 { Country::Kenya } else { Country::Peru };
            store.insert_paper(new_paper(&format!("Paper {i:02}"), country)).await.unwrap();
        }
        let query = PaperQuery {
            filter: PaperFilter {
                country: Some(Country::Kenya),
                ..Default::default()
            },
            sort: SortOrder::Title,
            offset: 5,
            limit: 5,
        };
        let (page, total) = store.query_papers(&query).await.unwrap();
        assert_eq!(total, 6);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "Paper 10");
    }
}
