//! Search criteria and their translation into store queries
//!
//! A [`PaperFilter`] renders two ways: a SeaORM [`Condition`] for the
//! Postgres repository and a plain predicate for the in-memory store.
//! The two must select the same papers.

use crate::db::models::{Paper, PaperColumn, PaperEntity};
use crate::domain::{Country, Level, PaperType, Subject};
use crate::errors::AppError;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Select};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;
/// Highest page whose row offset still fits a signed 64-bit `OFFSET`
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PAGE_SIZE;

/// Papers submitted before this year fall under [`DateRange::Older`]
pub const OLDER_CUTOFF_YEAR: i32 = 2020;

/// Submission date restriction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateRange {
    /// Whole calendar year, UTC
    Year(i32),
    /// Everything before 2020-01-01
    Older,
}

impl DateRange {
    /// Half-open `[start, end)` bounds; `None` means unbounded
    pub fn bounds(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match *self {
            DateRange::Year(year) => (year_start(year), year_start(year + 1)),
            DateRange::Older => (None, year_start(OLDER_CUTOFF_YEAR)),
        }
    }

    fn contains(&self, instant: DateTime<Utc>) -> bool {
        let (start, end) = self.bounds();
        start.map_or(true, |s| instant >= s) && end.map_or(true, |e| instant < e)
    }
}

fn year_start(year: i32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateRange::Year(year) => write!(f, "{year}"),
            DateRange::Older => f.write_str("older"),
        }
    }
}

impl FromStr for DateRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("older") {
            return Ok(DateRange::Older);
        }
        match s.parse::<i32>() {
            Ok(year) if (1000..=9999).contains(&year) => Ok(DateRange::Year(year)),
            _ => Err(AppError::InvalidFormat {
                message: format!("Invalid date range: {s}"),
            }),
        }
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Title,
    /// Accepted but not ranked; orders like `Newest`
    Relevance,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::Title => "title",
            SortOrder::Relevance => "relevance",
        }
    }

    /// Order papers in place the way the database would
    pub fn sort(&self, papers: &mut [Paper]) {
        match self {
            SortOrder::Newest | SortOrder::Relevance => {
                papers.sort_by(|a, b| b.submitted.cmp(&a.submitted))
            }
            SortOrder::Oldest => papers.sort_by(|a, b| a.submitted.cmp(&b.submitted)),
            SortOrder::Title => papers.sort_by(|a, b| a.title.cmp(&b.title)),
        }
    }

    fn apply(&self, select: Select<PaperEntity>) -> Select<PaperEntity> {
        match self {
            SortOrder::Newest | SortOrder::Relevance => {
                select.order_by_desc(PaperColumn::Submitted)
            }
            SortOrder::Oldest => select.order_by_asc(PaperColumn::Submitted),
            SortOrder::Title => select.order_by_asc(PaperColumn::Title),
        }
    }
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            "title" => Ok(SortOrder::Title),
            "relevance" => Ok(SortOrder::Relevance),
            other => Err(AppError::InvalidFormat {
                message: format!("Unknown sort order: {other}"),
            }),
        }
    }
}

/// Which papers match, independent of order and paging
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PaperFilter {
    pub free_text: Option<String>,
    pub country: Option<Country>,
    pub subject: Option<Subject>,
    pub level: Option<Level>,
    pub paper_type: Option<PaperType>,
    pub date_range: Option<DateRange>,
    pub institution: Option<String>,
}

impl PaperFilter {
    fn text(&self) -> Option<&str> {
        non_blank(self.free_text.as_deref())
    }

    fn institution_text(&self) -> Option<&str> {
        non_blank(self.institution.as_deref())
    }

    /// True when nothing narrows the result set
    pub fn is_unrestricted(&self) -> bool {
        self.text().is_none()
            && self.country.is_none()
            && self.subject.is_none()
            && self.level.is_none()
            && self.paper_type.is_none()
            && self.date_range.is_none()
            && self.institution_text().is_none()
    }

    /// Conjunction of every set criterion
    pub fn condition(&self) -> Condition {
        let mut cond = Condition::all();

        if let Some(text) = self.text() {
            let pattern = like_pattern(text);
            cond = cond.add(
                Condition::any()
                    .add(Expr::col(PaperColumn::Title).ilike(pattern.as_str()))
                    .add(Expr::cust_with_values(
                        r#"array_to_string("authors", ', ') ILIKE $1"#,
                        [pattern.clone()],
                    ))
                    .add(Expr::col(PaperColumn::AbstractText).ilike(pattern.as_str())),
            );
        }
        if let Some(country) = self.country {
            cond = cond.add(PaperColumn::Country.eq(country));
        }
        if let Some(subject) = self.subject {
            cond = cond.add(PaperColumn::Subject.eq(subject));
        }
        if let Some(level) = self.level {
            cond = cond.add(PaperColumn::Level.eq(level));
        }
        if let Some(paper_type) = self.paper_type {
            cond = cond.add(PaperColumn::PaperType.eq(paper_type));
        }
        if let Some(range) = self.date_range {
            let (start, end) = range.bounds();
            if let Some(start) = start {
                cond = cond.add(PaperColumn::Submitted.gte(start));
            }
            if let Some(end) = end {
                cond = cond.add(PaperColumn::Submitted.lt(end));
            }
        }
        if let Some(institution) = self.institution_text() {
            cond = cond.add(Expr::col(PaperColumn::Institution).ilike(like_pattern(institution)));
        }

        cond
    }

    /// In-process equivalent of [`PaperFilter::condition`]
    pub fn matches(&self, paper: &Paper) -> bool {
        if let Some(text) = self.text() {
            let needle = text.to_lowercase();
            let hit = paper.title.to_lowercase().contains(&needle)
                || paper.author_line().to_lowercase().contains(&needle)
                || paper.abstract_text.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        if self.country.is_some_and(|c| c != paper.country)
            || self.subject.is_some_and(|s| s != paper.subject)
            || self.level.is_some_and(|l| l != paper.level)
            || self.paper_type.is_some_and(|t| t != paper.paper_type)
        {
            return false;
        }
        if let Some(range) = self.date_range {
            if !range.contains(paper.submitted.with_timezone(&Utc)) {
                return false;
            }
        }
        if let Some(institution) = self.institution_text() {
            let needle = institution.to_lowercase();
            let hit = paper
                .institution
                .as_deref()
                .is_some_and(|i| i.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }

    /// Stable key/value pairs describing this filter, for cache keys
    pub fn cache_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(text) = self.text() {
            params.push(("search", text.to_lowercase()));
        }
        if let Some(country) = self.country {
            params.push(("country", country.to_string()));
        }
        if let Some(subject) = self.subject {
            params.push(("subject", subject.to_string()));
        }
        if let Some(level) = self.level {
            params.push(("level", level.to_string()));
        }
        if let Some(paper_type) = self.paper_type {
            params.push(("type", paper_type.to_string()));
        }
        if let Some(range) = self.date_range {
            params.push(("date", range.to_string()));
        }
        if let Some(institution) = self.institution_text() {
            params.push(("institution", institution.to_lowercase()));
        }
        params
    }

    /// Filtered and ordered select, without paging
    pub fn select(&self, sort: SortOrder) -> Select<PaperEntity> {
        sort.apply(PaperEntity::find().filter(self.condition()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `%text%` with LIKE metacharacters escaped
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Everything a caller can ask the catalog for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub filter: PaperFilter,
    pub sort: SortOrder,
    /// 1-based
    pub page: u64,
    pub page_size: u64,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            filter: PaperFilter::default(),
            sort: SortOrder::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SearchCriteria {
    /// Page window for a server-side query
    pub fn to_query(&self) -> PaperQuery {
        PaperQuery {
            filter: self.filter.clone(),
            sort: self.sort,
            offset: self
                .page
                .saturating_sub(1)
                .saturating_mul(self.page_size)
                .min(i64::MAX as u64),
            limit: self.page_size,
        }
    }
}

/// A filtered, ordered, windowed read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperQuery {
    pub filter: PaperFilter,
    pub sort: SortOrder,
    pub offset: u64,
    pub limit: u64,
}
