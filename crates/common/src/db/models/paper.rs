//! Paper entity

use crate::domain::{Country, Level, PaperType, Subject};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Ordered author names, never empty
    pub authors: Vec<String>,

    #[sea_orm(column_name = "abstract", column_type = "Text")]
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub institution: Option<String>,

    pub country: Country,

    pub subject: Subject,

    pub level: Level,

    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub paper_type: PaperType,

    /// Object storage key of the PDF
    #[sea_orm(column_type = "Text")]
    pub file_path: String,

    pub user_id: Uuid,

    /// Assigned by the server on insert
    pub submitted: DateTimeWithTimeZone,

    pub downloads: i64,

    pub views: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Authors as a single display string
    pub fn author_line(&self) -> String {
        self.authors.join(", ")
    }

    /// File name offered to the browser on download
    pub fn download_file_name(&self) -> String {
        format!("{}.pdf", self.title)
    }
}
