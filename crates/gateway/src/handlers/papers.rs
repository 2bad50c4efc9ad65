//! Paper catalog handlers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use gsr_common::{
    auth::AuthContext,
    catalog::SearchOutcome,
    domain::{NewPaper, PaperForm, UnknownVariant},
    errors::{AppError, Result},
    metrics::{record_download, record_submission},
    pagination::{page_buttons, PageButton, PaginationInfo, ShowingRange},
    query::{PaperFilter, SearchCriteria, DEFAULT_PAGE_SIZE, MAX_PAGE, MAX_PAGE_SIZE},
    storage::PDF_CONTENT_TYPE,
    validation::{
        validate_form_data, validate_search_term, SEARCH_TERM_MAX_LEN, SEARCH_TERM_MIN_LEN,
    },
    Paper,
};

/// Downloads may be cached by browsers and proxies for an hour
pub const DOWNLOAD_CACHE_CONTROL: &str = "public, max-age=3600";

/// Listing query string. Every value arrives as text so that bad input
/// can be reported as a structured error; blank values count as unset.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub country: Option<String>,
    pub subject: Option<String>,
    pub level: Option<String>,
    #[serde(rename = "type")]
    pub paper_type: Option<String>,
    pub date: Option<String>,
    pub institution: Option<String>,
    pub sort: Option<String>,
}

fn param(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_param<T>(value: &Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Into<AppError>,
{
    param(value)
        .map(|raw| raw.parse::<T>().map_err(Into::into))
        .transpose()
}

fn parse_number(
    name: &str,
    value: &Option<String>,
    default: u64,
    allowed: RangeInclusive<u64>,
) -> Result<u64> {
    let Some(raw) = param(value) else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(n) if allowed.contains(&n) => Ok(n),
        _ => Err(AppError::InvalidFormat {
            message: format!("Invalid {name}: {raw}"),
        }),
    }
}

impl ListParams {
    /// Parse into catalog criteria, rejecting unknown classifications and
    /// malformed numbers
    pub fn to_criteria(&self) -> Result<SearchCriteria> {
        // Pages past the end list nothing, so clamping keeps the row offset in range
        let page = parse_number("page", &self.page, 1, 1..=u64::MAX)?.min(MAX_PAGE);
        let page_size = parse_number("limit", &self.limit, DEFAULT_PAGE_SIZE, 1..=MAX_PAGE_SIZE)?;

        let free_text = param(&self.search).map(str::to_string);
        if let Some(term) = free_text.as_deref() {
            if !validate_search_term(term) {
                return Err(AppError::Validation {
                    message: format!(
                        "Search term must be between {} and {} characters",
                        SEARCH_TERM_MIN_LEN, SEARCH_TERM_MAX_LEN
                    ),
                    field: Some("search".to_string()),
                });
            }
        }

        Ok(SearchCriteria {
            filter: PaperFilter {
                free_text,
                country: parse_param(&self.country)?,
                subject: parse_param(&self.subject)?,
                level: parse_param(&self.level)?,
                paper_type: parse_param(&self.paper_type)?,
                date_range: parse_param(&self.date)?,
                institution: param(&self.institution).map(str::to_string),
            },
            sort: parse_param(&self.sort)?.unwrap_or_default(),
            page,
            page_size,
        })
    }
}

fn query_rejection(rejection: QueryRejection) -> AppError {
    AppError::InvalidFormat {
        message: rejection.body_text(),
    }
}

/// One page of papers
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub data: Vec<Paper>,
    pub pagination: PaginationInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<SearchOutcome> for ListResponse {
    fn from(outcome: SearchOutcome) -> Self {
        Self {
            data: outcome.papers,
            pagination: outcome.pagination,
            error: outcome.error,
        }
    }
}

/// A page of the memoized listing plus what a pager needs to render
#[derive(Debug, Serialize)]
pub struct BrowseResponse {
    #[serde(flatten)]
    pub listing: ListResponse,
    pub pages: Vec<PageButton>,
    pub showing: ShowingRange,
    pub summary: String,
}

/// Server-side paging: offset and limit go to the store
pub async fn list_papers(
    State(state): State<AppState>,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ListResponse>> {
    let Query(params) = params.map_err(query_rejection)?;
    let criteria = params.to_criteria()?;

    let outcome = state.catalog.search(&criteria).await;

    Ok(Json(outcome.into()))
}

/// Client-side paging over the memoized filtered set
pub async fn browse_papers(
    State(state): State<AppState>,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<BrowseResponse>> {
    let Query(params) = params.map_err(query_rejection)?;
    let criteria = params.to_criteria()?;

    let outcome = state.catalog.browse(&criteria).await;
    let pagination = outcome.pagination;
    let showing = ShowingRange::new(pagination.page, pagination.limit, pagination.total);

    Ok(Json(BrowseResponse {
        listing: outcome.into(),
        pages: page_buttons(pagination.page, pagination.total_pages),
        summary: showing.to_string(),
        showing,
    }))
}

/// Unparseable ids can never name a paper
fn parse_paper_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::PaperNotFound {
        id: raw.to_string(),
    })
}

/// Get a paper by ID
pub async fn get_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<String>,
) -> Result<Json<Paper>> {
    let paper = state.catalog.find(parse_paper_id(&paper_id)?).await?;
    Ok(Json(paper))
}

/// Authors as a JSON array or a comma-separated string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AuthorsInput {
    List(Vec<String>),
    Joined(String),
}

impl AuthorsInput {
    fn is_blank(&self) -> bool {
        match self {
            AuthorsInput::List(names) => names.iter().all(|name| name.trim().is_empty()),
            AuthorsInput::Joined(raw) => raw.trim().is_empty(),
        }
    }

    /// The comma-separated form the submission form works with
    fn joined(&self) -> String {
        match self {
            AuthorsInput::List(names) => names.join(", "),
            AuthorsInput::Joined(raw) => raw.clone(),
        }
    }
}

/// Request to create a new paper.
///
/// The derived rules only cap raw column lengths. Content rules (title
/// and abstract minimums, author list shape) belong to
/// `validate_form_data` and are not repeated here.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreatePaperRequest {
    #[validate(length(max = 500, message = "Title must be at most 500 characters"))]
    pub title: Option<String>,

    pub authors: Option<AuthorsInput>,

    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,

    #[validate(length(max = 300, message = "Institution must be at most 300 characters"))]
    pub institution: Option<String>,

    pub country: Option<String>,

    pub subject: Option<String>,

    pub level: Option<String>,

    #[serde(rename = "type")]
    pub paper_type: Option<String>,

    /// Object storage key returned by the upload step
    #[serde(alias = "filePath")]
    #[validate(length(max = 1024, message = "File path is too long"))]
    pub file_path: Option<String>,
}

fn parse_field<T>(
    value: &Option<String>,
    field: &str,
    errors: &mut BTreeMap<String, String>,
) -> Option<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw = param(value)?;
    match raw.parse() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            errors.insert(field.to_string(), e.to_string());
            None
        }
    }
}

impl CreatePaperRequest {
    /// First missing field wins, in form order; the file path comes last
    pub fn check_required(&self) -> Result<()> {
        let checks = [
            ("title", param(&self.title).is_some()),
            (
                "authors",
                self.authors.as_ref().is_some_and(|authors| !authors.is_blank()),
            ),
            ("abstract", param(&self.abstract_text).is_some()),
            ("country", param(&self.country).is_some()),
            ("subject", param(&self.subject).is_some()),
            ("level", param(&self.level).is_some()),
            ("type", param(&self.paper_type).is_some()),
        ];
        if let Some((field, _)) = checks.iter().find(|(_, present)| !present) {
            return Err(AppError::MissingField {
                field: field.to_string(),
            });
        }
        if param(&self.file_path).is_none() {
            return Err(AppError::MissingFilePath);
        }
        Ok(())
    }

    /// Run every field rule and build the record. All violations are
    /// reported together.
    pub fn into_new_paper(self, user_id: Uuid) -> Result<NewPaper> {
        let mut errors = BTreeMap::new();

        if let Err(e) = self.validate() {
            for (field, field_errors) in e.field_errors() {
                if let Some(first) = field_errors.first() {
                    let message = first
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {field}"));
                    errors.insert(field.to_string(), message);
                }
            }
        }

        let form = PaperForm {
            subject: parse_field(&self.subject, "subject", &mut errors),
            level: parse_field(&self.level, "level", &mut errors),
            country: parse_field(&self.country, "country", &mut errors),
            paper_type: parse_field(&self.paper_type, "type", &mut errors),
            authors: self
                .authors
                .as_ref()
                .map(AuthorsInput::joined)
                .unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            institution: self.institution.unwrap_or_default(),
            abstract_text: self.abstract_text.unwrap_or_default(),
        }
        .sanitized();

        // Specific messages recorded above take precedence
        for (field, message) in validate_form_data(&form) {
            errors.entry(field.to_string()).or_insert(message);
        }
        if !errors.is_empty() {
            return Err(AppError::FieldErrors(errors));
        }

        let file_path = param(&self.file_path).unwrap_or_default().to_string();
        NewPaper::from_form(&form, file_path, user_id).ok_or_else(|| AppError::Internal {
            message: "Classification missing after validation".to_string(),
        })
    }
}

/// Create a paper record for an already uploaded file
pub async fn create_paper(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: std::result::Result<Json<CreatePaperRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Paper>)> {
    let Json(request) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge {
                limit: state.config.server.max_body_bytes as u64,
            }
        } else {
            AppError::InvalidFormat {
                message: rejection.body_text(),
            }
        }
    })?;

    let new_paper = request
        .check_required()
        .and_then(|()| request.into_new_paper(auth.user_id))
        .inspect_err(|_| record_submission("invalid"))?;

    let paper = state.store.insert_paper(new_paper).await?;
    state.catalog.invalidate().await;
    record_submission("created");

    info!(
        paper_id = %paper.id,
        user_id = %auth.user_id,
        request_id = %auth.request_id,
        title = %paper.title,
        "Paper created"
    );

    Ok((StatusCode::CREATED, Json(paper)))
}

fn is_pdf(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE))
}

/// `attachment; filename="..."` with quotes, backslashes and control
/// characters removed from the name
fn attachment_header(file_name: &str) -> Result<HeaderValue> {
    let cleaned: String = file_name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();
    HeaderValue::from_bytes(format!("attachment; filename=\"{cleaned}\"").as_bytes()).map_err(
        |e| AppError::Internal {
            message: format!("Invalid Content-Disposition header: {e}"),
        },
    )
}

/// Stream the stored PDF back as an attachment
pub async fn download_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<String>,
) -> Result<Response> {
    let paper = state.catalog.find(parse_paper_id(&paper_id)?).await?;

    let Some(object) = state.storage.download(&paper.file_path).await? else {
        warn!(paper_id = %paper.id, path = %paper.file_path, "Stored file missing");
        record_download("missing", 0);
        return Err(AppError::FileNotFound {
            path: paper.file_path,
        });
    };

    if !is_pdf(&object.content_type) {
        warn!(
            paper_id = %paper.id,
            content_type = %object.content_type,
            "Refusing to serve non-PDF file"
        );
        record_download("rejected", 0);
        return Err(AppError::InvalidFileType {
            content_type: object.content_type,
        });
    }

    let disposition = attachment_header(&paper.download_file_name())?;
    record_download("served", object.bytes.len());
    info!(paper_id = %paper.id, bytes = object.bytes.len(), "Paper downloaded");

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(PDF_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, HeaderValue::from_static(DOWNLOAD_CACHE_CONTROL)),
        ],
        object.bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsr_common::domain::{Country, Level, PaperType, Subject};
    use gsr_common::query::{DateRange, SortOrder};

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        let query = pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", v.replace(' ', "%20")))
            .collect::<Vec<_>>()
            .join("&");
        let uri: axum::http::Uri = format!("/v2/papers?{query}").parse().unwrap();
        Query::<ListParams>::try_from_uri(&uri).unwrap().0
    }

    fn request() -> CreatePaperRequest {
        CreatePaperRequest {
            title: Some("Mobile money and household savings".into()),
            authors: Some(AuthorsInput::List(vec!["Wanjiru Kamau".into(), "Otieno Odhiambo".into()])),
            abstract_text: Some(
                "A panel study of mobile money adoption and savings behaviour in western Kenya.".into(),
            ),
            institution: Some("  Maseno University ".into()),
            country: Some("Kenya".into()),
            subject: Some("econ".into()),
            level: Some("undergraduate".into()),
            paper_type: Some("working_paper".into()),
            file_path: Some("papers/1700000000000_savings.pdf".into()),
        }
    }

    #[test]
    fn test_default_criteria() {
        let criteria = ListParams::default().to_criteria().unwrap();
        assert_eq!(criteria, SearchCriteria::default());
    }

    #[test]
    fn test_criteria_from_query() {
        let criteria = params(&[
            ("page", "2"),
            ("limit", "25"),
            ("country", "Kenya"),
            ("date", "2021"),
            ("type", "thesis"),
            ("sort", "title"),
            ("search", "  water "),
            ("subject", ""),
        ])
        .to_criteria()
        .unwrap();

        assert_eq!(criteria.page, 2);
        assert_eq!(criteria.page_size, 25);
        assert_eq!(criteria.sort, SortOrder::Title);
        assert_eq!(criteria.filter.country, Some(Country::Kenya));
        assert_eq!(criteria.filter.date_range, Some(DateRange::Year(2021)));
        assert_eq!(criteria.filter.paper_type, Some(PaperType::Thesis));
        assert_eq!(criteria.filter.free_text.as_deref(), Some("water"));
        assert_eq!(criteria.filter.subject, None);
    }

    #[test]
    fn test_bad_criteria_rejected() {
        for pairs in [
            &[("page", "0")][..],
            &[("page", "two")][..],
            &[("limit", "101")][..],
            &[("country", "Atlantis")][..],
            &[("level", "phd")][..],
            &[("date", "last-week")][..],
            &[("sort", "random")][..],
        ] {
            assert!(params(pairs).to_criteria().is_err(), "{pairs:?} accepted");
        }

        let err = params(&[("search", "x")]).to_criteria().unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_required_fields_in_order() {
        let mut req = request();
        req.abstract_text = None;
        req.title = Some("   ".into());
        let err = req.check_required().unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: title");

        let mut req = request();
        req.authors = Some(AuthorsInput::List(vec![" ".into()]));
        req.paper_type = None;
        let err = req.check_required().unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: authors");

        let mut req = request();
        req.file_path = None;
        assert!(matches!(req.check_required(), Err(AppError::MissingFilePath)));

        assert!(request().check_required().is_ok());
    }

    #[test]
    fn test_builds_sanitized_record() {
        let user = Uuid::new_v4();
        let mut req = request();
        req.title = Some("Mobile money<script>alert(1)</script> and savings".into());
        req.authors = Some(AuthorsInput::Joined("Wanjiru Kamau ,Otieno Odhiambo".into()));

        let paper = req.into_new_paper(user).unwrap();
        assert_eq!(paper.title, "Mobile money and savings");
        assert_eq!(paper.authors, vec!["Wanjiru Kamau", "Otieno Odhiambo"]);
        assert_eq!(paper.institution.as_deref(), Some("Maseno University"));
        assert_eq!(paper.country, Country::Kenya);
        assert_eq!(paper.subject, Subject::Economics);
        assert_eq!(paper.level, Level::Undergraduate);
        assert_eq!(paper.paper_type, PaperType::WorkingPaper);
        assert_eq!(paper.user_id, user);
    }

    #[test]
    fn test_all_field_errors_reported() {
        let mut req = request();
        req.title = Some("Hi".into());
        req.abstract_text = Some("Too short".into());
        req.country = Some("Atlantis".into());
        req.authors = Some(AuthorsInput::Joined("Ama Owusu, ".into()));

        let AppError::FieldErrors(errors) = req.into_new_paper(Uuid::new_v4()).unwrap_err() else {
            panic!("expected field errors");
        };
        assert_eq!(errors["title"], "Title must be at least 5 characters");
        assert_eq!(errors["abstract"], "Abstract must be at least 50 characters");
        assert_eq!(errors["country"], "Unknown country: Atlantis");
        assert!(errors.contains_key("authors"));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_script_only_fields_fail_validation() {
        let mut req = request();
        req.title = Some("<script>x</script>".into());
        req.authors = Some(AuthorsInput::Joined("Ama Owusu, <script>a</script>".into()));

        let AppError::FieldErrors(errors) = req.into_new_paper(Uuid::new_v4()).unwrap_err() else {
            panic!("expected field errors");
        };
        assert_eq!(errors["title"], "Title is required");
        assert_eq!(
            errors["authors"],
            "Please provide valid author names, separated by commas"
        );
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_huge_page_is_clamped() {
        let criteria = params(&[("page", "18446744073709551615"), ("limit", "10")])
            .to_criteria()
            .unwrap();
        assert_eq!(criteria.page, MAX_PAGE);
        assert!(criteria.to_query().offset <= i64::MAX as u64);
    }

    #[test]
    fn test_overlong_institution() {
        let mut req = request();
        req.institution = Some("x".repeat(301));
        let AppError::FieldErrors(errors) = req.into_new_paper(Uuid::new_v4()).unwrap_err() else {
            panic!("expected field errors");
        };
        assert_eq!(errors["institution"], "Institution must be at most 300 characters");
    }

    #[test]
    fn test_attachment_header() {
        let value = attachment_header("Water \"quality\"\n in Accra.pdf").unwrap();
        assert_eq!(value.as_bytes(), b"attachment; filename=\"Water quality in Accra.pdf\"");

        let value = attachment_header("Análisis de suelos.pdf").unwrap();
        assert_eq!(
            value.as_bytes(),
            "attachment; filename=\"Análisis de suelos.pdf\"".as_bytes()
        );
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf("application/pdf"));
        assert!(is_pdf("Application/PDF; charset=binary"));
        assert!(!is_pdf("text/html"));
        assert!(!is_pdf(""));
    }
}
