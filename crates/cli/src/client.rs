//! HTTP client for the repository gateway
//!
//! Implements the identity and paper-writer ports so the submission
//! pipeline can run against a remote gateway.

use async_trait::async_trait;
use gsr_common::{
    domain::NewPaper,
    errors::{AppError, ErrorCode, ErrorResponse, Result},
    pagination::PaginationInfo,
    submission::IdentityProvider,
    Paper, PaperWriter,
};
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

/// One page from `GET /v2/papers`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPage {
    pub data: Vec<Paper>,
    pub pagination: PaginationInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    user_id: Uuid,
}

/// A downloaded PDF and the file name the gateway suggested
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

pub struct GatewayClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

fn transport(err: reqwest::Error) -> AppError {
    AppError::Upstream {
        message: err.to_string(),
    }
}

/// Turn a gateway error body back into an [`AppError`]
pub fn error_from_body(status: StatusCode, body: &[u8]) -> AppError {
    let parsed: Option<ErrorResponse> = serde_json::from_slice(body).ok();
    let message = parsed
        .as_ref()
        .map(|r| r.error.message.clone())
        .unwrap_or_else(|| format!("Gateway responded with {status}"));

    match parsed.map(|r| r.error.code) {
        Some(ErrorCode::Unauthorized) => AppError::Unauthorized { message },
        Some(ErrorCode::InvalidToken) => AppError::InvalidToken,
        Some(ErrorCode::PaperNotFound) => AppError::PaperNotFound { id: message },
        Some(ErrorCode::FileNotFound) => AppError::FileNotFound { path: message },
        Some(ErrorCode::InvalidFileType) => AppError::InvalidFileType {
            content_type: message,
        },
        Some(ErrorCode::RateLimited) => AppError::RateLimited {
            origin: "self".to_string(),
        },
        Some(ErrorCode::ValidationError | ErrorCode::MissingField | ErrorCode::InvalidFormat) => {
            AppError::Validation {
                message,
                field: None,
            }
        }
        _ => AppError::Upstream {
            message: format!("{status}: {message}"),
        },
    }
}

/// File name from `attachment; filename="..."`
pub fn attachment_file_name(disposition: &str) -> Option<String> {
    let (_, rest) = disposition.split_once("filename=\"")?;
    let (name, _) = rest.split_once('"')?;
    Some(name.to_string()).filter(|n| !n.is_empty())
}

impl GatewayClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gsr-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transport)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Absolute URL for a `/v2` API path
    pub fn url(&self, path: &str) -> String {
        format!("{}/v2{}", self.base_url, path)
    }

    async fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;
        Err(error_from_body(status, &body))
    }

    #[instrument(skip(self))]
    pub async fn list_papers(&self, query: &[(&'static str, String)]) -> Result<ListPage> {
        let response = self
            .http
            .get(self.url("/papers"))
            .query(query)
            .send()
            .await
            .map_err(transport)?;
        Self::check(response).await?.json().await.map_err(transport)
    }

    #[instrument(skip(self))]
    pub async fn download(&self, id: Uuid) -> Result<DownloadedFile> {
        let response = self
            .http
            .get(self.url(&format!("/papers/{id}/download")))
            .send()
            .await
            .map_err(transport)?;
        let response = Self::check(response).await?;

        let file_name = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_file_name);
        let bytes = response.bytes().await.map_err(transport)?.to_vec();

        Ok(DownloadedFile { file_name, bytes })
    }
}

#[async_trait]
impl IdentityProvider for GatewayClient {
    /// `None` when there is no token or the gateway rejects it
    async fn current_user(&self) -> Result<Option<Uuid>> {
        let Some(token) = &self.token else {
            return Ok(None);
        };

        let response = self
            .http
            .get(self.url("/auth/verify"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Gateway rejected the token");
            return Ok(None);
        }

        let verified: VerifyResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(transport)?;
        Ok(Some(verified.user_id))
    }
}

#[async_trait]
impl PaperWriter for GatewayClient {
    async fn insert_paper(&self, paper: NewPaper) -> Result<Paper> {
        let token = self.token.as_deref().ok_or_else(|| AppError::Unauthorized {
            message: "No token provided".to_string(),
        })?;

        let response = self
            .http
            .post(self.url("/papers"))
            .bearer_auth(token)
            .json(&paper)
            .send()
            .await
            .map_err(transport)?;

        Self::check(response).await?.json().await.map_err(transport)
    }
}
