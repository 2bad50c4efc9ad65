//! Liveness and readiness probes. Both sit outside the rate limiter.

use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::Instant;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Up,
    Down,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct ReadyChecks {
    pub database: CheckResult,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub checks: ReadyChecks,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: gsr_common::VERSION,
    })
}

/// 503 while the paper store cannot be reached
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let start = Instant::now();

    let database = match state.store.ping().await {
        Ok(()) => CheckResult {
            status: CheckStatus::Up,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Paper store unreachable");
            CheckResult {
                status: CheckStatus::Down,
                latency_ms: None,
                error: Some(e.public_message()),
            }
        }
    };

    let (code, status) = match database.status {
        CheckStatus::Up => (StatusCode::OK, "ready"),
        CheckStatus::Down => (StatusCode::SERVICE_UNAVAILABLE, "not_ready"),
    };

    (
        code,
        Json(ReadyResponse {
            status,
            checks: ReadyChecks { database },
        }),
    )
}
