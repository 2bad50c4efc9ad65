//! Identity verification for submission clients

use axum::Json;
use gsr_common::auth::AuthContext;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub user_id: Uuid,
}

/// Resolve the bearer token to the submitter's id.
/// Missing tokens are rejected with "No token provided", bad or expired
/// ones with "Invalid token".
pub async fn verify(auth: AuthContext) -> Json<VerifyResponse> {
    tracing::debug!(user_id = %auth.user_id, request_id = %auth.request_id, "Token verified");
    Json(VerifyResponse {
        user_id: auth.user_id,
    })
}
