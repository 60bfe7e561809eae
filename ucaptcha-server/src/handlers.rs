//! HTTP request handlers.
//!
//! Handlers are thin: deserialize, delegate to the challenge manager or
//! key pool, and map the result to the status code and JSON body in the
//! HTTP surface table.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{body::Bytes, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use ucaptcha_common::error::{CaptchaError, VerifyStatus};

use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
struct NewChallengeRequest {
    difficulty: Option<i64>,
}

#[derive(Debug, Serialize)]
struct NewChallengeResponse {
    success: bool,
    id: String,
    g: String,
    n: String,
    t: i64,
}

#[derive(Debug, Deserialize)]
pub struct ValidationRequest {
    y: Option<String>,
}

#[derive(Debug, Serialize)]
struct ValidationResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DifficultyRequest {
    difficulty: i64,
}

#[derive(Debug, Serialize)]
struct DifficultyResponse {
    success: bool,
    difficulty: i64,
}

/// `POST /challenge`.
///
/// Takes the raw body rather than an auto-rejecting `Json<T>` extractor:
/// malformed or absent JSON MUST still produce a challenge at the default
/// difficulty (preserved legacy behavior), not a 400.
pub async fn new_challenge(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let req: NewChallengeRequest = serde_json::from_slice(&body).unwrap_or_default();

    match state.challenge_manager.new_challenge(req.difficulty).await {
        Ok(view) => (
            StatusCode::CREATED,
            Json(NewChallengeResponse {
                success: true,
                id: view.id,
                g: view.g.to_decimal_string(),
                n: view.n.to_decimal_string(),
                t: view.t,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to issue challenge");
            error_response(&e)
        }
    }
}

/// `POST /challenge/:id/validation`.
pub async fn validate_challenge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ValidationRequest>,
) -> impl IntoResponse {
    let y = req.y.unwrap_or_default();
    match state.challenge_manager.verify_challenge(&id, &y).await {
        Ok(status) => verify_status_response(status),
        Err(e) => {
            error!(error = %e, challenge_id = %id, "verification failed with a storage error");
            error_response(&e)
        }
    }
}

/// `PUT /difficulty`.
pub async fn set_difficulty(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DifficultyRequest>,
) -> impl IntoResponse {
    if req.difficulty < 0 {
        warn!(difficulty = req.difficulty, "rejected negative difficulty");
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "error": "difficulty must be non-negative",
            })),
        )
            .into_response();
    }

    state
        .challenge_manager
        .set_default_difficulty(req.difficulty);

    (
        StatusCode::OK,
        Json(DifficultyResponse {
            success: true,
            difficulty: req.difficulty,
        }),
    )
        .into_response()
}

fn verify_status_response(status: VerifyStatus) -> axum::response::Response {
    match status {
        VerifyStatus::Success => {
            (StatusCode::OK, Json(ValidationResponse { success: true, error: None })).into_response()
        }
        VerifyStatus::Failure => (
            StatusCode::UNAUTHORIZED,
            Json(ValidationResponse {
                success: false,
                error: None,
            }),
        )
            .into_response(),
        VerifyStatus::ChallengeNotFound => (
            StatusCode::NOT_FOUND,
            Json(ValidationResponse {
                success: false,
                error: Some("challenge not found".to_string()),
            }),
        )
            .into_response(),
        VerifyStatus::InvalidY => (
            StatusCode::BAD_REQUEST,
            Json(ValidationResponse {
                success: false,
                error: Some("y is not a valid non-negative integer".to_string()),
            }),
        )
            .into_response(),
        VerifyStatus::KeyMissing => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ValidationResponse {
                success: false,
                error: Some("the key this challenge was bound to is no longer available".to_string()),
            }),
        )
            .into_response(),
    }
}

fn error_response(e: &CaptchaError) -> axum::response::Response {
    let status = match e {
        CaptchaError::NoKeyAvailable => StatusCode::SERVICE_UNAVAILABLE,
        CaptchaError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    )
        .into_response()
}
