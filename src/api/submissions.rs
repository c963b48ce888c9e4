use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::schemas::submission::{CreateSubmissionRequest, SubmissionStatusResponse};

/// Three text fields at the character cap, four UTF-8 bytes each, plus room
/// for the JSON envelope and escapes.
const MAX_BODY_BYTES: usize = 3 * 4 * 1_048_576 + 64 * 1024;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_submission))
        .route("/:id", get(get_submission))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

/// Persists the payload as a NEW record; grading happens in the reconciler.
async fn create_submission(
    State(state): State<AppState>,
    payload: Result<Json<CreateSubmissionRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(payload) = payload?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let submission_id = payload.submission_id;
    let record = state
        .store()
        .create(payload.into())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store submission"))?;

    metrics::counter!("code_judge_transitions_total", "to" => "NEW").increment(1);
    tracing::info!(
        code_judge_id = %record.id,
        submission_id,
        language = record.language,
        "Code judge accepted"
    );

    Ok(StatusCode::ACCEPTED)
}

async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubmissionStatusResponse>, ApiError> {
    let record = state
        .store()
        .find(&id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    Ok(Json(record.into()))
}
