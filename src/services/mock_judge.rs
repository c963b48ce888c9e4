//! In-process stand-in for a Judge0 server, used by the `mock_judge` binary
//! and by client tests.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rand::Rng;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::services::judge0::wire::{StatusBlock, StatusResponse, SubmissionRequest, TokenResponse};
use crate::services::judge0::JudgeStatus;

/// Probability that a poll of a running job completes it.
const RANDOM_COMPLETION_CHANCE: f64 = 1.0 / 3.0;

#[derive(Clone)]
pub(crate) struct MockJudge {
    jobs: Arc<Mutex<HashMap<String, StatusResponse>>>,
    completion_chance: f64,
}

impl MockJudge {
    /// Running jobs finish as Accepted on a random poll.
    pub(crate) fn random() -> Self {
        Self { jobs: Arc::default(), completion_chance: RANDOM_COMPLETION_CHANCE }
    }

    /// Jobs only finish through [`MockJudge::complete`].
    #[cfg(test)]
    pub(crate) fn deterministic() -> Self {
        Self { jobs: Arc::default(), completion_chance: 0.0 }
    }

    /// Forces the job behind `token` into the given engine status.
    #[cfg(test)]
    pub(crate) async fn complete(&self, token: &str, status_id: i64) {
        let status = JudgeStatus::from_id(status_id);
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(token) {
            job.status = StatusBlock {
                id: status.id(),
                description: status.default_description().to_string(),
            };
            if status == JudgeStatus::Accepted {
                job.stdout = Some("Hello, World!\n".to_string());
            }
        }
    }
}

pub(crate) fn router(judge: MockJudge) -> Router {
    Router::new()
        .route("/submissions", post(create_submission))
        .route("/submissions/:token", get(get_submission))
        .with_state(judge)
}

async fn create_submission(
    State(judge): State<MockJudge>,
    Json(request): Json<SubmissionRequest>,
) -> Response {
    let token = format!("mock-{}", Uuid::new_v4().simple());
    tracing::info!(
        token = %token,
        language_id = request.language_id,
        source_bytes = request.source_code.len(),
        "mock judge accepted submission"
    );

    let processing = JudgeStatus::Processing;
    judge.jobs.lock().await.insert(
        token.clone(),
        StatusResponse {
            status: StatusBlock {
                id: processing.id(),
                description: processing.default_description().to_string(),
            },
            stdout: None,
            stderr: None,
        },
    );

    (StatusCode::CREATED, Json(TokenResponse { token })).into_response()
}

async fn get_submission(State(judge): State<MockJudge>, Path(token): Path<String>) -> Response {
    let mut jobs = judge.jobs.lock().await;
    let Some(job) = jobs.get_mut(&token) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let running = !JudgeStatus::from_id(job.status.id).verdict().is_terminal();
    if running && rand::thread_rng().gen_bool(judge.completion_chance) {
        let accepted = JudgeStatus::Accepted;
        job.status = StatusBlock {
            id: accepted.id(),
            description: accepted.default_description().to_string(),
        };
        job.stdout = Some("Hello, World!\n".to_string());
    }

    Json(job.clone()).into_response()
}
