use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::CodeJudge;
use crate::db::types::CodeJudgeStatus;
use crate::repositories;
use crate::services::judge0::JudgeResult;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// The conditional update matched nothing: the record vanished, was
    /// advanced by another writer, or the id is stale.
    #[error("{operation} matched no row for code judge {id}")]
    NoRowsAffected { id: String, operation: &'static str },
    #[error("transition to {to} cannot be applied through a status update")]
    InvalidTransition { to: CodeJudgeStatus },
}

/// Immutable submission payload accepted at ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewSubmission {
    pub(crate) submission_id: i64,
    pub(crate) language: i32,
    pub(crate) source_code: String,
    pub(crate) test_arguments: String,
    pub(crate) test_results: String,
}

/// Durable home of every code judge record.
///
/// Every update is conditional on the record id and on the state the
/// transition starts from; a miss is reported as
/// [`StoreError::NoRowsAffected`] instead of being ignored.
#[async_trait]
pub(crate) trait SubmissionStore: Send + Sync {
    async fn create(&self, submission: NewSubmission) -> Result<CodeJudge, StoreError>;

    async fn find(&self, id: &str) -> Result<Option<CodeJudge>, StoreError>;

    /// NEW and SUBMITTED records due at `now`, oldest first, at most `limit`.
    async fn load_pending(
        &self,
        now: PrimitiveDateTime,
        limit: u32,
    ) -> Result<Vec<CodeJudge>, StoreError>;

    /// Terminal records whose announcement is not confirmed yet.
    async fn load_unannounced(&self, limit: u32) -> Result<Vec<CodeJudge>, StoreError>;

    /// NEW -> SUBMITTED, storing the engine token.
    async fn update_token(&self, id: &str, token: &str) -> Result<(), StoreError>;

    /// Moves a record into `status` from its only legal predecessor. Only
    /// transitions that carry no data (NEW -> FAILED) go through here.
    async fn update_status(&self, id: &str, status: CodeJudgeStatus) -> Result<(), StoreError>;

    /// SUBMITTED -> DONE with the engine verdict and program output.
    async fn update_result(&self, id: &str, result: &JudgeResult) -> Result<(), StoreError>;

    /// Counts a failed submit on a NEW record and defers its next attempt.
    async fn record_submit_failure(
        &self,
        id: &str,
        error: &str,
        next_attempt_at: PrimitiveDateTime,
    ) -> Result<(), StoreError>;

    async fn mark_announced(&self, id: &str) -> Result<(), StoreError>;
}

/// Rejects everything except data-free transitions.
pub(crate) fn status_update_source(
    status: CodeJudgeStatus,
) -> Result<CodeJudgeStatus, StoreError> {
    match (status, status.predecessor()) {
        (CodeJudgeStatus::Failed, Some(from)) => Ok(from),
        _ => Err(StoreError::InvalidTransition { to: status }),
    }
}

fn expect_one(rows: u64, id: &str, operation: &'static str) -> Result<(), StoreError> {
    if rows == 0 {
        return Err(StoreError::NoRowsAffected { id: id.to_string(), operation });
    }
    Ok(())
}

#[derive(Clone)]
pub(crate) struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn create(&self, submission: NewSubmission) -> Result<CodeJudge, StoreError> {
        let id = Uuid::new_v4().to_string();
        let record = repositories::code_judge::create(
            &self.pool,
            repositories::code_judge::CreateCodeJudge {
                id: &id,
                submission_id: submission.submission_id,
                language: submission.language,
                source_code: &submission.source_code,
                test_arguments: &submission.test_arguments,
                test_results: &submission.test_results,
                created_at: primitive_now_utc(),
            },
        )
        .await?;

        Ok(record)
    }

    async fn find(&self, id: &str) -> Result<Option<CodeJudge>, StoreError> {
        Ok(repositories::code_judge::find_by_id(&self.pool, id).await?)
    }

    async fn load_pending(
        &self,
        now: PrimitiveDateTime,
        limit: u32,
    ) -> Result<Vec<CodeJudge>, StoreError> {
        Ok(repositories::code_judge::list_pending(&self.pool, now, i64::from(limit)).await?)
    }

    async fn load_unannounced(&self, limit: u32) -> Result<Vec<CodeJudge>, StoreError> {
        Ok(repositories::code_judge::list_unannounced(&self.pool, i64::from(limit)).await?)
    }

    async fn update_token(&self, id: &str, token: &str) -> Result<(), StoreError> {
        let rows =
            repositories::code_judge::update_token(&self.pool, id, token, primitive_now_utc())
                .await?;
        expect_one(rows, id, "update_token")
    }

    async fn update_status(&self, id: &str, status: CodeJudgeStatus) -> Result<(), StoreError> {
        let from = status_update_source(status)?;
        let rows = repositories::code_judge::update_status(
            &self.pool,
            id,
            from,
            status,
            primitive_now_utc(),
        )
        .await?;
        expect_one(rows, id, "update_status")
    }

    async fn update_result(&self, id: &str, result: &JudgeResult) -> Result<(), StoreError> {
        let rows = repositories::code_judge::update_result(
            &self.pool,
            id,
            repositories::code_judge::ResultUpdate {
                result_code: result.result_code(),
                result_message: &result.description,
                test_output: result.output(),
                updated_at: primitive_now_utc(),
            },
        )
        .await?;
        expect_one(rows, id, "update_result")
    }

    async fn record_submit_failure(
        &self,
        id: &str,
        error: &str,
        next_attempt_at: PrimitiveDateTime,
    ) -> Result<(), StoreError> {
        let rows = repositories::code_judge::record_submit_failure(
            &self.pool,
            id,
            error,
            next_attempt_at,
            primitive_now_utc(),
        )
        .await?;
        expect_one(rows, id, "record_submit_failure")
    }

    async fn mark_announced(&self, id: &str) -> Result<(), StoreError> {
        let rows =
            repositories::code_judge::mark_announced(&self.pool, id, primitive_now_utc()).await?;
        expect_one(rows, id, "mark_announced")
    }
}
