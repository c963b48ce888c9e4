use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::CodeJudge;
use crate::db::types::CodeJudgeStatus;

use super::types::{CreateCodeJudge, ResultUpdate, COLUMNS};

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateCodeJudge<'_>,
) -> Result<CodeJudge, sqlx::Error> {
    sqlx::query_as::<_, CodeJudge>(&format!(
        "INSERT INTO code_judge (
            id, submission_id, language, source_code, test_arguments, test_results,
            status, submit_attempts, created_at, updated_at
         )
         VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $8)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.submission_id)
    .bind(params.language)
    .bind(params.source_code)
    .bind(params.test_arguments)
    .bind(params.test_results)
    .bind(CodeJudgeStatus::New)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

/// NEW -> SUBMITTED. Returns the number of rows matched.
pub(crate) async fn update_token(
    pool: &PgPool,
    id: &str,
    token: &str,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE code_judge
         SET token = $1,
             status = $2,
             next_attempt_at = NULL,
             last_error = NULL,
             updated_at = $3
         WHERE id = $4 AND status = $5",
    )
    .bind(token)
    .bind(CodeJudgeStatus::Submitted)
    .bind(now)
    .bind(id)
    .bind(CodeJudgeStatus::New)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub(crate) async fn update_status(
    pool: &PgPool,
    id: &str,
    from: CodeJudgeStatus,
    to: CodeJudgeStatus,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE code_judge
         SET status = $1,
             updated_at = $2
         WHERE id = $3 AND status = $4",
    )
    .bind(to)
    .bind(now)
    .bind(id)
    .bind(from)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// SUBMITTED -> DONE with the engine's verdict.
pub(crate) async fn update_result(
    pool: &PgPool,
    id: &str,
    params: ResultUpdate<'_>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE code_judge
         SET status = $1,
             result_code = $2,
             result_message = $3,
             test_output = $4,
             updated_at = $5
         WHERE id = $6 AND status = $7",
    )
    .bind(CodeJudgeStatus::Done)
    .bind(params.result_code)
    .bind(params.result_message)
    .bind(params.test_output)
    .bind(params.updated_at)
    .bind(id)
    .bind(CodeJudgeStatus::Submitted)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub(crate) async fn record_submit_failure(
    pool: &PgPool,
    id: &str,
    error: &str,
    next_attempt_at: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE code_judge
         SET submit_attempts = submit_attempts + 1,
             last_error = $1,
             next_attempt_at = $2,
             updated_at = $3
         WHERE id = $4 AND status = $5",
    )
    .bind(error)
    .bind(next_attempt_at)
    .bind(now)
    .bind(id)
    .bind(CodeJudgeStatus::New)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub(crate) async fn mark_announced(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE code_judge
         SET announced_at = $1
         WHERE id = $2
           AND status IN ($3, $4)
           AND announced_at IS NULL",
    )
    .bind(now)
    .bind(id)
    .bind(CodeJudgeStatus::Done)
    .bind(CodeJudgeStatus::Failed)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
