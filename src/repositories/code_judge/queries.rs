use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::CodeJudge;
use crate::db::types::CodeJudgeStatus;

use super::types::COLUMNS;

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<CodeJudge>, sqlx::Error> {
    sqlx::query_as::<_, CodeJudge>(&format!("SELECT {COLUMNS} FROM code_judge WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Non-terminal records whose backoff deadline has passed, oldest first.
pub(crate) async fn list_pending(
    pool: &PgPool,
    now: PrimitiveDateTime,
    limit: i64,
) -> Result<Vec<CodeJudge>, sqlx::Error> {
    sqlx::query_as::<_, CodeJudge>(&format!(
        "SELECT {COLUMNS}
         FROM code_judge
         WHERE status IN ($1, $2)
           AND (next_attempt_at IS NULL OR next_attempt_at <= $3)
         ORDER BY created_at, id
         LIMIT $4"
    ))
    .bind(CodeJudgeStatus::New)
    .bind(CodeJudgeStatus::Submitted)
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Terminal records whose announcement has not been confirmed yet.
pub(crate) async fn list_unannounced(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<CodeJudge>, sqlx::Error> {
    sqlx::query_as::<_, CodeJudge>(&format!(
        "SELECT {COLUMNS}
         FROM code_judge
         WHERE status IN ($1, $2)
           AND announced_at IS NULL
         ORDER BY updated_at, id
         LIMIT $3"
    ))
    .bind(CodeJudgeStatus::Done)
    .bind(CodeJudgeStatus::Failed)
    .bind(limit)
    .fetch_all(pool)
    .await
}
