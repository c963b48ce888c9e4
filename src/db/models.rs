use serde::Serialize;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::CodeJudgeStatus;

/// One submission tracked through the grading engine.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub(crate) struct CodeJudge {
    pub(crate) id: String,
    pub(crate) submission_id: i64,
    pub(crate) language: i32,
    pub(crate) source_code: String,
    pub(crate) test_arguments: String,
    pub(crate) test_results: String,
    pub(crate) status: CodeJudgeStatus,
    pub(crate) token: Option<String>,
    pub(crate) result_code: Option<i32>,
    pub(crate) result_message: Option<String>,
    pub(crate) test_output: Option<String>,
    pub(crate) submit_attempts: i32,
    pub(crate) next_attempt_at: Option<PrimitiveDateTime>,
    pub(crate) last_error: Option<String>,
    pub(crate) announced_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
