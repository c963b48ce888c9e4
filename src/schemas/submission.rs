use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::CodeJudge;
use crate::db::types::CodeJudgeStatus;
use crate::services::judge0::{JudgeStatus, Verdict};
use crate::services::submission_store::NewSubmission;

/// Ingestion body. `assignmentId` is accepted as an alias of `submissionId`.
///
/// Content is passed to the engine as-is; only the size of the stored text
/// is bounded.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateSubmissionRequest {
    #[serde(alias = "assignmentId")]
    pub(crate) submission_id: i64,
    pub(crate) language: i32,
    #[validate(length(max = 1048576, message = "sourceCode exceeds 1048576 characters"))]
    pub(crate) source_code: String,
    #[serde(default)]
    #[validate(length(max = 1048576, message = "testArguments exceeds 1048576 characters"))]
    pub(crate) test_arguments: String,
    #[serde(default)]
    #[validate(length(max = 1048576, message = "testResults exceeds 1048576 characters"))]
    pub(crate) test_results: String,
}

impl From<CreateSubmissionRequest> for NewSubmission {
    fn from(request: CreateSubmissionRequest) -> Self {
        Self {
            submission_id: request.submission_id,
            language: request.language,
            source_code: request.source_code,
            test_arguments: request.test_arguments,
            test_results: request.test_results,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionStatusResponse {
    pub(crate) id: String,
    pub(crate) submission_id: i64,
    pub(crate) status: CodeJudgeStatus,
    pub(crate) token: Option<String>,
    pub(crate) result_code: Option<i32>,
    pub(crate) result_message: Option<String>,
    pub(crate) result: Option<Verdict>,
    pub(crate) submit_attempts: i32,
    pub(crate) last_error: Option<String>,
    pub(crate) announced: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<CodeJudge> for SubmissionStatusResponse {
    fn from(record: CodeJudge) -> Self {
        let result = match record.status {
            CodeJudgeStatus::Done => record
                .result_code
                .map(|code| JudgeStatus::from_id(i64::from(code)).verdict()),
            CodeJudgeStatus::Failed => Some(Verdict::OtherException),
            CodeJudgeStatus::New | CodeJudgeStatus::Submitted => None,
        };

        Self {
            id: record.id,
            submission_id: record.submission_id,
            status: record.status,
            token: record.token,
            result_code: record.result_code,
            result_message: record.result_message,
            result,
            submit_attempts: record.submit_attempts,
            last_error: record.last_error,
            announced: record.announced_at.is_some(),
            created_at: format_primitive(record.created_at),
            updated_at: format_primitive(record.updated_at),
        }
    }
}
