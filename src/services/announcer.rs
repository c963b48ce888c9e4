use async_trait::async_trait;
use redis::RedisError;
use serde::Serialize;
use thiserror::Error;

use crate::core::config::Settings;
use crate::core::redis::RedisHandle;
use crate::db::models::CodeJudge;
use crate::db::types::CodeJudgeStatus;
use crate::services::judge0::{JudgeStatus, Verdict};

#[derive(Debug, Error)]
pub(crate) enum PublishError {
    #[error("broker rejected announcement: {0}")]
    Redis(#[from] RedisError),
    #[error("failed to encode announcement: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("record {0} is not terminal")]
    NotTerminal(String),
}

/// Message announced once a record reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompletionEvent {
    pub(crate) submission_id: i64,
    pub(crate) code_judge_id: String,
    pub(crate) status: CodeJudgeStatus,
    pub(crate) result: Verdict,
    pub(crate) result_message: String,
}

impl CompletionEvent {
    /// Built from the persisted record so a re-announcement is byte-identical
    /// to the first attempt.
    pub(crate) fn from_record(record: &CodeJudge) -> Result<Self, PublishError> {
        let (result, result_message) = match record.status {
            CodeJudgeStatus::Done => {
                let verdict = record
                    .result_code
                    .map(|code| JudgeStatus::from_id(i64::from(code)).verdict())
                    .unwrap_or(Verdict::OtherException);
                (verdict, record.result_message.clone().unwrap_or_default())
            }
            CodeJudgeStatus::Failed => (
                Verdict::OtherException,
                record.last_error.clone().unwrap_or_else(|| "submission failed".to_string()),
            ),
            CodeJudgeStatus::New | CodeJudgeStatus::Submitted => {
                return Err(PublishError::NotTerminal(record.id.clone()))
            }
        };

        Ok(Self {
            submission_id: record.submission_id,
            code_judge_id: record.id.clone(),
            status: record.status,
            result,
            result_message,
        })
    }
}

#[async_trait]
pub(crate) trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &CompletionEvent) -> Result<(), PublishError>;
}

/// Appends announcements to a Redis stream acting as the results topic.
#[derive(Clone)]
pub(crate) struct RedisStreamPublisher {
    redis: RedisHandle,
    stream: String,
    maxlen: u64,
}

impl RedisStreamPublisher {
    pub(crate) fn from_settings(settings: &Settings, redis: RedisHandle) -> Self {
        Self {
            redis,
            stream: settings.redis().results_stream.clone(),
            maxlen: settings.redis().results_stream_maxlen,
        }
    }
}

#[async_trait]
impl EventPublisher for RedisStreamPublisher {
    async fn publish(&self, event: &CompletionEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_string(event)?;
        let entry_id = self
            .redis
            .append_to_stream(
                &self.stream,
                self.maxlen,
                &[("codeJudgeId", event.code_judge_id.as_str()), ("payload", payload.as_str())],
            )
            .await?;

        tracing::debug!(
            code_judge_id = %event.code_judge_id,
            stream = %self.stream,
            entry_id = %entry_id,
            "completion announced"
        );
        Ok(())
    }
}
