//! Client for a Judge0-compatible grading engine.
//!
//! The engine is asynchronous: `submit` creates a job and hands back a token,
//! `poll` reports the job's current status. Responses are validated here so
//! callers only ever see a closed [`JudgeStatus`] or an [`EngineError`].

pub(crate) mod status;
pub(crate) mod wire;

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::core::config::Settings;
use crate::db::models::CodeJudge;

pub(crate) use status::{JudgeStatus, Verdict};
use wire::SubmissionRequest;

const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Error)]
pub(crate) enum EngineError {
    #[error("grading engine unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("grading engine answered {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("malformed grading engine response: {0}")]
    Malformed(String),
    #[error("grading engine response carried no token")]
    MissingToken,
}

impl EngineError {
    /// A contract break rather than an outage.
    pub(crate) fn is_structural(&self) -> bool {
        matches!(self, Self::Malformed(_) | Self::MissingToken)
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::UnexpectedStatus { .. } => "status",
            Self::Malformed(_) | Self::MissingToken => "structural",
        }
    }
}

/// Immutable payload sent to the engine for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JudgeJob {
    pub(crate) language: i32,
    pub(crate) source_code: String,
    pub(crate) stdin: String,
    pub(crate) expected_output: String,
}

impl JudgeJob {
    pub(crate) fn from_record(record: &CodeJudge) -> Self {
        Self {
            language: record.language,
            source_code: record.source_code.clone(),
            stdin: record.test_arguments.clone(),
            expected_output: record.test_results.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JudgeResult {
    pub(crate) status: JudgeStatus,
    pub(crate) verdict: Verdict,
    pub(crate) description: String,
    pub(crate) stdout: Option<String>,
    pub(crate) stderr: Option<String>,
}

impl JudgeResult {
    pub(crate) fn from_status(status: JudgeStatus) -> Self {
        Self {
            status,
            verdict: status.verdict(),
            description: status.default_description().to_string(),
            stdout: None,
            stderr: None,
        }
    }

    /// Engine status id as stored in `result_code`. Polled ids are checked to
    /// fit when the response is decoded.
    pub(crate) fn result_code(&self) -> i32 {
        i32::try_from(self.status.id()).unwrap_or_else(|_| {
            tracing::warn!(status_id = self.status.id(), "Engine status id out of range");
            i32::MAX
        })
    }

    /// Program output to persist: stdout when present, stderr otherwise.
    pub(crate) fn output(&self) -> Option<&str> {
        self.stdout.as_deref().or(self.stderr.as_deref())
    }
}

#[async_trait]
pub(crate) trait GradingEngine: Send + Sync {
    async fn submit(&self, job: &JudgeJob) -> Result<String, EngineError>;

    async fn poll(&self, token: &str) -> Result<JudgeResult, EngineError>;
}

#[derive(Debug, Clone)]
pub(crate) struct Judge0Client {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl Judge0Client {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(
            settings.judge().base_url.clone(),
            settings.judge().auth_token.clone(),
            settings.judge().timeout(),
        )
    }

    pub(crate) fn new(
        base_url: String,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .context("Failed to build Judge0 HTTP client")?;

        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), auth_token })
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.header("X-Auth-Token", token),
            None => request,
        }
    }
}

#[async_trait]
impl GradingEngine for Judge0Client {
    async fn submit(&self, job: &JudgeJob) -> Result<String, EngineError> {
        let endpoint = format!("{}/submissions", self.base_url);
        let body = SubmissionRequest {
            source_code: job.source_code.clone(),
            language_id: job.language,
            stdin: job.stdin.clone(),
            expected_output: job.expected_output.clone(),
        };

        let response = self.with_auth(self.client.post(&endpoint)).json(&body).send().await?;
        let status = response.status();
        let raw_body = response.text().await?;

        if !status.is_success() {
            return Err(EngineError::UnexpectedStatus { status, body: truncate(&raw_body) });
        }

        wire::parse_token(&raw_body)
    }

    async fn poll(&self, token: &str) -> Result<JudgeResult, EngineError> {
        let endpoint = format!("{}/submissions/{}", self.base_url, token);

        let response = self.with_auth(self.client.get(&endpoint)).send().await?;
        let status = response.status();
        let raw_body = response.text().await?;

        if !status.is_success() {
            return Err(EngineError::UnexpectedStatus { status, body: truncate(&raw_body) });
        }

        wire::parse_status(&raw_body)
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{EngineError, GradingEngine, Judge0Client, JudgeJob, Verdict};
    use crate::services::mock_judge::{self, MockJudge};

    fn job() -> JudgeJob {
        JudgeJob {
            language: 71,
            source_code: "print('x')".to_string(),
            stdin: String::new(),
            expected_output: "x".to_string(),
        }
    }

    async fn serve(judge: MockJudge) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, mock_judge::router(judge)).await.expect("mock judge");
        });
        format!("http://{addr}")
    }

    fn client(base_url: String) -> Judge0Client {
        Judge0Client::new(base_url, None, Duration::from_secs(5)).expect("client")
    }

    #[tokio::test]
    async fn submit_then_poll_against_mock_engine() {
        let judge = MockJudge::deterministic();
        let base_url = serve(judge.clone()).await;
        let client = client(base_url);

        let token = client.submit(&job()).await.expect("submit");
        assert!(token.starts_with("mock-"));

        let pending = client.poll(&token).await.expect("poll");
        assert_eq!(pending.verdict, Verdict::InProcess);

        judge.complete(&token, 3).await;
        let done = client.poll(&token).await.expect("poll");
        assert_eq!(done.verdict, Verdict::Ok);
        assert_eq!(done.description, "Accepted");
    }

    #[tokio::test]
    async fn unknown_token_is_an_unexpected_status() {
        let base_url = serve(MockJudge::deterministic()).await;
        let err = client(base_url).poll("missing").await.expect_err("404");

        assert!(matches!(err, EngineError::UnexpectedStatus { status, .. } if status == 404));
        assert!(!err.is_structural());
    }

    #[tokio::test]
    async fn unreachable_engine_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let err = client(format!("http://{addr}")).submit(&job()).await.expect_err("refused");
        assert_eq!(err.kind(), "transport");
    }
}
