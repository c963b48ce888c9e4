use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::JudgeStatus;
use super::{EngineError, JudgeResult};

/// `POST /submissions` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SubmissionRequest {
    pub(crate) source_code: String,
    pub(crate) language_id: i32,
    #[serde(default)]
    pub(crate) stdin: String,
    #[serde(default)]
    pub(crate) expected_output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StatusBlock {
    pub(crate) id: i64,
    pub(crate) description: String,
}

/// `GET /submissions/{token}` body, as produced by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StatusResponse {
    pub(crate) status: StatusBlock,
    #[serde(default)]
    pub(crate) stdout: Option<String>,
    #[serde(default)]
    pub(crate) stderr: Option<String>,
}

pub(super) fn parse_token(raw_body: &str) -> Result<String, EngineError> {
    let parsed: Value = serde_json::from_str(raw_body)
        .map_err(|err| EngineError::Malformed(format!("non-JSON submit response: {err}")))?;

    let token = parsed
        .get("token")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(EngineError::MissingToken)?;

    Ok(token.to_string())
}

/// Validates the status block; any structural defect is an error, never a verdict.
pub(super) fn parse_status(raw_body: &str) -> Result<JudgeResult, EngineError> {
    let parsed: Value = serde_json::from_str(raw_body)
        .map_err(|err| EngineError::Malformed(format!("non-JSON poll response: {err}")))?;

    let block = parsed
        .get("status")
        .filter(|value| value.is_object())
        .ok_or_else(|| EngineError::Malformed("missing status block".to_string()))?;

    // Ids are persisted as `result_code INTEGER`.
    let id = block
        .get("id")
        .and_then(status_id)
        .filter(|id| i32::try_from(*id).is_ok())
        .ok_or_else(|| {
            EngineError::Malformed(format!("invalid status id: {}", status_field(block)))
        })?;

    let status = JudgeStatus::from_id(id);
    let description = block
        .get("description")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| status.default_description().to_string());

    Ok(JudgeResult {
        status,
        verdict: status.verdict(),
        description,
        stdout: optional_text(&parsed, "stdout"),
        stderr: optional_text(&parsed, "stderr"),
    })
}

fn status_id(value: &Value) -> Option<i64> {
    if let Some(id) = value.as_i64() {
        return Some(id);
    }

    value.as_f64().filter(|id| id.fract() == 0.0 && id.is_finite()).map(|id| id as i64)
}

fn status_field(status: &Value) -> String {
    status.get("id").map(Value::to_string).unwrap_or_else(|| "<absent>".to_string())
}

fn optional_text(payload: &Value, field: &str) -> Option<String> {
    payload.get(field).and_then(Value::as_str).map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::{parse_status, parse_token};
    use crate::services::judge0::status::{JudgeStatus, Verdict};
    use crate::services::judge0::EngineError;

    #[test]
    fn token_is_extracted() {
        assert_eq!(parse_token(r#"{"token":"abc"}"#).unwrap(), "abc");
    }

    #[test]
    fn empty_or_absent_token_is_an_error() {
        assert!(matches!(parse_token(r#"{"token":""}"#), Err(EngineError::MissingToken)));
        assert!(matches!(parse_token(r#"{"token":"  "}"#), Err(EngineError::MissingToken)));
        assert!(matches!(parse_token(r#"{"error":"queue full"}"#), Err(EngineError::MissingToken)));
        assert!(matches!(parse_token(r#"{"token":42}"#), Err(EngineError::MissingToken)));
        assert!(matches!(parse_token("<html>"), Err(EngineError::Malformed(_))));
    }

    #[test]
    fn accepted_status_is_parsed_with_output() {
        let result = parse_status(
            r#"{"status":{"id":3,"description":"Accepted"},"stdout":"x\n","stderr":null}"#,
        )
        .unwrap();

        assert_eq!(result.status, JudgeStatus::Accepted);
        assert_eq!(result.verdict, Verdict::Ok);
        assert_eq!(result.description, "Accepted");
        assert_eq!(result.output(), Some("x\n"));
    }

    #[test]
    fn stderr_is_used_when_stdout_is_absent() {
        let result = parse_status(
            r#"{"status":{"id":11,"description":"Runtime Error (NZEC)"},"stderr":"boom"}"#,
        )
        .unwrap();

        assert_eq!(result.verdict, Verdict::RuntimeException);
        assert_eq!(result.output(), Some("boom"));
    }

    #[test]
    fn missing_description_falls_back_to_engine_default() {
        let result = parse_status(r#"{"status":{"id":6}}"#).unwrap();
        assert_eq!(result.description, "Compilation Error");
        assert_eq!(result.verdict, Verdict::Failed);
    }

    #[test]
    fn structurally_invalid_status_is_rejected() {
        for body in [
            r#"{}"#,
            r#"{"status":null}"#,
            r#"{"status":"Accepted"}"#,
            r#"{"status":{"description":"Accepted"}}"#,
            r#"{"status":{"id":"3"}}"#,
            r#"{"status":{"id":3.5}}"#,
            r#"{"status":{"id":2147483648}}"#,
            r#"{"status":{"id":-2147483649}}"#,
            "not json",
        ] {
            let err = parse_status(body).expect_err(body);
            assert!(err.is_structural(), "{body} should be structural, got {err}");
        }
    }

    #[test]
    fn unrecognized_status_id_is_kept() {
        let result = parse_status(r#"{"status":{"id":99,"description":"Mystery"}}"#).unwrap();
        assert_eq!(result.status, JudgeStatus::Unrecognized(99));
        assert_eq!(result.verdict, Verdict::OtherException);
    }
}
