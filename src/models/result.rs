use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::TestStatus;

/// Recorded result of running one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub description: String,
    pub status: TestStatus,
    pub duration_ms: f64,
    #[serde(default, rename = "error", skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDetail>,
}

impl TestOutcome {
    pub fn passed(id: Uuid, description: impl Into<String>, duration_ms: f64) -> Self {
        Self {
            id,
            description: description.into(),
            status: TestStatus::Passed,
            duration_ms,
            failure: None,
        }
    }

    pub fn failed(
        id: Uuid,
        description: impl Into<String>,
        duration_ms: f64,
        failure: FailureDetail,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            status: TestStatus::Failed,
            duration_ms,
            failure: Some(failure),
        }
    }

    pub fn skipped(id: Uuid, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            status: TestStatus::Skipped,
            duration_ms: 0.0,
            failure: None,
        }
    }
}

/// Error payload attached to a failed outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "FailureKind::is_error")]
    pub kind: FailureKind,
}

impl FailureDetail {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
            kind,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Build a failure from an effect's error, keeping the top-level message
    /// verbatim and the cause chain as the stack.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let causes: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
        let detail = Self::new(FailureKind::Error, err.to_string());
        if causes.is_empty() {
            detail
        } else {
            detail.with_stack(format!("Caused by:\n    {}", causes.join("\n    ")))
        }
    }

    pub fn timeout(after_ms: u128) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("Test timed out after {}ms", after_ms),
        )
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == FailureKind::Timeout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The effect or a hook returned an error.
    #[default]
    Error,
    Panic,
    Timeout,
    /// The run was aborted while the case was in flight.
    Interrupted,
}

impl FailureKind {
    pub fn is_error(&self) -> bool {
        *self == FailureKind::Error
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, anyhow};

    #[test]
    fn error_message_is_kept_verbatim() {
        let err = anyhow!("assertion failed");
        let detail = FailureDetail::from_error(&err);
        assert_eq!(detail.message, "assertion failed");
        assert_eq!(detail.stack, None);
        assert_eq!(detail.kind, FailureKind::Error);
    }

    #[test]
    fn cause_chain_becomes_stack() {
        let err = Err::<(), _>(anyhow!("connection refused"))
            .context("fixture setup failed")
            .unwrap_err();
        let detail = FailureDetail::from_error(&err);
        assert_eq!(detail.message, "fixture setup failed");
        assert_eq!(
            detail.stack.as_deref(),
            Some("Caused by:\n    connection refused")
        );
    }

    #[test]
    fn passed_outcome_serializes_without_error_field() {
        let outcome = TestOutcome::passed(Uuid::nil(), "adds", 1.5);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "passed");
        assert_eq!(json["durationMs"], 1.5);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn error_kind_is_omitted_on_the_wire() {
        let detail = FailureDetail::new(FailureKind::Error, "boom");
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "boom" }));

        let timeout = serde_json::to_value(FailureDetail::timeout(50)).unwrap();
        assert_eq!(timeout["kind"], "timeout");
        assert_eq!(timeout["message"], "Test timed out after 50ms");
    }

    #[test]
    fn outcome_without_id_gets_a_fresh_one() {
        let outcome: TestOutcome = serde_json::from_str(
            r#"{"description":"x","status":"failed","durationMs":2,"error":{"message":"m","stack":"s"}}"#,
        )
        .unwrap();
        assert_ne!(outcome.id, Uuid::nil());
        let failure = outcome.failure.unwrap();
        assert_eq!(failure.message, "m");
        assert_eq!(failure.stack.as_deref(), Some("s"));
        assert_eq!(failure.kind, FailureKind::Error);
    }
}
