use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::result::{RunSummary, TestOutcome};
use super::status::TestStatus;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to encode report: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed report payload: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Outcomes of one group, in case declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "GroupReportPayload")]
pub struct GroupReport {
    pub id: Uuid,
    pub description: String,
    pub outcomes: Vec<TestOutcome>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    total_duration_ms: f64,
    average_duration_ms: f64,
}

/// Decoding shape of a group report. Derived timing fields are recomputed
/// rather than trusted.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupReportPayload {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    description: String,
    #[serde(default)]
    outcomes: Vec<TestOutcome>,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
}

impl From<GroupReportPayload> for GroupReport {
    fn from(payload: GroupReportPayload) -> Self {
        let mut report = GroupReport {
            id: payload.id,
            description: payload.description,
            outcomes: payload.outcomes,
            started_at: payload.started_at,
            ended_at: payload.ended_at,
            total_duration_ms: 0.0,
            average_duration_ms: 0.0,
        };
        report.compute_timing();
        report
    }
}

impl GroupReport {
    /// Open a report for a group that is about to run.
    pub fn start(id: Uuid, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            description: description.into(),
            outcomes: Vec::new(),
            started_at: now,
            ended_at: now,
            total_duration_ms: 0.0,
            average_duration_ms: 0.0,
        }
    }

    pub fn record(&mut self, outcome: TestOutcome) {
        self.outcomes.push(outcome);
    }

    /// Stamp the end time and derive the timing statistics.
    pub fn seal(mut self) -> Self {
        self.ended_at = Utc::now();
        self.compute_timing();
        self
    }

    fn compute_timing(&mut self) {
        self.total_duration_ms = self.outcomes.iter().map(|o| o.duration_ms).sum();
        self.average_duration_ms = if self.outcomes.is_empty() {
            0.0
        } else {
            self.total_duration_ms / self.outcomes.len() as f64
        };
    }

    pub fn total_duration_ms(&self) -> f64 {
        self.total_duration_ms
    }

    /// Zero for a group without cases.
    pub fn average_duration_ms(&self) -> f64 {
        self.average_duration_ms
    }

    pub fn count(&self, status: TestStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        serde_json::to_string(self).map_err(ReportError::Encode)
    }

    pub fn from_json(raw: &str) -> Result<Self, ReportError> {
        serde_json::from_str(raw).map_err(ReportError::Malformed)
    }
}

/// Result of one engine invocation across all selected groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub group_reports: Vec<GroupReport>,
    pub total_duration_ms: f64,
}

impl RunReport {
    pub fn new(group_reports: Vec<GroupReport>, total_duration_ms: f64) -> Self {
        Self {
            group_reports,
            total_duration_ms,
        }
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &TestOutcome> {
        self.group_reports.iter().flat_map(|g| g.outcomes.iter())
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            duration_ms: self.total_duration_ms,
            ..RunSummary::default()
        };
        for outcome in self.outcomes() {
            summary.total += 1;
            match outcome.status {
                TestStatus::Passed => summary.passed += 1,
                TestStatus::Failed => summary.failed += 1,
                TestStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes().any(|o| o.status == TestStatus::Failed)
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        serde_json::to_string(self).map_err(ReportError::Encode)
    }

    pub fn to_json_pretty(&self) -> Result<String, ReportError> {
        serde_json::to_string_pretty(self).map_err(ReportError::Encode)
    }

    pub fn from_json(raw: &str) -> Result<Self, ReportError> {
        serde_json::from_str(raw).map_err(ReportError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailureDetail, FailureKind};
    use pretty_assertions::assert_eq;

    fn outcome(status: TestStatus, duration_ms: f64) -> TestOutcome {
        match status {
            TestStatus::Passed => TestOutcome::passed(Uuid::new_v4(), "case", duration_ms),
            TestStatus::Failed => TestOutcome::failed(
                Uuid::new_v4(),
                "case",
                duration_ms,
                FailureDetail::new(FailureKind::Error, "nope"),
            ),
            TestStatus::Skipped => TestOutcome::skipped(Uuid::new_v4(), "case"),
        }
    }

    #[test]
    fn empty_group_has_zero_average() {
        let report = GroupReport::start(Uuid::new_v4(), "empty").seal();
        assert_eq!(report.total_duration_ms(), 0.0);
        assert_eq!(report.average_duration_ms(), 0.0);
        assert!(!report.average_duration_ms().is_nan());
    }

    #[test]
    fn average_is_sum_over_count() {
        let mut report = GroupReport::start(Uuid::new_v4(), "timing");
        report.record(outcome(TestStatus::Passed, 2.0));
        report.record(outcome(TestStatus::Failed, 4.0));
        report.record(outcome(TestStatus::Passed, 9.0));
        let report = report.seal();
        assert_eq!(report.total_duration_ms(), 15.0);
        assert_eq!(report.average_duration_ms(), 5.0);
        assert!(report.ended_at >= report.started_at);
    }

    #[test]
    fn derived_fields_are_recomputed_on_decode() {
        let raw = r#"{
            "description": "math",
            "outcomes": [
                {"description": "a", "status": "passed", "durationMs": 1.0},
                {"description": "b", "status": "passed", "durationMs": 3.0}
            ],
            "startedAt": "2024-01-01T00:00:00Z",
            "endedAt": "2024-01-01T00:00:01Z",
            "totalDurationMs": 999,
            "averageDurationMs": 999
        }"#;
        let report = GroupReport::from_json(raw).unwrap();
        assert_eq!(report.total_duration_ms(), 4.0);
        assert_eq!(report.average_duration_ms(), 2.0);
    }

    #[test]
    fn summary_counts_every_status() {
        let mut group = GroupReport::start(Uuid::new_v4(), "g");
        group.record(outcome(TestStatus::Passed, 1.0));
        group.record(outcome(TestStatus::Failed, 1.0));
        group.record(outcome(TestStatus::Skipped, 0.0));
        let run = RunReport::new(vec![group.seal()], 3.5);

        let summary = run.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.duration_ms, 3.5);
        assert!(run.has_failures());
    }

    #[test]
    fn malformed_payload_is_rejected() {
        assert!(matches!(
            RunReport::from_json("{\"groupReports\": ["),
            Err(ReportError::Malformed(_))
        ));
        assert!(matches!(
            RunReport::from_json("not json at all"),
            Err(ReportError::Malformed(_))
        ));
    }

    #[test]
    fn wire_format_uses_camel_case_fields() {
        let mut group = GroupReport::start(Uuid::new_v4(), "wire");
        group.record(outcome(TestStatus::Passed, 1.0));
        let run = RunReport::new(vec![group.seal()], 1.0);
        let json: serde_json::Value = serde_json::from_str(&run.to_json().unwrap()).unwrap();

        assert!(json["totalDurationMs"].is_number());
        let group = &json["groupReports"][0];
        assert_eq!(group["description"], "wire");
        assert!(group["startedAt"].is_string());
        assert!(group["endedAt"].is_string());
        assert_eq!(group["outcomes"][0]["status"], "passed");
    }
}
