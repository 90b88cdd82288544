//! Per-item outcomes and the ordered run report

use serde::{Deserialize, Serialize};
use std::fmt;

/// Final status of one work item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Passed,
    Failed,
    Errored,
    /// Never started because the run was cancelled
    Cancelled,
}

impl OutcomeStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            OutcomeStatus::Passed => "✓",
            OutcomeStatus::Failed => "✗",
            OutcomeStatus::Errored => "!",
            OutcomeStatus::Cancelled => "-",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutcomeStatus::Passed => "PASSED",
            OutcomeStatus::Failed => "FAILED",
            OutcomeStatus::Errored => "ERROR",
            OutcomeStatus::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// What an item's own work reports when it completes normally
///
/// Faults (an `Err` or a panic from the item runner) are not verdicts; the
/// executor turns those into `Errored` outcomes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed(String),
}

/// Result of executing one work item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub item_id: String,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl Outcome {
    pub fn passed(item_id: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            item_id: item_id.into(),
            status: OutcomeStatus::Passed,
            detail: None,
            duration_ms,
        }
    }

    pub fn failed(item_id: impl Into<String>, duration_ms: u64, detail: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            status: OutcomeStatus::Failed,
            detail: Some(detail.into()),
            duration_ms,
        }
    }

    pub fn errored(item_id: impl Into<String>, duration_ms: u64, detail: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            status: OutcomeStatus::Errored,
            detail: Some(detail.into()),
            duration_ms,
        }
    }

    pub fn cancelled(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            status: OutcomeStatus::Cancelled,
            detail: None,
            duration_ms: 0,
        }
    }

    pub fn from_verdict(item_id: impl Into<String>, duration_ms: u64, verdict: Verdict) -> Self {
        match verdict {
            Verdict::Passed => Self::passed(item_id, duration_ms),
            Verdict::Failed(detail) => Self::failed(item_id, duration_ms, detail),
        }
    }

    pub fn is_passed(&self) -> bool {
        self.status == OutcomeStatus::Passed
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({}ms)",
            self.status.symbol(),
            self.status,
            self.item_id,
            self.duration_ms
        )?;
        if let Some(detail) = &self.detail {
            write!(f, " - {detail}")?;
        }
        Ok(())
    }
}

/// Outcomes of one run, in original submission order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    outcomes: Vec<Outcome>,
}

impl RunReport {
    pub(crate) fn from_ordered(outcomes: Vec<Outcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Outcome> {
        self.outcomes.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Outcome> {
        self.outcomes.get(index)
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(Outcome::is_passed)
    }

    pub fn pass_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            (self.count(OutcomeStatus::Passed) as f64 / self.outcomes.len() as f64) * 100.0
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} passed, {} failed, {} errors, {} cancelled ({} total)",
            self.count(OutcomeStatus::Passed),
            self.count(OutcomeStatus::Failed),
            self.count(OutcomeStatus::Errored),
            self.count(OutcomeStatus::Cancelled),
            self.len()
        )
    }
}

impl<'a> IntoIterator for &'a RunReport {
    type Item = &'a Outcome;
    type IntoIter = std::slice::Iter<'a, Outcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> RunReport {
        RunReport::from_ordered(vec![
            Outcome::passed("a", 10),
            Outcome::failed("b", 5, "assertion failed"),
            Outcome::errored("c", 1, "panicked"),
            Outcome::cancelled("d"),
        ])
    }

    #[test]
    fn test_report_counts() {
        let report = sample_report();
        assert_eq!(report.len(), 4);
        assert_eq!(report.count(OutcomeStatus::Passed), 1);
        assert_eq!(report.count(OutcomeStatus::Failed), 1);
        assert_eq!(report.count(OutcomeStatus::Errored), 1);
        assert_eq!(report.count(OutcomeStatus::Cancelled), 1);
        assert!(!report.all_passed());
        assert_eq!(report.pass_rate(), 25.0);
    }

    #[test]
    fn test_empty_report() {
        let report = RunReport::default();
        assert!(report.is_empty());
        assert!(report.all_passed());
        assert_eq!(report.pass_rate(), 0.0);
    }

    #[test]
    fn test_outcome_display() {
        let outcome = Outcome::failed("tests/test_a.py::test_x", 12, "boom");
        assert_eq!(outcome.to_string(), "✗ FAILED tests/test_a.py::test_x (12ms) - boom");
    }

    #[test]
    fn test_report_serializes_status_lowercase() {
        let json = serde_json::to_value(sample_report()).unwrap();
        assert_eq!(json["outcomes"][0]["status"], "passed");
        assert_eq!(json["outcomes"][3]["status"], "cancelled");
    }
}
