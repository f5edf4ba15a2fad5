//! Verification summary and verdict.

use crate::error::VerifyError;
use chrono::{DateTime, Utc};
use replcheck_core::{ComparisonOutcome, OutcomeStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Overall result of a verification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// Aggregate of every outcome in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of outcomes folded in.
    pub total: u64,
    /// Number of matches.
    pub matched: u64,
    /// Failure counts per status.
    pub failures_by_status: BTreeMap<OutcomeStatus, u64>,
    /// Every failing outcome, in injection order.
    pub failures: Vec<ComparisonOutcome>,
}

impl Summary {
    pub fn from_outcomes(outcomes: &[ComparisonOutcome]) -> Self {
        let mut summary = Summary::default();
        for outcome in outcomes {
            summary.total += 1;
            if outcome.is_failure() {
                *summary.failures_by_status.entry(outcome.status).or_insert(0) += 1;
                summary.failures.push(outcome.clone());
            } else {
                summary.matched += 1;
            }
        }
        summary
    }

    pub fn failed(&self) -> u64 {
        self.failures_by_status.values().sum()
    }

    pub fn count(&self, status: OutcomeStatus) -> u64 {
        match status {
            OutcomeStatus::Match => self.matched,
            other => self.failures_by_status.get(&other).copied().unwrap_or(0),
        }
    }

    /// Failures over total; zero when nothing was verified.
    pub fn loss_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.failed() as f64 / self.total as f64
        }
    }

    pub fn verdict(&self) -> Verdict {
        if self.failed() == 0 {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    /// One-line verdict for logs and terminals.
    pub fn summary_line(&self) -> String {
        match self.verdict() {
            Verdict::Pass => format!(
                "Verification PASSED: {}/{} keys matched",
                self.matched, self.total
            ),
            Verdict::Fail => {
                let breakdown: Vec<String> = self
                    .failures_by_status
                    .iter()
                    .map(|(status, count)| format!("{status}={count}"))
                    .collect();
                format!(
                    "Verification FAILED: {} of {} keys failed, loss rate {:.2}% ({})",
                    self.failed(),
                    self.total,
                    self.loss_rate() * 100.0,
                    breakdown.join(", ")
                )
            }
        }
    }
}

/// JSON report written at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Which suite produced the summary ("rdb-phase", "stream").
    pub suite: String,
    pub generated_at: DateTime<Utc>,
    pub verdict: Verdict,
    pub loss_rate: f64,
    pub summary: Summary,
}

impl RunReport {
    pub fn new(suite: impl Into<String>, summary: Summary) -> Self {
        Self {
            suite: suite.into(),
            generated_at: Utc::now(),
            verdict: summary.verdict(),
            loss_rate: summary.loss_rate(),
            summary,
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<(), VerifyError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| VerifyError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replcheck_core::DataKind;

    fn outcomes(failing: &[(usize, OutcomeStatus)], total: usize) -> Vec<ComparisonOutcome> {
        (0..total)
            .map(|i| {
                let key = format!("k{i}");
                match failing.iter().find(|(idx, _)| *idx == i) {
                    Some((_, status)) => {
                        ComparisonOutcome::new(key, DataKind::Scalar, *status, "boom")
                    }
                    None => ComparisonOutcome::matched(key, DataKind::Scalar, "verified"),
                }
            })
            .collect()
    }

    #[test]
    fn test_all_matched_passes() {
        let summary = Summary::from_outcomes(&outcomes(&[], 20));
        assert_eq!(summary.total, 20);
        assert_eq!(summary.matched, 20);
        assert_eq!(summary.verdict(), Verdict::Pass);
        assert_eq!(summary.loss_rate(), 0.0);
        assert_eq!(summary.summary_line(), "Verification PASSED: 20/20 keys matched");
    }

    #[test]
    fn test_empty_summary_passes_without_dividing() {
        let summary = Summary::from_outcomes(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.loss_rate(), 0.0);
        assert_eq!(summary.verdict(), Verdict::Pass);
    }

    #[test]
    fn test_one_missing_of_twenty() {
        let summary = Summary::from_outcomes(&outcomes(&[(7, OutcomeStatus::Missing)], 20));
        assert_eq!(summary.verdict(), Verdict::Fail);
        assert_eq!(summary.count(OutcomeStatus::Missing), 1);
        assert!((summary.loss_rate() - 0.05).abs() < f64::EPSILON);
        assert_eq!(summary.failures[0].key, "k7");
        assert!(summary.summary_line().contains("loss rate 5.00%"));
    }

    #[test]
    fn test_failures_keep_injection_order() {
        let summary = Summary::from_outcomes(&outcomes(
            &[
                (9, OutcomeStatus::Error),
                (2, OutcomeStatus::ValueMismatch),
                (4, OutcomeStatus::ValueMismatch),
            ],
            10,
        ));
        let keys: Vec<&str> = summary.failures.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["k2", "k4", "k9"]);
        assert_eq!(summary.count(OutcomeStatus::ValueMismatch), 2);
        assert_eq!(summary.failed(), 3);
        assert_eq!(summary.matched, 7);
    }

    #[test]
    fn test_report_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let summary = Summary::from_outcomes(&outcomes(&[(1, OutcomeStatus::TypeMismatch)], 4));
        RunReport::new("rdb-phase", summary).write_json(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["suite"], "rdb-phase");
        assert_eq!(json["verdict"], "fail");
        assert_eq!(json["summary"]["total"], 4);
        assert_eq!(json["summary"]["failures_by_status"]["type_mismatch"], 1);
        assert_eq!(json["summary"]["failures"][0]["key"], "k1");
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("report.json");
        let err = RunReport::new("stream", Summary::default())
            .write_json(&path)
            .unwrap_err();
        assert!(matches!(err, VerifyError::Write { .. }));
    }
}
