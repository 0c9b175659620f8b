//! Risk scores written by the external anomaly-scoring worker.
//!
//! Advisory only: the ledger neither blocks on nor consumes these values.
//! They surface through the flagged-transactions view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Verdict assigned by the scoring model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Safe,
    Suspicious,
    Critical,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Safe => "SAFE",
            Verdict::Suspicious => "SUSPICIOUS",
            Verdict::Critical => "CRITICAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SAFE" => Some(Verdict::Safe),
            "SUSPICIOUS" => Some(Verdict::Suspicious),
            "CRITICAL" => Some(Verdict::Critical),
            _ => None,
        }
    }

    pub fn is_flagged(&self) -> bool {
        matches!(self, Verdict::Suspicious | Verdict::Critical)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One score row, at most one per transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    pub score_id: i64,
    pub transaction_id: i64,
    /// In [0, 1]
    pub risk_score: f64,
    pub verdict: Verdict,
    /// Feature vector the model used, as reported by the worker
    pub features_used: Value,
    pub model_version: String,
    pub scored_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_roundtrip() {
        for verdict in [Verdict::Safe, Verdict::Suspicious, Verdict::Critical] {
            assert_eq!(Verdict::parse(verdict.as_str()), Some(verdict));
        }
        assert_eq!(Verdict::parse("safe"), None);
    }

    #[test]
    fn test_flagged_verdicts() {
        assert!(!Verdict::Safe.is_flagged());
        assert!(Verdict::Suspicious.is_flagged());
        assert!(Verdict::Critical.is_flagged());
    }
}
