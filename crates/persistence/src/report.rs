//! Per-turn persistence report
//!
//! Persistence runs after the reply is produced, so a failed write never
//! fails the turn. Failures are collected here, logged and counted, and
//! returned to the caller alongside the reply.

use serde::Serialize;

use crate::PersistenceError;

/// Counter of failed writes, labelled by operation
pub const PERSISTENCE_FAILURES_METRIC: &str = "lead_assistant_persistence_failures_total";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceFailure {
    /// `save_conversation`, `load_conversation`, `save_lead`, `load_settings`
    pub operation: String,
    pub error: String,
    /// True when a concurrent writer won the version race
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub conflict: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceReport {
    pub failures: Vec<PersistenceFailure>,
}

impl PersistenceReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, operation: &str, conversation_id: &str, error: &PersistenceError) {
        tracing::error!(
            operation,
            conversation_id,
            error = %error,
            "Persistence failed, reply still delivered"
        );
        metrics::counter!(PERSISTENCE_FAILURES_METRIC, "operation" => operation.to_string())
            .increment(1);

        self.failures.push(PersistenceFailure {
            operation: operation.to_string(),
            error: error.to_string(),
            conflict: error.is_conflict(),
        });
    }

    pub fn merge(&mut self, other: PersistenceReport) {
        self.failures.extend(other.failures);
    }

    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_marks_conflicts() {
        let mut report = PersistenceReport::new();
        assert!(!report.is_degraded());

        report.record(
            "save_conversation",
            "c1",
            &PersistenceError::Conflict {
                id: "c1".to_string(),
                expected: 2,
            },
        );
        report.record("save_lead", "c1", &PersistenceError::Query("timeout".to_string()));

        assert!(report.is_degraded());
        assert!(report.failures[0].conflict);
        assert!(!report.failures[1].conflict);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failures"][0]["conflict"], true);
        assert!(json["failures"][1].get("conflict").is_none());
        assert_eq!(json["failures"][1]["operation"], "save_lead");
    }
}
