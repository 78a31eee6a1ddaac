//! Append-only recorder contracts for the persistence collaborator.

use crate::error::StoreError;

/// Records the event of a variant being assigned to a visitor.
///
/// Append-only and best-effort: callers log failures and carry on, so an
/// unavailable backend never blocks assignment.
pub trait ImpressionRecorder: Send + Sync {
    fn record_impression(&self, survey_name: &str, language: &str) -> Result<(), StoreError>;
}

/// Persists a completed survey submission.
///
/// Append-only; returns the generated row id. Unlike impressions, failure
/// here is a hard error: the submission is not considered saved.
pub trait ResultRecorder: Send + Sync {
    fn save_result(
        &self,
        survey_name: &str,
        language: &str,
        payload: &serde_json::Value,
    ) -> Result<i64, StoreError>;
}
