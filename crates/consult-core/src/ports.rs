//! Narrow interfaces to the collaborators the coordinator consumes.
//!
//! The coordinator never builds delivery payloads and never reads the
//! clinical record; it talks to these two traits only.

use async_trait::async_trait;
use thiserror::Error;

use crate::entities::PatientSnapshot;
use crate::events::ConsultationEvent;

/// Errors a notification dispatcher may report.
///
/// The coordinator logs these and carries on; they never reach a caller.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors a patient snapshot provider may report.
#[derive(Debug, Error)]
pub enum PatientLookupError {
    #[error("patient not found: {0}")]
    NotFound(String),

    #[error("patient lookup unavailable: {0}")]
    Unavailable(String),
}

/// Receives notify-events from the coordinator and performs delivery.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, event: &ConsultationEvent) -> Result<(), NotifyError>;
}

/// Supplies read-only patient projections keyed by patient ID.
#[async_trait]
pub trait PatientSnapshotProvider: Send + Sync {
    /// Look up one patient.
    ///
    /// # Errors
    ///
    /// Returns `PatientLookupError::NotFound` for unknown IDs.
    async fn snapshot(&self, patient_id: &str) -> Result<PatientSnapshot, PatientLookupError>;

    /// Look up many patients at once. Unknown IDs are omitted from the result.
    ///
    /// The default walks `snapshot` one ID at a time; providers backed by a
    /// queryable store should override it with a single batched read.
    ///
    /// # Errors
    ///
    /// Returns `PatientLookupError::Unavailable` if the backing store fails.
    async fn snapshots(
        &self,
        patient_ids: &[String],
    ) -> Result<Vec<PatientSnapshot>, PatientLookupError> {
        let mut found = Vec::with_capacity(patient_ids.len());
        for id in patient_ids {
            match self.snapshot(id).await {
                Ok(snapshot) => found.push(snapshot),
                Err(PatientLookupError::NotFound(_)) => {}
                Err(other) => return Err(other),
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;

    use super::*;

    struct FixedPatients(HashMap<String, PatientSnapshot>);

    #[async_trait]
    impl PatientSnapshotProvider for FixedPatients {
        async fn snapshot(&self, patient_id: &str) -> Result<PatientSnapshot, PatientLookupError> {
            self.0
                .get(patient_id)
                .cloned()
                .ok_or_else(|| PatientLookupError::NotFound(patient_id.to_string()))
        }
    }

    fn patient(id: &str) -> PatientSnapshot {
        PatientSnapshot {
            id: id.to_string(),
            owner_doctor_id: "doc-1".to_string(),
            display_name: format!("Patient {id}"),
            submit_status: false,
            outcome_status: false,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn default_batch_lookup_skips_unknown_ids() {
        let provider = FixedPatients(HashMap::from([
            ("p1".to_string(), patient("p1")),
            ("p2".to_string(), patient("p2")),
        ]));

        let found = provider
            .snapshots(&["p1".to_string(), "missing".to_string(), "p2".to_string()])
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["p1", "p2"]);
    }
}
