//! Service layer orchestrating consultation mutations with notification
//! dispatch.
//!
//! `ConsultService` wraps `ConsultDb` (raw database access), a
//! `NotificationDispatcher` and a `PatientSnapshotProvider`. All repo methods
//! are implemented as `impl ConsultService` blocks under [`crate::repos`].

use std::sync::Arc;

use consult_core::events::ConsultationEvent;
use consult_core::ports::{NotificationDispatcher, PatientSnapshotProvider};

use crate::ConsultDb;
use crate::error::DatabaseError;
use crate::repos::patient::DbPatientProvider;

/// The consultation coordinator.
///
/// Every mutation follows this protocol:
/// 1. Validate and normalize input
/// 2. Resolve reference data (patient, doctors) with batched reads
/// 3. Take the write gate and open an IMMEDIATE transaction
/// 4. Execute SQL, re-evaluating completion inside the transaction
/// 5. Commit (or roll back on any error)
/// 6. Dispatch notification events, logging and swallowing failures
pub struct ConsultService {
    db: Arc<ConsultDb>,
    notifier: Arc<dyn NotificationDispatcher>,
    patients: Arc<dyn PatientSnapshotProvider>,
}

impl ConsultService {
    /// Open a local database and read patients from its `patients` table.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(
        db_path: &str,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Result<Self, DatabaseError> {
        let db = Arc::new(ConsultDb::open_local(db_path).await?);
        Ok(Self::from_db(db, notifier))
    }

    /// Wrap an open database, reading patients from the same database.
    #[must_use]
    pub fn from_db(db: Arc<ConsultDb>, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        let patients = Arc::new(DbPatientProvider::new(Arc::clone(&db)));
        Self {
            db,
            notifier,
            patients,
        }
    }

    /// Build from explicit collaborators.
    #[must_use]
    pub fn from_parts(
        db: Arc<ConsultDb>,
        notifier: Arc<dyn NotificationDispatcher>,
        patients: Arc<dyn PatientSnapshotProvider>,
    ) -> Self {
        Self {
            db,
            notifier,
            patients,
        }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub fn db(&self) -> &ConsultDb {
        &self.db
    }

    /// Access the patient snapshot provider.
    #[must_use]
    pub fn patients(&self) -> &dyn PatientSnapshotProvider {
        self.patients.as_ref()
    }

    /// Hand events to the dispatcher. Failures are logged, never returned.
    pub(crate) async fn notify(&self, events: &[ConsultationEvent]) {
        for event in events {
            match self.notifier.dispatch(event).await {
                Ok(()) => tracing::debug!(
                    kind = event.kind(),
                    consultation_id = event.consultation_id(),
                    recipient = event.recipient_id(),
                    "notification dispatched"
                ),
                Err(error) => tracing::warn!(
                    kind = event.kind(),
                    consultation_id = event.consultation_id(),
                    recipient = event.recipient_id(),
                    %error,
                    "notification dispatch failed"
                ),
            }
        }
    }
}
