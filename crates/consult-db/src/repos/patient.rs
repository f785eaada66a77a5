//! Patient snapshot repository and the bundled `PatientSnapshotProvider`.

use std::sync::Arc;

use async_trait::async_trait;
use consult_core::entities::PatientSnapshot;
use consult_core::ports::{PatientLookupError, PatientSnapshotProvider};

use crate::ConsultDb;
use crate::error::DatabaseError;
use crate::helpers::{fmt_timestamp, get_flag, parse_datetime, placeholders, text_params};
use crate::service::ConsultService;

const SELECT_COLS: &str =
    "id, owner_doctor_id, display_name, submit_status, outcome_status, updated_at";

fn row_to_patient(row: &libsql::Row) -> Result<PatientSnapshot, DatabaseError> {
    Ok(PatientSnapshot {
        id: row.get(0)?,
        owner_doctor_id: row.get(1)?,
        display_name: row.get(2)?,
        submit_status: get_flag(row, 3)?,
        outcome_status: get_flag(row, 4)?,
        updated_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

pub(crate) async fn upsert_patient(
    conn: &libsql::Connection,
    patient: &PatientSnapshot,
) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO patients ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                 owner_doctor_id = excluded.owner_doctor_id,
                 display_name = excluded.display_name,
                 submit_status = excluded.submit_status,
                 outcome_status = excluded.outcome_status,
                 updated_at = excluded.updated_at"
        ),
        libsql::params![
            patient.id.as_str(),
            patient.owner_doctor_id.as_str(),
            patient.display_name.as_str(),
            i64::from(patient.submit_status),
            i64::from(patient.outcome_status),
            fmt_timestamp(&patient.updated_at)
        ],
    )
    .await?;
    Ok(())
}

impl ConsultService {
    /// Insert or update a patient snapshot row.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the write fails.
    pub async fn register_patient(&self, patient: &PatientSnapshot) -> Result<(), DatabaseError> {
        let tx = self.db().begin_write().await?;
        let result = upsert_patient(tx.conn(), patient).await;
        tx.finish(result).await
    }
}

/// Reads patient snapshots from the local `patients` table.
pub struct DbPatientProvider {
    db: Arc<ConsultDb>,
}

impl DbPatientProvider {
    #[must_use]
    pub const fn new(db: Arc<ConsultDb>) -> Self {
        Self { db }
    }
}

fn unavailable(error: &DatabaseError) -> PatientLookupError {
    PatientLookupError::Unavailable(error.to_string())
}

#[async_trait]
impl PatientSnapshotProvider for DbPatientProvider {
    async fn snapshot(&self, patient_id: &str) -> Result<PatientSnapshot, PatientLookupError> {
        let read = self.db.begin_read().await.map_err(|e| unavailable(&e))?;
        let mut rows = read
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM patients WHERE id = ?1"),
                [patient_id],
            )
            .await
            .map_err(|e| unavailable(&e.into()))?;
        let row = rows
            .next()
            .await
            .map_err(|e| unavailable(&e.into()))?
            .ok_or_else(|| PatientLookupError::NotFound(patient_id.to_string()))?;
        row_to_patient(&row).map_err(|e| unavailable(&e))
    }

    async fn snapshots(
        &self,
        patient_ids: &[String],
    ) -> Result<Vec<PatientSnapshot>, PatientLookupError> {
        if patient_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {SELECT_COLS} FROM patients WHERE id IN ({})",
            placeholders(1, patient_ids.len())
        );
        let read = self.db.begin_read().await.map_err(|e| unavailable(&e))?;
        let mut rows = read
            .conn()
            .query(&sql, libsql::params_from_iter(text_params(patient_ids)))
            .await
            .map_err(|e| unavailable(&e.into()))?;

        let mut found = Vec::with_capacity(patient_ids.len());
        while let Some(row) = rows.next().await.map_err(|e| unavailable(&e.into()))? {
            found.push(row_to_patient(&row).map_err(|e| unavailable(&e))?);
        }
        Ok(found)
    }
}
