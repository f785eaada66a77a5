//! Doctor directory repository: reference data lookups, score history, and
//! the candidate list the doctor search ranks.
//!
//! Doctors, scores and patients are owned by other subsystems. The write
//! paths here exist so a standalone deployment can be seeded (see
//! [`ConsultService::import_directory`]).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use consult_core::entities::{Doctor, DoctorCandidate, PatientSnapshot};
use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;
use crate::helpers::{fmt_timestamp, get_flag, get_opt_string, now, placeholders, text_params};
use crate::repos::patient::upsert_patient;
use crate::service::ConsultService;

const SELECT_COLS: &str = "id, name, lname, email, phone, workplace, verified";

fn row_to_doctor(row: &libsql::Row) -> Result<Doctor, DatabaseError> {
    Ok(Doctor {
        id: row.get(0)?,
        name: row.get(1)?,
        lname: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        workplace: get_opt_string(row, 5)?,
        verified: get_flag(row, 6)?,
    })
}

/// Latest score per doctor plus the number of patients each owns.
///
/// Ordered by doctor ID so the ranker's stable sort has a fixed base order.
const CANDIDATES_SQL: &str = "
    WITH latest_score AS (
        SELECT doctor_id, score,
               ROW_NUMBER() OVER (PARTITION BY doctor_id ORDER BY recorded_at DESC, id DESC) AS rn
        FROM doctor_scores
    ),
    patient_counts AS (
        SELECT owner_doctor_id, COUNT(*) AS n FROM patients GROUP BY owner_doctor_id
    )
    SELECT d.id, d.name, d.lname, d.email, d.phone, d.workplace, d.verified,
           s.score, COALESCE(pc.n, 0)
    FROM doctors d
    LEFT JOIN latest_score s ON s.doctor_id = d.id AND s.rn = 1
    LEFT JOIN patient_counts pc ON pc.owner_doctor_id = d.id
    ORDER BY d.id ASC";

fn row_to_candidate(row: &libsql::Row) -> Result<DoctorCandidate, DatabaseError> {
    let patient_count: i64 = row.get(8)?;
    Ok(DoctorCandidate {
        doctor: row_to_doctor(row)?,
        score: row.get::<Option<f64>>(7)?,
        patient_count: u32::try_from(patient_count).unwrap_or(u32::MAX),
    })
}

/// One entry of a doctor's score history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreEntry {
    pub doctor_id: String,
    pub score: f64,
    #[serde(default = "crate::helpers::now")]
    pub recorded_at: DateTime<Utc>,
}

/// Reference data bundle accepted by `consult directory import`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DirectoryImport {
    #[serde(default)]
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub scores: Vec<ScoreEntry>,
    #[serde(default)]
    pub patients: Vec<PatientSnapshot>,
}

/// Row counts written by an import.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub doctors: usize,
    pub scores: usize,
    pub patients: usize,
}

async fn upsert_doctor(conn: &libsql::Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO doctors ({SELECT_COLS}, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 lname = excluded.lname,
                 email = excluded.email,
                 phone = excluded.phone,
                 workplace = excluded.workplace,
                 verified = excluded.verified"
        ),
        libsql::params![
            doctor.id.as_str(),
            doctor.name.as_str(),
            doctor.lname.as_str(),
            doctor.email.as_str(),
            doctor.phone.as_str(),
            doctor.workplace.as_deref(),
            i64::from(doctor.verified),
            fmt_timestamp(&now())
        ],
    )
    .await?;
    Ok(())
}

async fn insert_score(conn: &libsql::Connection, entry: &ScoreEntry) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctor_scores (doctor_id, score, recorded_at) VALUES (?1, ?2, ?3)",
        libsql::params![
            entry.doctor_id.as_str(),
            entry.score,
            fmt_timestamp(&entry.recorded_at)
        ],
    )
    .await?;
    Ok(())
}

async fn import_rows(
    conn: &libsql::Connection,
    import: &DirectoryImport,
) -> Result<ImportSummary, DatabaseError> {
    for doctor in &import.doctors {
        upsert_doctor(conn, doctor).await?;
    }
    for entry in &import.scores {
        insert_score(conn, entry).await?;
    }
    for patient in &import.patients {
        upsert_patient(conn, patient).await?;
    }
    Ok(ImportSummary {
        doctors: import.doctors.len(),
        scores: import.scores.len(),
        patients: import.patients.len(),
    })
}

/// Batched doctor lookup on an existing connection.
pub(crate) async fn doctors_by_id<S: AsRef<str>>(
    conn: &libsql::Connection,
    ids: &[S],
) -> Result<HashMap<String, Doctor>, DatabaseError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let sql = format!(
        "SELECT {SELECT_COLS} FROM doctors WHERE id IN ({})",
        placeholders(1, ids.len())
    );
    let mut rows = conn
        .query(&sql, libsql::params_from_iter(text_params(ids)))
        .await?;

    let mut found = HashMap::with_capacity(ids.len());
    while let Some(row) = rows.next().await? {
        let doctor = row_to_doctor(&row)?;
        found.insert(doctor.id.clone(), doctor);
    }
    Ok(found)
}

impl ConsultService {
    /// Insert or update a doctor's directory entry.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the write fails.
    pub async fn register_doctor(&self, doctor: &Doctor) -> Result<(), DatabaseError> {
        let tx = self.db().begin_write().await?;
        let result = upsert_doctor(tx.conn(), doctor).await;
        tx.finish(result).await
    }

    /// Append a score to a doctor's history. The newest entry is the one
    /// search ranks by.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the doctor is unknown or the write fails.
    pub async fn record_doctor_score(
        &self,
        doctor_id: &str,
        score: f64,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let entry = ScoreEntry {
            doctor_id: doctor_id.to_string(),
            score,
            recorded_at,
        };
        let tx = self.db().begin_write().await?;
        let result = insert_score(tx.conn(), &entry).await;
        tx.finish(result).await
    }

    /// Load doctors, then scores, then patients in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if any row is rejected; nothing is imported
    /// in that case.
    pub async fn import_directory(
        &self,
        import: &DirectoryImport,
    ) -> Result<ImportSummary, DatabaseError> {
        let tx = self.db().begin_write().await?;
        let result = import_rows(tx.conn(), import).await;
        let summary = tx.finish(result).await?;
        tracing::debug!(?summary, "directory imported");
        Ok(summary)
    }

    /// Batched doctor lookup. IDs the directory does not know are absent
    /// from the returned map.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_doctors<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<HashMap<String, Doctor>, DatabaseError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let read = self.db().begin_read().await?;
        doctors_by_id(read.conn(), ids).await
    }

    /// Every directory doctor with latest score and patient count, ordered
    /// by doctor ID.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_doctor_candidates(&self) -> Result<Vec<DoctorCandidate>, DatabaseError> {
        let read = self.db().begin_read().await?;
        let mut rows = read.conn().query(CANDIDATES_SQL, ()).await?;
        let mut candidates = Vec::new();
        while let Some(row) = rows.next().await? {
            candidates.push(row_to_candidate(&row)?);
        }
        Ok(candidates)
    }
}
