use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Read-only projection of a patient record, supplied by the patient provider.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PatientSnapshot {
    pub id: String,
    pub owner_doctor_id: String,
    pub display_name: String,
    pub submit_status: bool,
    pub outcome_status: bool,
    pub updated_at: DateTime<Utc>,
}
