//! Read models returned by the coordinator and the doctor search.
//!
//! These structs define the JSON shapes of the HTTP surface and of the
//! `consult` CLI output. Doctor and patient fields are denormalized display
//! values resolved in batched lookups before assembly.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{Consultation, Doctor, DoctorCandidate, Participant, PatientSnapshot};
use crate::enums::{ConsultationStatus, ParticipantStatus};

/// Shown in place of a reply that has not arrived yet.
pub const NO_REPLY_PLACEHOLDER: &str = "No reply yet";

/// A consultation with its full participant set, as returned by create.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ConsultationRecord {
    #[serde(flatten)]
    pub consultation: Consultation,
    pub participants: Vec<Participant>,
}

impl ConsultationRecord {
    #[must_use]
    pub fn all_replied(&self) -> bool {
        self.participants.iter().all(Participant::has_replied)
    }
}

/// Result of a reply call.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReplySummary {
    pub consultation_id: String,
    pub doctor_id: String,
    pub reply: String,
    pub all_replied: bool,
    /// Whether this reply was the one that flipped the consultation to complete.
    #[serde(skip)]
    pub completed_now: bool,
}

/// Display fields for a doctor.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DoctorCard {
    pub id: String,
    pub name: String,
    pub lname: String,
    pub workplace: Option<String>,
    pub verified: bool,
}

impl DoctorCard {
    /// Card for a doctor ID the directory no longer knows.
    #[must_use]
    pub fn unknown(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            lname: String::new(),
            workplace: None,
            verified: false,
        }
    }
}

impl From<&Doctor> for DoctorCard {
    fn from(doctor: &Doctor) -> Self {
        Self {
            id: doctor.id.clone(),
            name: doctor.name.clone(),
            lname: doctor.lname.clone(),
            workplace: doctor.workplace.clone(),
            verified: doctor.verified,
        }
    }
}

/// One invitee as seen by the requester in the sent list.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct InviteeStatus {
    pub doctor: DoctorCard,
    pub status: ParticipantStatus,
}

/// Requester-side summary (`GET /consultations/sent`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SentConsultation {
    pub id: String,
    pub patient_id: String,
    pub patient_name: Option<String>,
    pub message: String,
    pub status: ConsultationStatus,
    pub invitees: Vec<InviteeStatus>,
    pub replied_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Invitee-side summary (`GET /consultations/received`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReceivedConsultation {
    pub id: String,
    pub patient_id: String,
    pub patient_name: Option<String>,
    pub message: String,
    pub status: ConsultationStatus,
    pub requester: DoctorCard,
    pub my_status: ParticipantStatus,
    pub my_reply: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Patient fields shown next to a consultation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PatientView {
    pub id: String,
    pub name: String,
    pub submit_status: bool,
    pub outcome_status: bool,
}

impl From<PatientSnapshot> for PatientView {
    fn from(snapshot: PatientSnapshot) -> Self {
        Self {
            id: snapshot.id,
            name: snapshot.display_name,
            submit_status: snapshot.submit_status,
            outcome_status: snapshot.outcome_status,
        }
    }
}

/// A participant's reply, or the placeholder when none has arrived.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ParticipantReply {
    pub doctor: DoctorCard,
    pub status: ParticipantStatus,
    pub reply: String,
    pub replied_at: Option<DateTime<Utc>>,
}

/// Full detail view (`GET /consultations/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ConsultationDetail {
    pub id: String,
    pub message: String,
    pub status: ConsultationStatus,
    pub requester: DoctorCard,
    pub patient: Option<PatientView>,
    pub participants: Vec<ParticipantReply>,
    pub all_replied: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One ranked search hit (`GET /consultations/search/{query}`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DoctorSearchHit {
    pub id: String,
    pub name: String,
    pub lname: String,
    pub email: String,
    pub phone: String,
    pub workplace: Option<String>,
    pub verified: bool,
    pub score: f64,
    pub patient_count: String,
}

impl From<DoctorCandidate> for DoctorSearchHit {
    fn from(candidate: DoctorCandidate) -> Self {
        let score = candidate.effective_score();
        let Doctor {
            id,
            name,
            lname,
            email,
            phone,
            workplace,
            verified,
        } = candidate.doctor;
        Self {
            id,
            name,
            lname,
            email,
            phone,
            workplace,
            verified,
            score,
            patient_count: candidate.patient_count.to_string(),
        }
    }
}
