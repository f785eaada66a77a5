use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::ParticipantStatus;

/// One invited doctor's obligation and response within a consultation.
///
/// `reply` is `Some` exactly when `status` is `Replied`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub consultation_id: String,
    pub doctor_id: String,
    pub reply: Option<String>,
    pub status: ParticipantStatus,
    pub replied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Participant {
    #[must_use]
    pub const fn has_replied(&self) -> bool {
        matches!(self.status, ParticipantStatus::Replied)
    }
}
