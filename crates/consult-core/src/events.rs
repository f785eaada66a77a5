//! Notification events emitted by the coordinator.
//!
//! Events carry identities only. Rendering copy and resolving delivery
//! tokens is the dispatcher's job.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsultationEvent {
    /// Sent to each invitee when a consultation is created.
    ConsultationCreated {
        consultation_id: String,
        requester_id: String,
        invitee_id: String,
        patient_id: String,
    },
    /// Sent to the requester whenever a participant replies.
    ConsultationReplied {
        consultation_id: String,
        responder_id: String,
        requester_id: String,
        patient_id: String,
    },
}

impl ConsultationEvent {
    /// Doctor the event should be delivered to.
    #[must_use]
    pub fn recipient_id(&self) -> &str {
        match self {
            Self::ConsultationCreated { invitee_id, .. } => invitee_id,
            Self::ConsultationReplied { requester_id, .. } => requester_id,
        }
    }

    #[must_use]
    pub fn consultation_id(&self) -> &str {
        match self {
            Self::ConsultationCreated {
                consultation_id, ..
            }
            | Self::ConsultationReplied {
                consultation_id, ..
            } => consultation_id,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ConsultationCreated { .. } => "consultation_created",
            Self::ConsultationReplied { .. } => "consultation_replied",
        }
    }
}
