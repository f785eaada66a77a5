//! Request payloads accepted by the coordinator.
//!
//! Field names follow the wire contract (`consult_message`,
//! `consult_doctor_ids`), so the same structs deserialize HTTP bodies.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::ConsultError;

/// Body of a create-consultation request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct NewConsultation {
    pub patient_id: String,
    #[serde(rename = "consult_message")]
    pub message: String,
    #[serde(rename = "consult_doctor_ids")]
    pub invited_doctor_ids: Vec<String>,
}

impl NewConsultation {
    pub fn new(
        patient_id: impl Into<String>,
        message: impl Into<String>,
        invited_doctor_ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            message: message.into(),
            invited_doctor_ids: invited_doctor_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Trim every field and check the creation constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConsultError::Validation` when the patient ID or message is
    /// blank, the invitee list is empty, or an invitee appears twice.
    pub fn normalized(&self) -> Result<Self, ConsultError> {
        let patient_id = self.patient_id.trim();
        if patient_id.is_empty() {
            return Err(ConsultError::validation("patient_id must not be empty"));
        }

        let message = self.message.trim();
        if message.is_empty() {
            return Err(ConsultError::validation("consult_message must not be empty"));
        }

        if self.invited_doctor_ids.is_empty() {
            return Err(ConsultError::validation(
                "consult_doctor_ids must name at least one doctor",
            ));
        }

        let mut seen = HashSet::with_capacity(self.invited_doctor_ids.len());
        let mut invited = Vec::with_capacity(self.invited_doctor_ids.len());
        for raw in &self.invited_doctor_ids {
            let id = raw.trim();
            if id.is_empty() {
                return Err(ConsultError::validation(
                    "consult_doctor_ids must not contain empty IDs",
                ));
            }
            if !seen.insert(id) {
                return Err(ConsultError::validation(format!(
                    "doctor {id} is invited more than once"
                )));
            }
            invited.push(id.to_string());
        }

        Ok(Self {
            patient_id: patient_id.to_string(),
            message: message.to_string(),
            invited_doctor_ids: invited,
        })
    }
}

/// Body of a reply request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReplyRequest {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
}

impl ReplyRequest {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            patient_id: None,
        }
    }

    #[must_use]
    pub fn with_patient(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }

    /// Trim the reply text and check it is present.
    ///
    /// # Errors
    ///
    /// Returns `ConsultError::Validation` for a blank reply.
    pub fn normalized(&self) -> Result<Self, ConsultError> {
        let reply = self.reply.trim();
        if reply.is_empty() {
            return Err(ConsultError::validation("reply must not be empty"));
        }
        Ok(Self {
            reply: reply.to_string(),
            patient_id: self
                .patient_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from),
        })
    }
}
