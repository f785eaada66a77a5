//! Read models: the requester's sent list, the invitee's received list and
//! the consultation detail view.
//!
//! Every view is assembled from batched reads. Consultations come first, then
//! all of their participants in one `IN` query, then one doctor lookup and one
//! patient snapshot lookup covering every referenced ID. The consultation,
//! participant and doctor reads share one snapshot, so a view never mixes
//! states from before and after a concurrent reply.

use std::collections::{BTreeSet, HashMap};

use consult_core::entities::{Consultation, Doctor, Participant, PatientSnapshot};
use consult_core::errors::ConsultError;
use consult_core::identity::Caller;
use consult_core::ports::PatientLookupError;
use consult_core::responses::{
    ConsultationDetail, DoctorCard, InviteeStatus, NO_REPLY_PLACEHOLDER, ParticipantReply,
    PatientView, ReceivedConsultation, SentConsultation,
};

use crate::error::DatabaseError;
use crate::helpers::{placeholders, text_params};
use crate::repos::consultation::{
    CONSULTATION_COLS, PARTICIPANT_COLS, row_to_consultation, row_to_participant,
};
use crate::repos::directory::doctors_by_id;
use crate::service::ConsultService;

const NEWEST_FIRST: &str = "ORDER BY updated_at DESC, created_at DESC, id DESC";

fn card(doctors: &HashMap<String, Doctor>, id: &str) -> DoctorCard {
    doctors
        .get(id)
        .map_or_else(|| DoctorCard::unknown(id), DoctorCard::from)
}

fn patient_error(error: PatientLookupError) -> ConsultError {
    ConsultError::Unexpected(anyhow::Error::new(error))
}

fn log_unexpected<'a>(
    operation: &'static str,
    caller: &'a Caller,
) -> impl Fn(&ConsultError) + 'a {
    move |error| {
        if let ConsultError::Unexpected(error) = error {
            tracing::error!(doctor_id = %caller.doctor_id, %error, "{operation} failed");
        }
    }
}

async fn query_consultations(
    conn: &libsql::Connection,
    filter: &str,
    doctor_id: &str,
) -> Result<Vec<Consultation>, DatabaseError> {
    let sql = format!("SELECT {CONSULTATION_COLS} FROM consultations WHERE {filter} {NEWEST_FIRST}");
    let mut rows = conn.query(&sql, [doctor_id]).await?;
    let mut consultations = Vec::new();
    while let Some(row) = rows.next().await? {
        consultations.push(row_to_consultation(&row)?);
    }
    Ok(consultations)
}

/// Participants of the given consultations, grouped by consultation ID, in
/// invitation order.
async fn participants_of(
    conn: &libsql::Connection,
    consultation_ids: &[&str],
) -> Result<HashMap<String, Vec<Participant>>, DatabaseError> {
    let mut grouped: HashMap<String, Vec<Participant>> = HashMap::new();
    if consultation_ids.is_empty() {
        return Ok(grouped);
    }
    let sql = format!(
        "SELECT {PARTICIPANT_COLS} FROM consultation_participants
         WHERE consultation_id IN ({}) ORDER BY rowid",
        placeholders(1, consultation_ids.len())
    );
    let mut rows = conn
        .query(&sql, libsql::params_from_iter(text_params(consultation_ids)))
        .await?;
    while let Some(row) = rows.next().await? {
        let participant = row_to_participant(&row)?;
        grouped
            .entry(participant.consultation_id.clone())
            .or_default()
            .push(participant);
    }
    Ok(grouped)
}

impl ConsultService {
    async fn patient_names(
        &self,
        consultations: &[Consultation],
    ) -> Result<HashMap<String, String>, ConsultError> {
        let ids: Vec<String> = consultations
            .iter()
            .map(|c| c.patient_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let snapshots = self.patients().snapshots(&ids).await.map_err(patient_error)?;
        Ok(snapshots
            .into_iter()
            .map(|PatientSnapshot { id, display_name, .. }| (id, display_name))
            .collect())
    }

    /// Consultations the caller requested, newest activity first.
    ///
    /// # Errors
    ///
    /// Returns `ConsultError::Unexpected` if storage or the patient provider
    /// fails.
    pub async fn sent_consultations(
        &self,
        caller: &Caller,
    ) -> Result<Vec<SentConsultation>, ConsultError> {
        self.sent_inner(caller)
            .await
            .inspect_err(log_unexpected("sent list", caller))
    }

    async fn sent_inner(&self, caller: &Caller) -> Result<Vec<SentConsultation>, ConsultError> {
        let read = self.db().begin_read().await?;
        let conn = read.conn();
        let consultations = query_consultations(conn, "requester_id = ?1", &caller.doctor_id).await?;
        let ids: Vec<&str> = consultations.iter().map(|c| c.id.as_str()).collect();
        let mut participants = participants_of(conn, &ids).await?;

        let doctor_ids: BTreeSet<&str> = participants
            .values()
            .flatten()
            .map(|p| p.doctor_id.as_str())
            .collect();
        let doctor_ids: Vec<&str> = doctor_ids.into_iter().collect();
        let doctors = doctors_by_id(conn, &doctor_ids).await?;
        drop(read);
        let patient_names = self.patient_names(&consultations).await?;

        Ok(consultations
            .into_iter()
            .map(|c| {
                let invited = participants.remove(&c.id).unwrap_or_default();
                let replied_count = invited.iter().filter(|p| p.has_replied()).count();
                SentConsultation {
                    patient_name: patient_names.get(&c.patient_id).cloned(),
                    invitees: invited
                        .iter()
                        .map(|p| InviteeStatus {
                            doctor: card(&doctors, &p.doctor_id),
                            status: p.status,
                        })
                        .collect(),
                    replied_count: u32::try_from(replied_count).unwrap_or(u32::MAX),
                    id: c.id,
                    patient_id: c.patient_id,
                    message: c.message,
                    status: c.status,
                    created_at: c.created_at,
                    updated_at: c.updated_at,
                }
            })
            .collect())
    }

    /// Consultations the caller was invited to, newest activity first.
    ///
    /// # Errors
    ///
    /// Returns `ConsultError::Unexpected` if storage or the patient provider
    /// fails.
    pub async fn received_consultations(
        &self,
        caller: &Caller,
    ) -> Result<Vec<ReceivedConsultation>, ConsultError> {
        self.received_inner(caller)
            .await
            .inspect_err(log_unexpected("received list", caller))
    }

    async fn received_inner(
        &self,
        caller: &Caller,
    ) -> Result<Vec<ReceivedConsultation>, ConsultError> {
        let read = self.db().begin_read().await?;
        let conn = read.conn();
        let consultations = query_consultations(
            conn,
            "id IN (SELECT consultation_id FROM consultation_participants WHERE doctor_id = ?1)",
            &caller.doctor_id,
        )
        .await?;
        let ids: Vec<&str> = consultations.iter().map(|c| c.id.as_str()).collect();
        let participants = participants_of(conn, &ids).await?;

        let requester_ids: BTreeSet<&str> =
            consultations.iter().map(|c| c.requester_id.as_str()).collect();
        let requester_ids: Vec<&str> = requester_ids.into_iter().collect();
        let doctors = doctors_by_id(conn, &requester_ids).await?;
        drop(read);
        let patient_names = self.patient_names(&consultations).await?;

        let mut received = Vec::with_capacity(consultations.len());
        for c in consultations {
            let mine = participants
                .get(&c.id)
                .and_then(|all| all.iter().find(|p| p.doctor_id == caller.doctor_id))
                .ok_or(DatabaseError::NoResult)?;
            received.push(ReceivedConsultation {
                patient_name: patient_names.get(&c.patient_id).cloned(),
                requester: card(&doctors, &c.requester_id),
                my_status: mine.status,
                my_reply: mine.reply.clone(),
                id: c.id,
                patient_id: c.patient_id,
                message: c.message,
                status: c.status,
                created_at: c.created_at,
                updated_at: c.updated_at,
            });
        }
        Ok(received)
    }

    /// Full detail of one consultation.
    ///
    /// Visible to the requester, the participants, and privileged callers.
    /// Anyone else gets the same `NotFound` as for an unknown ID.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the consultation does not exist or is not visible
    /// - `Unexpected` for storage or patient provider failures
    pub async fn consultation_detail(
        &self,
        caller: &Caller,
        consultation_id: &str,
    ) -> Result<ConsultationDetail, ConsultError> {
        self.detail_inner(caller, consultation_id)
            .await
            .inspect_err(log_unexpected("consultation detail", caller))
    }

    async fn detail_inner(
        &self,
        caller: &Caller,
        consultation_id: &str,
    ) -> Result<ConsultationDetail, ConsultError> {
        let read = self.db().begin_read().await?;
        let conn = read.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {CONSULTATION_COLS} FROM consultations WHERE id = ?1"),
                [consultation_id],
            )
            .await
            .map_err(DatabaseError::from)?;
        let Some(row) = rows.next().await.map_err(DatabaseError::from)? else {
            return Err(ConsultError::not_found("consultation", consultation_id));
        };
        let consultation = row_to_consultation(&row)?;
        let participants = participants_of(conn, &[consultation_id])
            .await?
            .remove(consultation_id)
            .unwrap_or_default();

        let visible = caller.privileged
            || consultation.requester_id == caller.doctor_id
            || participants.iter().any(|p| p.doctor_id == caller.doctor_id);
        if !visible {
            return Err(ConsultError::not_found("consultation", consultation_id));
        }

        let mut doctor_ids = vec![consultation.requester_id.as_str()];
        doctor_ids.extend(participants.iter().map(|p| p.doctor_id.as_str()));
        let doctors = doctors_by_id(conn, &doctor_ids).await?;
        drop(read);

        let patient = match self.patients().snapshot(&consultation.patient_id).await {
            Ok(snapshot) => Some(PatientView::from(snapshot)),
            Err(PatientLookupError::NotFound(patient_id)) => {
                tracing::warn!(consultation_id, %patient_id, "patient snapshot missing");
                None
            }
            Err(other) => return Err(patient_error(other)),
        };

        let all_replied = participants.iter().all(Participant::has_replied);
        Ok(ConsultationDetail {
            requester: card(&doctors, &consultation.requester_id),
            participants: participants
                .into_iter()
                .map(|p| ParticipantReply {
                    doctor: card(&doctors, &p.doctor_id),
                    status: p.status,
                    reply: p.reply.unwrap_or_else(|| NO_REPLY_PLACEHOLDER.to_string()),
                    replied_at: p.replied_at,
                })
                .collect(),
            patient,
            all_replied,
            id: consultation.id,
            message: consultation.message,
            status: consultation.status,
            created_at: consultation.created_at,
            updated_at: consultation.updated_at,
        })
    }
}
