//! Consultation repository: creation with participant fan-out and reply
//! recording with completion aggregation.
//!
//! Both mutations run inside one IMMEDIATE transaction behind the database
//! write gate. The completion flip is a single conditional UPDATE, so when
//! replies race exactly one of them observes the transition.

use consult_core::entities::{Consultation, Participant};
use consult_core::enums::{ConsultationStatus, ParticipantStatus};
use consult_core::errors::ConsultError;
use consult_core::events::ConsultationEvent;
use consult_core::identity::Caller;
use consult_core::ids::{PREFIX_CONSULTATION, PREFIX_PARTICIPANT};
use consult_core::ports::PatientLookupError;
use consult_core::requests::{NewConsultation, ReplyRequest};
use consult_core::responses::{ConsultationRecord, ReplySummary};

use crate::error::DatabaseError;
use crate::generate_id;
use crate::helpers::{
    fmt_timestamp, get_opt_string, now, parse_datetime, parse_enum, parse_optional_datetime,
};
use crate::service::ConsultService;

pub(crate) const CONSULTATION_COLS: &str =
    "id, requester_id, patient_id, message, status, created_at, updated_at";

pub(crate) const PARTICIPANT_COLS: &str =
    "id, consultation_id, doctor_id, reply, status, replied_at, created_at, updated_at";

pub(crate) fn row_to_consultation(row: &libsql::Row) -> Result<Consultation, DatabaseError> {
    Ok(Consultation {
        id: row.get(0)?,
        requester_id: row.get(1)?,
        patient_id: row.get(2)?,
        message: row.get(3)?,
        status: parse_enum(&row.get::<String>(4)?)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
        updated_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

pub(crate) fn row_to_participant(row: &libsql::Row) -> Result<Participant, DatabaseError> {
    Ok(Participant {
        id: row.get(0)?,
        consultation_id: row.get(1)?,
        doctor_id: row.get(2)?,
        reply: get_opt_string(row, 3)?,
        status: parse_enum(&row.get::<String>(4)?)?,
        replied_at: parse_optional_datetime(row.get::<Option<String>>(5)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
        updated_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

/// Flip to complete only while pending and nobody is left without a reply.
const COMPLETE_IF_ALL_REPLIED: &str = "
    UPDATE consultations SET status = 'complete', updated_at = ?2
    WHERE id = ?1
      AND status = 'pending'
      AND NOT EXISTS (
          SELECT 1 FROM consultation_participants
          WHERE consultation_id = ?1 AND status <> 'replied'
      )";

async fn insert_consultation(
    conn: &libsql::Connection,
    requester_id: &str,
    request: &NewConsultation,
) -> Result<ConsultationRecord, DatabaseError> {
    let ts = now();
    let stamp = fmt_timestamp(&ts);
    let id = generate_id(conn, PREFIX_CONSULTATION).await?;

    conn.execute(
        &format!("INSERT INTO consultations ({CONSULTATION_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        libsql::params![
            id.as_str(),
            requester_id,
            request.patient_id.as_str(),
            request.message.as_str(),
            ConsultationStatus::Pending.as_str(),
            stamp.as_str(),
            stamp.as_str()
        ],
    )
    .await?;

    let mut participants = Vec::with_capacity(request.invited_doctor_ids.len());
    for doctor_id in &request.invited_doctor_ids {
        let participant_id = generate_id(conn, PREFIX_PARTICIPANT).await?;
        conn.execute(
            "INSERT INTO consultation_participants
                 (id, consultation_id, doctor_id, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            libsql::params![
                participant_id.as_str(),
                id.as_str(),
                doctor_id.as_str(),
                ParticipantStatus::NotReplied.as_str(),
                stamp.as_str(),
                stamp.as_str()
            ],
        )
        .await?;
        participants.push(Participant {
            id: participant_id,
            consultation_id: id.clone(),
            doctor_id: doctor_id.clone(),
            reply: None,
            status: ParticipantStatus::NotReplied,
            replied_at: None,
            created_at: ts,
            updated_at: ts,
        });
    }

    Ok(ConsultationRecord {
        consultation: Consultation {
            id,
            requester_id: requester_id.to_string(),
            patient_id: request.patient_id.clone(),
            message: request.message.clone(),
            status: ConsultationStatus::Pending,
            created_at: ts,
            updated_at: ts,
        },
        participants,
    })
}

/// What a committed reply changed.
struct RecordedReply {
    consultation: Consultation,
    all_replied: bool,
    completed_now: bool,
}

async fn record_reply(
    conn: &libsql::Connection,
    doctor_id: &str,
    consultation_id: &str,
    request: &ReplyRequest,
) -> Result<RecordedReply, ConsultError> {
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
    let mut consultation = row_to_consultation(&row)?;

    let mut rows = conn
        .query(
            "SELECT id, status FROM consultation_participants
             WHERE consultation_id = ?1 AND doctor_id = ?2",
            [consultation_id, doctor_id],
        )
        .await
        .map_err(DatabaseError::from)?;
    let Some(row) = rows.next().await.map_err(DatabaseError::from)? else {
        return Err(ConsultError::not_found(
            "participant",
            format!("doctor {doctor_id} is not invited to consultation {consultation_id}"),
        ));
    };
    let participant_id: String = row.get(0).map_err(DatabaseError::from)?;
    let previous: ParticipantStatus = parse_enum(&row.get::<String>(1).map_err(DatabaseError::from)?)?;

    if let Some(patient_id) = &request.patient_id {
        if *patient_id != consultation.patient_id {
            return Err(ConsultError::validation(format!(
                "patient {patient_id} does not match consultation {consultation_id}"
            )));
        }
    }

    let ts = now();
    let stamp = fmt_timestamp(&ts);
    conn.execute(
        "UPDATE consultation_participants
         SET reply = ?1, status = ?2, replied_at = ?3, updated_at = ?3
         WHERE id = ?4",
        libsql::params![
            request.reply.as_str(),
            ParticipantStatus::Replied.as_str(),
            stamp.as_str(),
            participant_id.as_str()
        ],
    )
    .await
    .map_err(DatabaseError::from)?;
    conn.execute(
        "UPDATE consultations SET updated_at = ?2 WHERE id = ?1",
        [consultation_id, stamp.as_str()],
    )
    .await
    .map_err(DatabaseError::from)?;

    if !previous.can_transition_to(ParticipantStatus::Replied) {
        tracing::debug!(consultation_id, doctor_id, "reply overwritten");
    }

    let flipped = if consultation
        .status
        .can_transition_to(ConsultationStatus::Complete)
    {
        conn.execute(COMPLETE_IF_ALL_REPLIED, [consultation_id, stamp.as_str()])
            .await
            .map_err(DatabaseError::from)?
    } else {
        0
    };

    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM consultation_participants
             WHERE consultation_id = ?1 AND status <> 'replied'",
            [consultation_id],
        )
        .await
        .map_err(DatabaseError::from)?;
    let outstanding: i64 = rows
        .next()
        .await
        .map_err(DatabaseError::from)?
        .ok_or(DatabaseError::NoResult)?
        .get(0)
        .map_err(DatabaseError::from)?;

    consultation.updated_at = ts;
    if flipped == 1 {
        consultation.status = ConsultationStatus::Complete;
    }

    Ok(RecordedReply {
        consultation,
        all_replied: outstanding == 0,
        completed_now: flipped == 1,
    })
}

impl ConsultService {
    /// Create a consultation and invite every listed doctor.
    ///
    /// Persists the consultation and all participants atomically, then emits
    /// one `ConsultationCreated` event per invitee.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank message, an empty or duplicated invitee list
    /// - `NotFound` for an unknown patient, requester or invitee
    /// - `Unexpected` for storage failures (nothing is persisted)
    pub async fn create_consultation(
        &self,
        caller: &Caller,
        request: &NewConsultation,
    ) -> Result<ConsultationRecord, ConsultError> {
        let request = request.normalized()?;
        let result = self.create_checked(caller, &request).await;
        if let Err(ConsultError::Unexpected(error)) = &result {
            tracing::error!(
                requester_id = %caller.doctor_id,
                patient_id = %request.patient_id,
                error = %error,
                "create consultation failed"
            );
        }
        let record = result?;

        tracing::debug!(
            consultation_id = %record.consultation.id,
            invitees = record.participants.len(),
            "consultation created"
        );

        let events: Vec<_> = record
            .participants
            .iter()
            .map(|p| ConsultationEvent::ConsultationCreated {
                consultation_id: record.consultation.id.clone(),
                requester_id: record.consultation.requester_id.clone(),
                invitee_id: p.doctor_id.clone(),
                patient_id: record.consultation.patient_id.clone(),
            })
            .collect();
        self.notify(&events).await;

        Ok(record)
    }

    async fn create_checked(
        &self,
        caller: &Caller,
        request: &NewConsultation,
    ) -> Result<ConsultationRecord, ConsultError> {
        match self.patients().snapshot(&request.patient_id).await {
            Ok(_) => {}
            Err(PatientLookupError::NotFound(id)) => {
                return Err(ConsultError::not_found("patient", id));
            }
            Err(PatientLookupError::Unavailable(reason)) => {
                return Err(anyhow::anyhow!("patient lookup unavailable: {reason}").into());
            }
        }

        let mut wanted = Vec::with_capacity(request.invited_doctor_ids.len() + 1);
        wanted.push(caller.doctor_id.as_str());
        wanted.extend(request.invited_doctor_ids.iter().map(String::as_str));
        let known = self.get_doctors(&wanted).await?;
        if let Some(missing) = wanted.iter().find(|id| !known.contains_key(**id)) {
            return Err(ConsultError::not_found("doctor", *missing));
        }

        let tx = self.db().begin_write().await?;
        let result = insert_consultation(tx.conn(), &caller.doctor_id, request)
            .await
            .map_err(ConsultError::from);
        tx.finish(result).await
    }

    /// Record the caller's reply and re-evaluate completion.
    ///
    /// A second reply from the same doctor overwrites the first. Emits one
    /// `ConsultationReplied` event to the requester after commit.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank reply or a mismatched patient ID
    /// - `NotFound` when the consultation does not exist or the caller was
    ///   not invited (nothing is mutated)
    /// - `Unexpected` for storage failures
    pub async fn reply_to_consultation(
        &self,
        caller: &Caller,
        consultation_id: &str,
        request: &ReplyRequest,
    ) -> Result<ReplySummary, ConsultError> {
        let request = request.normalized()?;

        let tx = self.db().begin_write().await?;
        let result = record_reply(tx.conn(), &caller.doctor_id, consultation_id, &request).await;
        let result = tx.finish(result).await;
        if let Err(ConsultError::Unexpected(error)) = &result {
            tracing::error!(
                consultation_id,
                doctor_id = %caller.doctor_id,
                error = %error,
                "reply failed"
            );
        }
        let recorded = result?;

        if recorded.completed_now {
            tracing::debug!(consultation_id, "consultation complete");
        }

        self.notify(&[ConsultationEvent::ConsultationReplied {
            consultation_id: consultation_id.to_string(),
            responder_id: caller.doctor_id.clone(),
            requester_id: recorded.consultation.requester_id.clone(),
            patient_id: recorded.consultation.patient_id.clone(),
        }])
        .await;

        Ok(ReplySummary {
            consultation_id: consultation_id.to_string(),
            doctor_id: caller.doctor_id.clone(),
            reply: request.reply,
            all_replied: recorded.all_replied,
            completed_now: recorded.completed_now,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::test_support::helpers::{seed_directory, test_service};

    use super::*;

    #[tokio::test]
    async fn create_persists_pending_with_participants() {
        let (svc, notifier) = test_service().await;
        seed_directory(&svc).await;

        let record = svc
            .create_consultation(
                &Caller::doctor("d1"),
                &NewConsultation::new("p10", "Need advice", ["d2", "d3"]),
            )
            .await
            .unwrap();

        assert!(record.consultation.id.starts_with("con-"));
        assert_eq!(record.consultation.status, ConsultationStatus::Pending);
        assert_eq!(record.participants.len(), 2);
        assert!(record.participants.iter().all(|p| !p.has_replied()));
        assert_eq!(notifier.events().len(), 2);
    }

    #[tokio::test]
    async fn create_rejects_unknown_invitee() {
        let (svc, notifier) = test_service().await;
        seed_directory(&svc).await;

        let err = svc
            .create_consultation(
                &Caller::doctor("d1"),
                &NewConsultation::new("p10", "Need advice", ["d2", "ghost"]),
            )
            .await
            .unwrap_err();

        assert!(matches!(&err, ConsultError::NotFound { entity_type, id } if entity_type == "doctor" && id == "ghost"));
        assert!(svc.sent_consultations(&Caller::doctor("d1")).await.unwrap().is_empty());
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_unknown_patient() {
        let (svc, _) = test_service().await;
        seed_directory(&svc).await;

        let err = svc
            .create_consultation(
                &Caller::doctor("d1"),
                &NewConsultation::new("p404", "Need advice", ["d2"]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ConsultError::NotFound { entity_type, .. } if entity_type == "patient"));
    }

    #[tokio::test]
    async fn reply_with_other_patient_is_rejected() {
        let (svc, _) = test_service().await;
        seed_directory(&svc).await;
        let record = svc
            .create_consultation(
                &Caller::doctor("d1"),
                &NewConsultation::new("p10", "Need advice", ["d2"]),
            )
            .await
            .unwrap();

        let err = svc
            .reply_to_consultation(
                &Caller::doctor("d2"),
                &record.consultation.id,
                &ReplyRequest::new("Try X").with_patient("p11"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ConsultError::Validation(_)));

        let detail = svc
            .consultation_detail(&Caller::doctor("d1"), &record.consultation.id)
            .await
            .unwrap();
        assert!(!detail.all_replied);
    }

    #[tokio::test]
    async fn second_reply_overwrites_first() {
        let (svc, _) = test_service().await;
        seed_directory(&svc).await;
        let record = svc
            .create_consultation(
                &Caller::doctor("d1"),
                &NewConsultation::new("p10", "Need advice", ["d2"]),
            )
            .await
            .unwrap();
        let id = &record.consultation.id;
        let d2 = Caller::doctor("d2");

        let first = svc
            .reply_to_consultation(&d2, id, &ReplyRequest::new("Try X"))
            .await
            .unwrap();
        assert!(first.all_replied);
        assert!(first.completed_now);

        let second = svc
            .reply_to_consultation(&d2, id, &ReplyRequest::new("Actually, try Y"))
            .await
            .unwrap();
        assert!(second.all_replied);
        assert!(!second.completed_now);

        let detail = svc.consultation_detail(&d2, id).await.unwrap();
        assert_eq!(detail.status, ConsultationStatus::Complete);
        assert_eq!(detail.participants[0].reply, "Actually, try Y");
    }

    #[tokio::test]
    async fn reply_to_unknown_consultation_is_not_found() {
        let (svc, _) = test_service().await;
        seed_directory(&svc).await;
        let err = svc
            .reply_to_consultation(&Caller::doctor("d2"), "con-00000000", &ReplyRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConsultError::NotFound { entity_type, .. } if entity_type == "consultation"));
    }
}
