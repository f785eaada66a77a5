//! End-to-end coordinator behaviour against an in-memory database.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use consult_core::entities::{Doctor, PatientSnapshot};
use consult_core::enums::{ConsultationStatus, ParticipantStatus};
use consult_core::errors::ConsultError;
use consult_core::events::ConsultationEvent;
use consult_core::identity::Caller;
use consult_core::ports::{NotificationDispatcher, NotifyError, PatientLookupError, PatientSnapshotProvider};
use consult_core::requests::{NewConsultation, ReplyRequest};
use consult_core::responses::NO_REPLY_PLACEHOLDER;
use consult_db::ConsultDb;
use consult_db::error::DatabaseError;
use consult_db::notify::MemoryDispatcher;
use consult_db::service::ConsultService;
use pretty_assertions::assert_eq;

fn doctor(id: &str, name: &str) -> Doctor {
    Doctor {
        id: id.into(),
        name: name.into(),
        lname: "Doe".into(),
        email: format!("{id}@clinic.test"),
        phone: String::new(),
        workplace: Some("General".into()),
        verified: true,
    }
}

fn patient(id: &str) -> PatientSnapshot {
    PatientSnapshot {
        id: id.into(),
        owner_doctor_id: "d1".into(),
        display_name: "Jane Roe".into(),
        submit_status: true,
        outcome_status: false,
        updated_at: Utc::now(),
    }
}

async fn seeded(notifier: Arc<dyn NotificationDispatcher>) -> ConsultService {
    let svc = ConsultService::new_local(consult_db::IN_MEMORY, notifier).await.unwrap();
    for (id, name) in [("d1", "Ali"), ("d2", "Sara"), ("d3", "Omar"), ("d5", "Nina")] {
        svc.register_doctor(&doctor(id, name)).await.unwrap();
    }
    svc.register_patient(&patient("p10")).await.unwrap();
    svc
}

async fn service() -> (ConsultService, Arc<MemoryDispatcher>) {
    let notifier = Arc::new(MemoryDispatcher::new());
    (seeded(notifier.clone()).await, notifier)
}

struct FailingDispatcher;

#[async_trait]
impl NotificationDispatcher for FailingDispatcher {
    async fn dispatch(&self, _event: &ConsultationEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("push gateway down".into()))
    }
}

#[tokio::test]
async fn fan_out_creates_one_participant_and_event_per_invitee() {
    let (svc, notifier) = service().await;

    let record = svc
        .create_consultation(
            &Caller::doctor("d1"),
            &NewConsultation::new("p10", "Second opinion?", ["d2", "d3", "d5"]),
        )
        .await
        .unwrap();

    let invited: Vec<_> = record.participants.iter().map(|p| p.doctor_id.as_str()).collect();
    assert_eq!(invited, ["d2", "d3", "d5"]);
    assert!(record.participants.iter().all(|p| p.status == ParticipantStatus::NotReplied));

    let events = notifier.events();
    assert_eq!(events.len(), 3);
    for (event, invitee) in events.iter().zip(["d2", "d3", "d5"]) {
        assert_eq!(
            *event,
            ConsultationEvent::ConsultationCreated {
                consultation_id: record.consultation.id.clone(),
                requester_id: "d1".into(),
                invitee_id: invitee.into(),
                patient_id: "p10".into(),
            }
        );
    }
}

#[tokio::test]
async fn two_invitee_scenario_completes_on_last_reply() {
    let (svc, notifier) = service().await;
    let d1 = Caller::doctor("d1");

    let record = svc
        .create_consultation(&d1, &NewConsultation::new("p10", "Need advice", ["d2", "d3"]))
        .await
        .unwrap();
    let id = record.consultation.id.clone();
    notifier.clear();

    let first = svc
        .reply_to_consultation(&Caller::doctor("d2"), &id, &ReplyRequest::new("Try X"))
        .await
        .unwrap();
    assert!(!first.all_replied);
    let detail = svc.consultation_detail(&d1, &id).await.unwrap();
    assert_eq!(detail.status, ConsultationStatus::Pending);
    assert_eq!(detail.participants[0].reply, "Try X");
    assert_eq!(detail.participants[1].reply, NO_REPLY_PLACEHOLDER);

    let second = svc
        .reply_to_consultation(&Caller::doctor("d3"), &id, &ReplyRequest::new("Agree"))
        .await
        .unwrap();
    assert!(second.all_replied);

    let detail = svc.consultation_detail(&d1, &id).await.unwrap();
    assert_eq!(detail.status, ConsultationStatus::Complete);
    assert!(detail.all_replied);
    assert_eq!(detail.requester.name, "Ali");
    assert_eq!(detail.patient.unwrap().name, "Jane Roe");

    let to_requester = notifier.events_for("d1");
    assert_eq!(to_requester.len(), 2);
    assert!(to_requester.iter().all(|e| e.kind() == "consultation_replied"));
}

#[tokio::test]
async fn concurrent_replies_complete_exactly_once() {
    let (svc, _) = service().await;
    let record = svc
        .create_consultation(
            &Caller::doctor("d1"),
            &NewConsultation::new("p10", "Urgent", ["d2", "d3", "d5"]),
        )
        .await
        .unwrap();
    let id = record.consultation.id;

    let callers = ["d2", "d3", "d5"].map(Caller::doctor);
    let reply = ReplyRequest::new("ok");
    let replies = callers
        .iter()
        .map(|caller| svc.reply_to_consultation(caller, &id, &reply));
    let summaries: Vec<_> = futures::future::join_all(replies)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(summaries.iter().filter(|s| s.completed_now).count(), 1);
    assert_eq!(summaries.iter().filter(|s| s.all_replied).count(), 1);

    let detail = svc.consultation_detail(&Caller::doctor("d1"), &id).await.unwrap();
    assert_eq!(detail.status, ConsultationStatus::Complete);
}

#[tokio::test]
async fn detail_never_shows_an_open_write() {
    let (svc, _) = service().await;
    let d1 = Caller::doctor("d1");
    let record = svc
        .create_consultation(&d1, &NewConsultation::new("p10", "Need advice", ["d2", "d3"]))
        .await
        .unwrap();
    let id = record.consultation.id;

    let tx = svc.db().begin_write().await.unwrap();
    tx.conn()
        .execute(
            "UPDATE consultation_participants SET reply = 'x', status = 'replied'
             WHERE consultation_id = ?1",
            [id.as_str()],
        )
        .await
        .unwrap();

    let during = svc.consultation_detail(&d1, &id).await.unwrap();
    assert!(!during.all_replied);
    assert_eq!(during.status, ConsultationStatus::Pending);
    assert!(during.participants.iter().all(|p| p.reply == NO_REPLY_PLACEHOLDER));
    let sent = svc.sent_consultations(&d1).await.unwrap();
    assert_eq!(sent[0].replied_count, 0);

    let failed: Result<(), DatabaseError> = Err(DatabaseError::NoResult);
    assert!(tx.finish(failed).await.is_err());

    let after = svc.consultation_detail(&d1, &id).await.unwrap();
    assert!(!after.all_replied);
    assert_eq!(after.status, ConsultationStatus::Pending);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_racing_replies_see_completion_with_all_replies() {
    let (svc, _) = service().await;
    let svc = Arc::new(svc);
    let record = svc
        .create_consultation(
            &Caller::doctor("d1"),
            &NewConsultation::new("p10", "Urgent", ["d2", "d3", "d5"]),
        )
        .await
        .unwrap();
    let id = record.consultation.id;

    let readers: Vec<_> = ["d1", "d2", "d3"]
        .into_iter()
        .map(|viewer| {
            let svc = Arc::clone(&svc);
            let id = id.clone();
            tokio::spawn(async move {
                let caller = Caller::doctor(viewer);
                let mut observed = 0_u32;
                loop {
                    let detail = svc.consultation_detail(&caller, &id).await.unwrap();
                    observed += 1;
                    assert_eq!(
                        detail.status == ConsultationStatus::Complete,
                        detail.all_replied,
                        "status {} with all_replied={}",
                        detail.status,
                        detail.all_replied
                    );
                    if detail.status == ConsultationStatus::Complete {
                        return observed;
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    let writers: Vec<_> = ["d2", "d3", "d5"]
        .into_iter()
        .map(|responder| {
            let svc = Arc::clone(&svc);
            let id = id.clone();
            tokio::spawn(async move {
                svc.reply_to_consultation(&Caller::doctor(responder), &id, &ReplyRequest::new("ok"))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut summaries = Vec::new();
    for writer in writers {
        summaries.push(writer.await.unwrap());
    }
    for reader in readers {
        assert!(reader.await.unwrap() >= 1);
    }

    assert_eq!(summaries.iter().filter(|s| s.completed_now).count(), 1);
    assert!(summaries.iter().any(|s| s.all_replied));
}

#[tokio::test]
async fn reply_from_non_invitee_changes_nothing() {
    let (svc, notifier) = service().await;
    let record = svc
        .create_consultation(&Caller::doctor("d1"), &NewConsultation::new("p10", "Q", ["d2"]))
        .await
        .unwrap();
    let id = record.consultation.id;
    notifier.clear();

    let err = svc
        .reply_to_consultation(&Caller::doctor("d3"), &id, &ReplyRequest::new("Me too"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConsultError::NotFound { .. }));

    let detail = svc.consultation_detail(&Caller::doctor("d1"), &id).await.unwrap();
    assert_eq!(detail.participants.len(), 1);
    assert_eq!(detail.participants[0].status, ParticipantStatus::NotReplied);
    assert_eq!(detail.updated_at, record.consultation.updated_at);
    assert!(notifier.events().is_empty());
}

#[tokio::test]
async fn empty_invitee_list_persists_nothing() {
    let (svc, notifier) = service().await;
    let d1 = Caller::doctor("d1");

    let err = svc
        .create_consultation(&d1, &NewConsultation::new("p10", "Q", Vec::<String>::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, ConsultError::Validation(_)));
    assert!(svc.sent_consultations(&d1).await.unwrap().is_empty());
    assert!(notifier.events().is_empty());
}

#[tokio::test]
async fn detail_of_unknown_id_is_not_found() {
    let (svc, _) = service().await;
    let err = svc
        .consultation_detail(&Caller::privileged("d1"), "con-ffffffff")
        .await
        .unwrap_err();
    assert!(matches!(err, ConsultError::NotFound { entity_type, id } if entity_type == "consultation" && id == "con-ffffffff"));
}

#[tokio::test]
async fn dispatch_failures_do_not_fail_requests() {
    let svc = seeded(Arc::new(FailingDispatcher)).await;

    let record = svc
        .create_consultation(&Caller::doctor("d1"), &NewConsultation::new("p10", "Q", ["d2"]))
        .await
        .unwrap();
    let summary = svc
        .reply_to_consultation(&Caller::doctor("d2"), &record.consultation.id, &ReplyRequest::new("A"))
        .await
        .unwrap();
    assert!(summary.all_replied);
}

/// Knows p10 at creation time and forgets it afterwards.
struct ForgetfulPatients {
    remembered: PatientSnapshot,
    forgotten: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl PatientSnapshotProvider for ForgetfulPatients {
    async fn snapshot(&self, patient_id: &str) -> Result<PatientSnapshot, PatientLookupError> {
        if self.forgotten.load(std::sync::atomic::Ordering::SeqCst) || patient_id != self.remembered.id {
            return Err(PatientLookupError::NotFound(patient_id.to_string()));
        }
        Ok(self.remembered.clone())
    }
}

#[tokio::test]
async fn missing_patient_degrades_detail_instead_of_failing() {
    let db = Arc::new(ConsultDb::open_local(consult_db::IN_MEMORY).await.unwrap());
    let patients = Arc::new(ForgetfulPatients {
        remembered: patient("p10"),
        forgotten: std::sync::atomic::AtomicBool::new(false),
    });
    let svc = ConsultService::from_parts(db, Arc::new(MemoryDispatcher::new()), patients.clone());
    svc.register_doctor(&doctor("d1", "Ali")).await.unwrap();
    svc.register_doctor(&doctor("d2", "Sara")).await.unwrap();

    let record = svc
        .create_consultation(&Caller::doctor("d1"), &NewConsultation::new("p10", "Q", ["d2"]))
        .await
        .unwrap();
    patients.forgotten.store(true, std::sync::atomic::Ordering::SeqCst);

    let detail = svc
        .consultation_detail(&Caller::doctor("d2"), &record.consultation.id)
        .await
        .unwrap();
    assert!(detail.patient.is_none());

    let sent = svc.sent_consultations(&Caller::doctor("d1")).await.unwrap();
    assert_eq!(sent[0].patient_name, None);
}

#[tokio::test]
async fn list_ordering_follows_latest_activity() {
    let (svc, _) = service().await;
    let d1 = Caller::doctor("d1");
    let a = svc
        .create_consultation(&d1, &NewConsultation::new("p10", "A", ["d2"]))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let b = svc
        .create_consultation(&d1, &NewConsultation::new("p10", "B", ["d2"]))
        .await
        .unwrap();

    let received = svc.received_consultations(&Caller::doctor("d2")).await.unwrap();
    let ids: Vec<_> = received.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, [b.consultation.id.clone(), a.consultation.id.clone()]);

    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    svc.reply_to_consultation(&Caller::doctor("d2"), &a.consultation.id, &ReplyRequest::new("x"))
        .await
        .unwrap();
    let received = svc.received_consultations(&Caller::doctor("d2")).await.unwrap();
    assert_eq!(received[0].id, a.consultation.id);
}
