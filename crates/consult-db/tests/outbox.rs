//! Coordinator events written through the JSONL outbox.

use std::sync::Arc;

use chrono::Utc;
use consult_core::entities::{Doctor, PatientSnapshot};
use consult_core::events::ConsultationEvent;
use consult_core::identity::Caller;
use consult_core::requests::{NewConsultation, ReplyRequest};
use consult_db::notify::OutboxDispatcher;
use consult_db::service::ConsultService;

fn doctor(id: &str) -> Doctor {
    Doctor {
        id: id.into(),
        name: id.to_uppercase(),
        lname: String::new(),
        email: String::new(),
        phone: String::new(),
        workplace: None,
        verified: false,
    }
}

#[tokio::test]
async fn outbox_receives_created_and_replied_events() {
    let dir = tempfile::tempdir().unwrap();
    let outbox = Arc::new(OutboxDispatcher::new(dir.path().to_path_buf()).unwrap());
    let svc = ConsultService::new_local(":memory:", outbox.clone()).await.unwrap();
    for id in ["d1", "d2"] {
        svc.register_doctor(&doctor(id)).await.unwrap();
    }
    svc.register_patient(&PatientSnapshot {
        id: "p10".into(),
        owner_doctor_id: "d1".into(),
        display_name: "Jane Roe".into(),
        submit_status: false,
        outcome_status: false,
        updated_at: Utc::now(),
    })
    .await
    .unwrap();

    let record = svc
        .create_consultation(&Caller::doctor("d1"), &NewConsultation::new("p10", "Q", ["d2"]))
        .await
        .unwrap();
    svc.reply_to_consultation(&Caller::doctor("d2"), &record.consultation.id, &ReplyRequest::new("A"))
        .await
        .unwrap();

    let to_d2 = outbox.read("d2").unwrap();
    assert_eq!(to_d2.len(), 1);
    assert!(matches!(to_d2[0].event, ConsultationEvent::ConsultationCreated { .. }));

    let to_d1 = outbox.read("d1").unwrap();
    assert_eq!(to_d1.len(), 1);
    assert_eq!(
        to_d1[0].event,
        ConsultationEvent::ConsultationReplied {
            consultation_id: record.consultation.id.clone(),
            responder_id: "d2".into(),
            requester_id: "d1".into(),
            patient_id: "p10".into(),
        }
    );
}
