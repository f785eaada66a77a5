use consult_core::requests::{NewConsultation, ReplyRequest};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ConsultationCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `consult consultation`.
pub async fn handle(
    action: &ConsultationCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let svc = &ctx.service;
    match action {
        ConsultationCommands::Create {
            caller,
            patient,
            message,
            invite,
        } => {
            let request = NewConsultation::new(patient.as_str(), message.as_str(), invite);
            let record = svc.create_consultation(&caller.caller(), &request).await?;
            output(&record, flags.format)
        }
        ConsultationCommands::Sent { caller } => {
            let sent = svc.sent_consultations(&caller.caller()).await?;
            output(&sent, flags.format)
        }
        ConsultationCommands::Received { caller } => {
            let received = svc.received_consultations(&caller.caller()).await?;
            output(&received, flags.format)
        }
        ConsultationCommands::Get { id, caller } => {
            let detail = svc.consultation_detail(&caller.caller(), id).await?;
            output(&detail, flags.format)
        }
        ConsultationCommands::Reply {
            id,
            caller,
            reply,
            patient,
        } => {
            let mut request = ReplyRequest::new(reply.as_str());
            if let Some(patient) = patient {
                request = request.with_patient(patient.as_str());
            }
            let summary = svc
                .reply_to_consultation(&caller.caller(), id, &request)
                .await?;
            output(&summary, flags.format)
        }
    }
}
