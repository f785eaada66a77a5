use clap::Subcommand;

use super::CallerArgs;

/// Consultation commands.
#[derive(Clone, Debug, Subcommand)]
pub enum ConsultationCommands {
    /// Ask one or more doctors for advice on a patient.
    Create {
        #[command(flatten)]
        caller: CallerArgs,
        #[arg(long)]
        patient: String,
        #[arg(long)]
        message: String,
        /// Invited doctor IDs (repeatable or comma-separated)
        #[arg(long, value_delimiter = ',')]
        invite: Vec<String>,
    },
    /// Consultations you requested.
    Sent {
        #[command(flatten)]
        caller: CallerArgs,
    },
    /// Consultations you were invited to.
    Received {
        #[command(flatten)]
        caller: CallerArgs,
    },
    /// Full detail of one consultation.
    Get {
        id: String,
        #[command(flatten)]
        caller: CallerArgs,
    },
    /// Reply to a consultation you were invited to.
    Reply {
        id: String,
        #[command(flatten)]
        caller: CallerArgs,
        #[arg(long)]
        reply: String,
        /// Patient ID, checked against the consultation
        #[arg(long)]
        patient: Option<String>,
    },
}
