mod consultation;
mod directory;
mod doctor;
mod outbox;

use clap::Args;
use consult_core::identity::Caller;

pub use consultation::ConsultationCommands;
pub use directory::DirectoryCommands;
pub use doctor::DoctorCommands;
pub use outbox::OutboxCommands;

/// Identity the command runs as.
#[derive(Clone, Debug, Args)]
pub struct CallerArgs {
    /// Doctor ID of the caller
    #[arg(long = "as", value_name = "DOCTOR_ID")]
    pub doctor: String,

    /// Run with the privileged capability
    #[arg(long)]
    pub privileged: bool,
}

impl CallerArgs {
    #[must_use]
    pub fn caller(&self) -> Caller {
        Caller {
            doctor_id: self.doctor.clone(),
            privileged: self.privileged,
        }
    }
}
