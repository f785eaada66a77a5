use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::cli::subcommands::{ConsultationCommands, DirectoryCommands, DoctorCommands, OutboxCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Serve the HTTP API.
    Serve(ServeArgs),
    /// Consultations: create, list, read, reply.
    Consultation {
        #[command(subcommand)]
        action: ConsultationCommands,
    },
    /// Doctor search.
    Doctor {
        #[command(subcommand)]
        action: DoctorCommands,
    },
    /// Doctor and patient reference data.
    Directory {
        #[command(subcommand)]
        action: DirectoryCommands,
    },
    /// Notification outbox.
    Outbox {
        #[command(subcommand)]
        action: OutboxCommands,
    },
}

#[derive(Clone, Debug, Args)]
pub struct ServeArgs {
    /// Listen address (overrides `server.bind` from config)
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct ImportArgs {
    /// JSON file with `doctors`, `scores` and `patients` arrays
    pub file: PathBuf,
}
