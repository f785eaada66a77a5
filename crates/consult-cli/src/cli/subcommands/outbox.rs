use clap::Subcommand;

/// Notification outbox commands.
#[derive(Clone, Debug, Subcommand)]
pub enum OutboxCommands {
    /// Events queued for one doctor, oldest first.
    List {
        #[arg(long)]
        doctor: String,
    },
}
