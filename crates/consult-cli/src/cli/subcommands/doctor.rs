use clap::Subcommand;

use super::CallerArgs;

/// Doctor directory commands.
#[derive(Clone, Debug, Subcommand)]
pub enum DoctorCommands {
    /// Rank candidate consult doctors by keywords.
    Search {
        /// Space-separated keywords; any keyword may match
        query: String,
        #[command(flatten)]
        caller: CallerArgs,
    },
}
