use consult_search::search_doctors;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::DoctorCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `consult doctor`.
pub async fn handle(
    action: &DoctorCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        DoctorCommands::Search { query, caller } => {
            let hits = search_doctors(&ctx.service, query, &caller.caller()).await?;
            output(&hits, flags.format)
        }
    }
}
