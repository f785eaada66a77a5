use crate::cli::GlobalFlags;
use crate::cli::subcommands::OutboxCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `consult outbox`.
pub fn handle(action: &OutboxCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        OutboxCommands::List { doctor } => {
            let records = ctx.outbox()?.read(doctor)?;
            output(&records, flags.format)
        }
    }
}
