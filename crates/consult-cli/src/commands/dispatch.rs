use std::sync::Arc;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    ctx: Arc<AppContext>,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Serve(args) => commands::serve::handle(&args, ctx).await,
        Commands::Consultation { action } => {
            commands::consultation::handle(&action, &ctx, flags).await
        }
        Commands::Doctor { action } => commands::doctor::handle(&action, &ctx, flags).await,
        Commands::Directory { action } => commands::directory::handle(&action, &ctx, flags).await,
        Commands::Outbox { action } => commands::outbox::handle(&action, &ctx, flags),
    }
}
