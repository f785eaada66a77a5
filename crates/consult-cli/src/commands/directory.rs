use std::path::Path;

use anyhow::Context;
use consult_db::repos::directory::{DirectoryImport, ImportSummary};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::DirectoryCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `consult directory`.
pub async fn handle(
    action: &DirectoryCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        DirectoryCommands::Import(args) => {
            let summary = import_file(ctx, &args.file).await?;
            output(&summary, flags.format)
        }
    }
}

async fn import_file(ctx: &AppContext, path: &Path) -> anyhow::Result<ImportSummary> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let import: DirectoryImport = serde_json::from_str(&raw)
        .with_context(|| format!("invalid directory file {}", path.display()))?;
    ctx.service
        .import_directory(&import)
        .await
        .context("directory import failed")
}
