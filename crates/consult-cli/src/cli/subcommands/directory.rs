use clap::Subcommand;

use crate::cli::root_commands::ImportArgs;

/// Reference data commands.
#[derive(Clone, Debug, Subcommand)]
pub enum DirectoryCommands {
    /// Load doctors, score history and patients from a JSON file.
    Import(ImportArgs),
}
