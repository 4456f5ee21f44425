use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// YAML file with the agent settings; the environment fills any gaps.
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Override the log file location.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Do not mirror log lines to stderr.
    #[arg(short = 'q', long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Update if the branch moved, rebuild, then launch the application.
    Run,
    /// Report whether an update is available without touching anything.
    Check,
}

impl Cli {
    pub fn selected(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}
