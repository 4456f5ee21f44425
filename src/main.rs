use clap::Parser;

use core_lib::{app::handle_command, cli::Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    handle_command(&cli).await
}
