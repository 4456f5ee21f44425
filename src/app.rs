use anyhow::Result;

use crate::{
    cli::{Cli, Commands},
    config::{AgentConfig, parser::load_config},
    core::agent::{Agent, Decision},
    exec::command::ShellToolchain,
    git::{remote::GithubLookup, repo::GitCli},
    logging::Logger,
};

/// Load the configuration from `--config` (merged with the environment) or
/// from the environment alone. Missing required values abort here, before
/// any work is done.
pub fn resolve_config(cli: &Cli) -> Result<AgentConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AgentConfig::from_env()?,
    };
    if let Some(log_file) = &cli.log_file {
        config.log_file = log_file.clone();
    }
    Ok(config)
}

pub async fn handle_command(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;

    let mut logger = Logger::new(&config.log_file).await?;
    if !cli.quiet {
        logger = logger.with_echo();
    }

    let lookup = GithubLookup::from_config(&config)?;
    let vcs = GitCli::new(config.work_dir.clone());
    let toolchain = ShellToolchain::from_config(&config);
    let agent = Agent::new(config, lookup, vcs, toolchain, logger.clone());

    match cli.selected() {
        Commands::Run => {
            let report = agent.run().await;
            logger
                .info(&format!("Run finished: {:?}", report.outcome))
                .await?;
        }
        Commands::Check => {
            let c = agent.config();
            let msg = match agent.decide().await {
                Decision::Unavailable => "remote head unavailable".to_string(),
                Decision::UpToDate => format!("{}/{}@{} is up to date", c.owner, c.repo, c.branch),
                Decision::OutOfDate { local, remote } => format!(
                    "update available: {} -> {remote}",
                    local.as_deref().unwrap_or("<none>")
                ),
            };
            println!("{msg}");
        }
    }
    Ok(())
}
