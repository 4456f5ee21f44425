use std::{fs, path::PathBuf};

use clap::Parser;
use core_lib::{
    app::resolve_config,
    cli::{Cli, Commands},
};
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

#[test]
fn test_run_is_the_default_command() {
    let cli = Cli::parse_from(["fleet-updater"]);
    assert_eq!(cli.selected(), Commands::Run);
    assert!(!cli.quiet);
}

#[test]
fn test_check_command_and_flags() {
    let cli = Cli::parse_from([
        "fleet-updater",
        "--config",
        "updater.yml",
        "--log-file",
        "/tmp/updater.log",
        "-q",
        "check",
    ]);
    assert_eq!(cli.selected(), Commands::Check);
    assert_eq!(cli.config, Some(PathBuf::from("updater.yml")));
    assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/updater.log")));
    assert!(cli.quiet);
}

#[test]
fn test_unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["fleet-updater", "deploy"]).is_err());
}

#[test]
fn test_resolve_config_applies_log_override() -> anyhow::Result<()> {
    let file = NamedTempFile::new()?;
    fs::write(
        file.path(),
        "owner: pepedinho\nrepo: fleet\nbranch: main\nbuild: make\n",
    )?;
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        log_file: Some(PathBuf::from("/tmp/override.log")),
        quiet: true,
        command: None,
    };

    let config = resolve_config(&cli)?;

    assert_eq!(config.owner, "pepedinho");
    assert_eq!(config.log_file, PathBuf::from("/tmp/override.log"));
    Ok(())
}
