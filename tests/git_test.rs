use std::{collections::HashMap, fs, path::Path};

use anyhow::Result;
use core_lib::{
    config::AgentConfig,
    core::{
        agent::{Agent, RunOutcome},
        marker::CommitMarker,
    },
    exec::command::ShellToolchain,
    git::{
        remote::HeadLookup,
        repo::{GitCli, GitStatus, RemoteRegistration, Vcs},
    },
    logging::Logger,
};
use git2::{Repository, Signature};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

/// Create a repository with one commit on `main` holding `hello.txt`.
fn seed_origin(dir: &Path, content: &str) -> Result<String> {
    let repo = Repository::init(dir)?;
    fs::write(dir.join("hello.txt"), content)?;

    let mut index = repo.index()?;
    index.add_path(Path::new("hello.txt"))?;
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;

    let sig = Signature::now("fleet", "fleet@example.com")?;
    let oid = repo.commit(Some("refs/heads/main"), &sig, &sig, "init", &tree, &[])?;
    Ok(oid.to_string())
}

struct StaticHead(String);

impl HeadLookup for StaticHead {
    async fn fetch_head(&self, _owner: &str, _repo: &str, _branch: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[test]
fn test_classify_remote_registration() {
    let exists = GitStatus {
        code: Some(3),
        stderr: "error: remote updater already exists.".to_string(),
    };
    assert_eq!(
        RemoteRegistration::classify(exists),
        RemoteRegistration::AlreadyExists
    );

    let ok = GitStatus {
        code: Some(0),
        stderr: String::new(),
    };
    assert_eq!(RemoteRegistration::classify(ok), RemoteRegistration::Added);

    let broken = GitStatus {
        code: Some(128),
        stderr: "fatal: not a git repository".to_string(),
    };
    assert_eq!(
        RemoteRegistration::classify(broken.clone()),
        RemoteRegistration::Failed(broken)
    );
}

#[tokio::test]
async fn test_add_remote_is_idempotent() -> Result<()> {
    let origin = tempdir()?;
    seed_origin(origin.path(), "v1")?;
    let work = tempdir()?;
    Repository::init(work.path())?;
    let git = GitCli::new(work.path());
    let url = origin.path().to_string_lossy().into_owned();

    assert_eq!(git.add_remote("updater", &url).await, RemoteRegistration::Added);
    assert_eq!(
        git.add_remote("updater", &url).await,
        RemoteRegistration::AlreadyExists
    );
    Ok(())
}

#[tokio::test]
async fn test_fetch_and_checkout_overwrite_tracked_files() -> Result<()> {
    let origin = tempdir()?;
    seed_origin(origin.path(), "v1")?;
    let work = tempdir()?;
    Repository::init(work.path())?;
    let git = GitCli::new(work.path());
    git.add_remote("updater", &origin.path().to_string_lossy()).await;

    assert!(git.fetch("updater").await?.success());
    assert!(git.checkout("updater/main").await?.success());
    assert_eq!(fs::read_to_string(work.path().join("hello.txt"))?, "v1");

    fs::write(work.path().join("hello.txt"), "local edit")?;
    assert!(git.checkout("updater/main").await?.success());
    assert_eq!(fs::read_to_string(work.path().join("hello.txt"))?, "v1");
    Ok(())
}

#[tokio::test]
async fn test_fetch_unknown_remote_fails() -> Result<()> {
    let work = tempdir()?;
    Repository::init(work.path())?;
    let git = GitCli::new(work.path());

    let status = git.fetch("nope").await?;
    assert!(!status.success());
    assert!(!status.stderr.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_end_to_end_update_against_local_origin() -> Result<()> {
    let origin = tempdir()?;
    let head = seed_origin(origin.path(), "v1")?;
    let work = tempdir()?;
    Repository::init(work.path())?;

    let vars: HashMap<&str, String> = HashMap::from([
        ("REPO_OWNER", "pepedinho".to_string()),
        ("REPO_NAME", "fleet".to_string()),
        ("BRANCH_NAME", "main".to_string()),
        ("BUILD_COMMAND", "cp hello.txt built.txt".to_string()),
        ("REMOTE_URL", origin.path().to_string_lossy().into_owned()),
        ("WORK_DIR", work.path().to_string_lossy().into_owned()),
        (
            "UPDATER_LOG",
            work.path().join("updater.log").to_string_lossy().into_owned(),
        ),
    ]);
    let config = AgentConfig::from_lookup(|k| vars.get(k).cloned())?;
    let marker = CommitMarker::new(config.marker_file.clone());
    let logger = Logger::new(&config.log_file).await?;
    let agent = Agent::new(
        config.clone(),
        StaticHead(head.clone()),
        GitCli::new(work.path()),
        ShellToolchain::from_config(&config),
        logger,
    );

    let report = agent.run().await;

    assert_eq!(
        report.outcome,
        RunOutcome::Updated {
            build_succeeded: true
        }
    );
    assert_eq!(marker.load().await, Some(head));
    assert_eq!(fs::read_to_string(work.path().join("built.txt"))?, "v1");
    // no entry point in this tree
    assert_eq!(report.launched, None);

    let second = agent.run().await;
    assert_eq!(second.outcome, RunOutcome::UpToDate);
    Ok(())
}
