use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::process::Command;

/// Exit status of one git invocation. The code is the only signal the agent
/// acts on; stderr is kept for log lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GitStatus {
    pub code: Option<i32>,
    pub stderr: String,
}

impl GitStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Result of registering the tracking remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRegistration {
    Added,
    AlreadyExists,
    Failed(GitStatus),
}

/// `git remote add` exits with 3 when the name is taken.
const REMOTE_EXISTS_CODE: i32 = 3;

impl RemoteRegistration {
    pub fn classify(status: GitStatus) -> Self {
        if status.success() {
            RemoteRegistration::Added
        } else if status.code == Some(REMOTE_EXISTS_CODE)
            || status.stderr.contains("already exists")
        {
            RemoteRegistration::AlreadyExists
        } else {
            RemoteRegistration::Failed(status)
        }
    }
}

/// The version-control operations the agent needs.
#[allow(async_fn_in_trait)]
pub trait Vcs {
    async fn add_remote(&self, name: &str, url: &str) -> RemoteRegistration;
    async fn fetch(&self, remote: &str) -> Result<GitStatus>;
    /// Overwrite the tracked files of the working tree with `tree_ish`.
    async fn checkout(&self, tree_ish: &str) -> Result<GitStatus>;
}

/// [`Vcs`] backed by the `git` executable, run inside the working tree.
#[derive(Debug, Clone)]
pub struct GitCli {
    work_dir: PathBuf,
    program: String,
}

impl GitCli {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            program: "git".to_string(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<GitStatus> {
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .await
            .with_context(|| format!("Failed to run `{} {}`", self.program, args.join(" ")))?;

        Ok(GitStatus {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl Vcs for GitCli {
    async fn add_remote(&self, name: &str, url: &str) -> RemoteRegistration {
        match self.run(&["remote", "add", name, url]).await {
            Ok(status) => RemoteRegistration::classify(status),
            Err(e) => RemoteRegistration::Failed(GitStatus {
                code: None,
                stderr: format!("{e:#}"),
            }),
        }
    }

    async fn fetch(&self, remote: &str) -> Result<GitStatus> {
        self.run(&["fetch", remote]).await
    }

    async fn checkout(&self, tree_ish: &str) -> Result<GitStatus> {
        self.run(&["checkout", tree_ish, "--", "."]).await
    }
}
