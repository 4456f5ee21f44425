//! # Update agent
//!
//! One invocation of [`Agent::run`] walks the whole deployment sequence:
//!
//! ```text
//! check remote ─┬─ unavailable / up to date ──────────────────────────────┐
//!               └─ out of date → add remote → fetch → checkout → marker → build → launch
//! ```
//!
//! Every path ends in a launch attempt. Failures along the way are logged
//! and turn into "keep the tree we already have"; `run` itself cannot fail.

use crate::{
    config::AgentConfig,
    core::marker::CommitMarker,
    exec::command::{DetachedProcess, Toolchain},
    git::{
        remote::{HeadLookup, RemoteHead},
        repo::{RemoteRegistration, Vcs},
    },
    logging::Logger,
};

/// Step at which a synchronization was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Fetch,
    Checkout,
    PersistMarker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    HeadUnavailable,
    UpToDate,
    SyncAborted(SyncStage),
    Updated { build_succeeded: bool },
}

/// What happened during a run, and whether the application was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub launched: Option<DetachedProcess>,
}

/// Read-only comparison of the marker with the remote head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Unavailable,
    UpToDate,
    OutOfDate { local: Option<String>, remote: String },
}

pub struct Agent<L, V, T> {
    config: AgentConfig,
    marker: CommitMarker,
    lookup: L,
    vcs: V,
    toolchain: T,
    logger: Logger,
}

impl<L, V, T> Agent<L, V, T>
where
    L: HeadLookup,
    V: Vcs,
    T: Toolchain,
{
    pub fn new(config: AgentConfig, lookup: L, vcs: V, toolchain: T, logger: Logger) -> Self {
        let marker = CommitMarker::new(config.marker_file.clone());
        Self {
            config,
            marker,
            lookup,
            vcs,
            toolchain,
            logger,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Log write failures must not change the run, so they fall back to
    /// stderr.
    async fn note(&self, level: &str, msg: &str) {
        if let Err(e) = self.logger.log(level, msg).await {
            eprintln!("{level}: {msg} (log write failed: {e:#})");
        }
    }

    pub async fn determine_remote_head(&self) -> RemoteHead {
        let c = &self.config;
        match self.lookup.fetch_head(&c.owner, &c.repo, &c.branch).await {
            Ok(sha) => RemoteHead::Found(sha),
            Err(e) => {
                let msg = format!(
                    "Could not determine head of {}/{}@{}: {e:#}",
                    c.owner, c.repo, c.branch
                );
                self.note("WARNING", &msg).await;
                RemoteHead::Unavailable
            }
        }
    }

    pub async fn decide(&self) -> Decision {
        let remote = match self.determine_remote_head().await {
            RemoteHead::Found(sha) => sha,
            RemoteHead::Unavailable => return Decision::Unavailable,
        };
        let local = self.marker.load().await;

        if local.as_deref() == Some(remote.as_str()) {
            Decision::UpToDate
        } else {
            Decision::OutOfDate { local, remote }
        }
    }

    pub async fn run(&self) -> RunReport {
        let outcome = match self.decide().await {
            Decision::Unavailable => {
                self.note("INFO", "Remote head unknown, keeping current build").await;
                RunOutcome::HeadUnavailable
            }
            Decision::UpToDate => {
                self.note("INFO", "Already up to date").await;
                RunOutcome::UpToDate
            }
            Decision::OutOfDate { local, remote } => {
                let msg = format!(
                    "New commit detected: {} -> {remote}",
                    local.as_deref().unwrap_or("<none>")
                );
                self.note("INFO", &msg).await;
                self.synchronize(&remote).await
            }
        };

        let launched = self.launch().await;
        RunReport { outcome, launched }
    }

    async fn synchronize(&self, remote_head: &str) -> RunOutcome {
        let remote = &self.config.remote_name;
        self.ensure_remote().await;

        let fetch_failure = match self.vcs.fetch(remote).await {
            Ok(status) if status.success() => None,
            Ok(status) => Some(format!(
                "git fetch {remote} failed (exit code {:?}): {}",
                status.code, status.stderr
            )),
            Err(e) => Some(format!("git fetch {remote} failed: {e:#}")),
        };
        if let Some(msg) = fetch_failure {
            self.note("ERROR", &msg).await;
            return RunOutcome::SyncAborted(SyncStage::Fetch);
        }

        let tracking = self.config.tracking_ref();
        let checkout_failure = match self.vcs.checkout(&tracking).await {
            Ok(status) if status.success() => None,
            Ok(status) => Some(format!(
                "git checkout {tracking} exited with code {:?}: {}",
                status.code, status.stderr
            )),
            Err(e) => Some(format!("git checkout {tracking} failed: {e:#}")),
        };
        if let Some(msg) = checkout_failure {
            self.note("ERROR", &msg).await;
            return RunOutcome::SyncAborted(SyncStage::Checkout);
        }

        // records the head seen before the fetch, not a re-read after checkout
        if let Err(e) = self.marker.save(remote_head).await {
            self.note("ERROR", &format!("{e:#}")).await;
            return RunOutcome::SyncAborted(SyncStage::PersistMarker);
        }
        self.note("INFO", &format!("Checked out {tracking} at {remote_head}")).await;

        let build_succeeded = self.build().await;
        RunOutcome::Updated { build_succeeded }
    }

    async fn ensure_remote(&self) {
        let name = &self.config.remote_name;
        let url = self.config.remote_url();
        match self.vcs.add_remote(name, &url).await {
            RemoteRegistration::Added => {
                self.note("INFO", &format!("Added remote {name} -> {url}")).await;
            }
            RemoteRegistration::AlreadyExists => {
                let msg = format!("Remote {name} already exists, reusing it");
                self.note("WARNING", &msg).await;
            }
            RemoteRegistration::Failed(status) => {
                let msg = format!(
                    "git remote add {name} failed (exit code {:?}): {}",
                    status.code, status.stderr
                );
                self.note("WARNING", &msg).await;
            }
        }
    }

    async fn build(&self) -> bool {
        let msg = format!("Running build: {}", self.config.build_command);
        self.note("INFO", &msg).await;

        match self.toolchain.build(&self.logger).await {
            Ok(status) if status.success() => {
                self.note("INFO", "Build finished").await;
                true
            }
            Ok(status) => {
                let msg = format!(
                    "Build failed with exit code {:?}, previous build stays in place",
                    status.code
                );
                self.note("WARNING", &msg).await;
                false
            }
            Err(e) => {
                let msg = format!("Build failed: {e:#}, previous build stays in place");
                self.note("WARNING", &msg).await;
                false
            }
        }
    }

    async fn launch(&self) -> Option<DetachedProcess> {
        match self.toolchain.launch(&self.logger).await {
            Ok(Some(process)) => {
                let msg = format!("Application launched (pid {:?})", process.pid);
                self.note("INFO", &msg).await;
                Some(process)
            }
            Ok(None) => {
                let msg = format!(
                    "Entry point {:?} not found, nothing to launch",
                    self.config.app_entry
                );
                self.note("WARNING", &msg).await;
                None
            }
            Err(e) => {
                let msg = format!("Failed to launch application: {e:#}");
                self.note("ERROR", &msg).await;
                None
            }
        }
    }
}
