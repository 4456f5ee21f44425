use std::{fs::OpenOptions, path::PathBuf, process::Stdio};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
};

use crate::{config::AgentConfig, logging::Logger};

/// Exit status of the build command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStatus {
    pub code: Option<i32>,
}

impl BuildStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Handle on a process the agent started and then let go of. Only the pid
/// is kept; nothing waits on or supervises the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetachedProcess {
    pub pid: Option<u32>,
}

/// Build and run side of the deployment.
#[allow(async_fn_in_trait)]
pub trait Toolchain {
    /// Run the build to completion, forwarding its stderr to `logger`.
    async fn build(&self, logger: &Logger) -> Result<BuildStatus>;

    /// Start the application without waiting for it. `Ok(None)` means the
    /// entry point does not exist.
    async fn launch(&self, logger: &Logger) -> Result<Option<DetachedProcess>>;
}

#[derive(Debug, Clone)]
pub struct ShellToolchain {
    pub work_dir: PathBuf,
    pub build_command: String,
    pub app_entry: PathBuf,
    pub app_runner: Option<Vec<String>>,
}

impl ShellToolchain {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            work_dir: config.work_dir.clone(),
            build_command: config.build_command.clone(),
            app_entry: config.app_entry.clone(),
            app_runner: config.app_runner.clone(),
        }
    }
}

impl Toolchain for ShellToolchain {
    async fn build(&self, logger: &Logger) -> Result<BuildStatus> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.build_command)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn build command `{}`", self.build_command))?;

        // drain until EOF or the child blocks on a full pipe; stderr is not
        // guaranteed to be UTF-8
        if let Some(stderr) = child.stderr.take() {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            let mut forward = true;
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) if forward => {
                        let line = String::from_utf8_lossy(&buf);
                        let line = line.trim_end_matches(['\n', '\r']);
                        if let Err(e) = logger.build_output(line).await {
                            eprintln!("build output no longer logged: {e:#}");
                            forward = false;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        eprintln!("failed to read build stderr: {e}");
                        break;
                    }
                }
            }
        }

        let status = child.wait().await?;
        Ok(BuildStatus {
            code: status.code(),
        })
    }

    async fn launch(&self, logger: &Logger) -> Result<Option<DetachedProcess>> {
        if !tokio::fs::try_exists(&self.app_entry).await.unwrap_or(false) {
            return Ok(None);
        }
        let entry = tokio::fs::canonicalize(&self.app_entry).await?;

        let mut cmd = match self.app_runner.as_deref() {
            Some([program, args @ ..]) => {
                let mut cmd = Command::new(program);
                cmd.args(args).arg(&entry);
                cmd
            }
            _ => Command::new(&entry),
        };

        let stdout_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(logger.path())?;
        let stderr_file = stdout_file.try_clone()?;

        let child = cmd
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file))
            .stderr(Stdio::from(stderr_file))
            .kill_on_drop(false)
            .spawn()
            .with_context(|| format!("Failed to launch {entry:?}"))?;

        Ok(Some(DetachedProcess { pid: child.id() }))
    }
}
