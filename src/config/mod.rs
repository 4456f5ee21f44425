pub mod parser;

use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;

pub const DEFAULT_GIT_HOST: &str = "github.com";
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_REMOTE_NAME: &str = "updater";
pub const MARKER_FILE_NAME: &str = ".last_commit";
pub const DEFAULT_APP_ENTRY: &str = "app";

/// Settings as they appear in an `updater.yml` file. Every key is optional
/// here; missing keys fall back to the environment.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct RawConfig {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub build: Option<String>,
    #[serde(default)]
    pub git_host: Option<String>,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub remote_name: Option<String>,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub work_dir: Option<String>,
    #[serde(default)]
    pub marker_file: Option<String>,
    #[serde(default)]
    pub app_entry: Option<String>,
    #[serde(default)]
    pub app_runner: Option<String>,
    #[serde(default)]
    pub log_file: Option<String>,
}

/// Environment variable backing each [`RawConfig`] key.
pub const ENV_KEYS: &[(&str, &str)] = &[
    ("owner", "REPO_OWNER"),
    ("repo", "REPO_NAME"),
    ("branch", "BRANCH_NAME"),
    ("build", "BUILD_COMMAND"),
    ("git_host", "GIT_HOST"),
    ("remote_url", "REMOTE_URL"),
    ("remote_name", "REMOTE_NAME"),
    ("api_base_url", "API_BASE_URL"),
    ("work_dir", "WORK_DIR"),
    ("marker_file", "MARKER_FILE"),
    ("app_entry", "APP_ENTRY"),
    ("app_runner", "APP_RUNNER"),
    ("log_file", "UPDATER_LOG"),
];

pub fn env_name(key: &str) -> Option<&'static str> {
    ENV_KEYS.iter().find(|(k, _)| *k == key).map(|(_, env)| *env)
}

/// Validated, immutable configuration for one agent run.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub build_command: String,
    pub git_host: String,
    pub remote_url: Option<String>,
    pub remote_name: String,
    pub api_base_url: String,
    pub work_dir: PathBuf,
    pub marker_file: PathBuf,
    pub app_entry: PathBuf,
    pub app_runner: Option<Vec<String>>,
    pub log_file: PathBuf,
}

impl AgentConfig {
    /// Build the configuration from the process environment only.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        RawConfig::default().resolve(lookup)
    }

    /// `https://<host>/<owner>/<repo>.git` unless overridden.
    pub fn remote_url(&self) -> String {
        match &self.remote_url {
            Some(url) => url.clone(),
            None => format!("https://{}/{}/{}.git", self.git_host, self.owner, self.repo),
        }
    }

    /// `<remote>/<branch>`, the tree checked out on update.
    pub fn tracking_ref(&self) -> String {
        format!("{}/{}", self.remote_name, self.branch)
    }
}

fn default_log_file(work_dir: &std::path::Path) -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".fleet").join("logs").join("updater.log"),
        None => work_dir.join("updater.log"),
    }
}

impl RawConfig {
    /// Fill the gaps from `lookup`, apply defaults and check that the four
    /// required values are present.
    pub fn resolve<F>(self, lookup: F) -> Result<AgentConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |key: &str, value: Option<String>| -> Option<String> {
            value
                .or_else(|| env_name(key).and_then(&lookup))
                .filter(|v| !v.trim().is_empty())
        };

        let owner = pick("owner", self.owner);
        let repo = pick("repo", self.repo);
        let branch = pick("branch", self.branch);
        let build = pick("build", self.build);

        let missing: Vec<&str> = [
            ("REPO_OWNER", owner.is_none()),
            ("REPO_NAME", repo.is_none()),
            ("BRANCH_NAME", branch.is_none()),
            ("BUILD_COMMAND", build.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        let (Some(owner), Some(repo), Some(branch), Some(build_command)) =
            (owner, repo, branch, build)
        else {
            anyhow::bail!(
                "Missing required configuration: {} (set the environment variable or the matching key in the config file)",
                missing.join(", ")
            );
        };

        let work_dir = pick("work_dir", self.work_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let marker_file = pick("marker_file", self.marker_file)
            .map(PathBuf::from)
            .unwrap_or_else(|| work_dir.join(MARKER_FILE_NAME));
        let app_entry = pick("app_entry", self.app_entry)
            .map(PathBuf::from)
            .unwrap_or_else(|| work_dir.join(DEFAULT_APP_ENTRY));
        let log_file = pick("log_file", self.log_file)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_log_file(&work_dir));
        let app_runner = match pick("app_runner", self.app_runner) {
            Some(runner) => {
                let parts = shell_words::split(&runner)?;
                (!parts.is_empty()).then_some(parts)
            }
            None => None,
        };

        Ok(AgentConfig {
            owner,
            repo,
            branch,
            build_command,
            git_host: pick("git_host", self.git_host)
                .unwrap_or_else(|| DEFAULT_GIT_HOST.into()),
            remote_url: pick("remote_url", self.remote_url),
            remote_name: pick("remote_name", self.remote_name)
                .unwrap_or_else(|| DEFAULT_REMOTE_NAME.into()),
            api_base_url: pick("api_base_url", self.api_base_url)
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.into()),
            work_dir,
            marker_file,
            app_entry,
            app_runner,
            log_file,
        })
    }
}
