use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{config::AgentConfig, core::marker::is_valid_length};

/// Head of the tracked branch as reported by the lookup service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteHead {
    Found(String),
    Unavailable,
}

/// Answers "what is the latest commit on this branch?". Any error means the
/// head is unknown for this run.
#[allow(async_fn_in_trait)]
pub trait HeadLookup {
    async fn fetch_head(&self, owner: &str, repo: &str, branch: &str) -> Result<String>;
}

#[derive(Deserialize, Debug)]
struct BranchInfo {
    commit: BranchCommit,
}

#[derive(Deserialize, Debug)]
struct BranchCommit {
    sha: String,
}

/// Branch-info lookup against a GitHub-compatible REST API
/// (`GET <base>/repos/<owner>/<repo>/branches/<branch>`).
#[derive(Debug, Clone)]
pub struct GithubLookup {
    client: Client,
    base_url: String,
}

impl GithubLookup {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("fleet-updater/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        Self::new(&config.api_base_url)
    }

    pub fn branch_url(&self, owner: &str, repo: &str, branch: &str) -> String {
        format!("{}/repos/{owner}/{repo}/branches/{branch}", self.base_url)
    }
}

impl HeadLookup for GithubLookup {
    async fn fetch_head(&self, owner: &str, repo: &str, branch: &str) -> Result<String> {
        let url = self.branch_url(owner, repo, branch);
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        if resp.status() != StatusCode::OK {
            anyhow::bail!("Branch lookup returned {}", resp.status());
        }

        let info: BranchInfo = resp
            .json()
            .await
            .context("Branch lookup returned an unexpected body")?;
        let sha = info.commit.sha;
        if !is_valid_length(&sha) {
            anyhow::bail!("Branch lookup returned a malformed sha `{sha}`");
        }
        Ok(sha)
    }
}
