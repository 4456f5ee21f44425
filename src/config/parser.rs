use std::{fs, path::Path};

use anyhow::{Context, Result};

use crate::config::{AgentConfig, RawConfig, env_name};

/// Load `updater.yml`, resolve `$VAR` references and merge with the
/// environment.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    load_config_with(path, |name| std::env::var(name).ok())
}

pub fn load_config_with<F>(path: &Path, lookup: F) -> Result<AgentConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let content =
        fs::read_to_string(path).with_context(|| format!("Error reading config file {path:?}"))?;

    let raw: RawConfig = if content.trim().is_empty() {
        RawConfig::default()
    } else {
        serde_yaml::from_str(&content).with_context(|| "Error parsing YAML configuration file")?
    };

    resolve_env_references(raw, &lookup)?.resolve(lookup)
}

/// Replace every `$NAME` value with the variable it names. A bare `$` uses the
/// key's own variable (e.g. `REPO_OWNER` for `owner`).
pub fn resolve_env_references<F>(mut raw: RawConfig, lookup: &F) -> Result<RawConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let fields: [(&str, &mut Option<String>); 13] = [
        ("owner", &mut raw.owner),
        ("repo", &mut raw.repo),
        ("branch", &mut raw.branch),
        ("build", &mut raw.build),
        ("git_host", &mut raw.git_host),
        ("remote_url", &mut raw.remote_url),
        ("remote_name", &mut raw.remote_name),
        ("api_base_url", &mut raw.api_base_url),
        ("work_dir", &mut raw.work_dir),
        ("marker_file", &mut raw.marker_file),
        ("app_entry", &mut raw.app_entry),
        ("app_runner", &mut raw.app_runner),
        ("log_file", &mut raw.log_file),
    ];

    for (key, value) in fields {
        let Some(v) = value.as_deref() else {
            continue;
        };
        let Some(reference) = v.strip_prefix('$') else {
            continue;
        };
        *value = Some(extract_env_value(reference, key, lookup)?);
    }

    Ok(raw)
}

fn extract_env_value<F>(env_key: &str, field: &str, lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let name = if env_key.is_empty() {
        env_name(field).unwrap_or(field)
    } else {
        env_key
    };

    lookup(name).ok_or_else(|| {
        anyhow::anyhow!(r#"Environment variable "${name}" referenced by `{field}` is not set"#)
    })
}
