use std::{path::Path, sync::Arc};

use anyhow::Context;
use chrono::Local;
use tokio::{io::AsyncWriteExt, sync::Mutex};

const RESET: &str = "\x1b[0m";
const BG_BLUE: &str = "\x1b[44m"; // info
const BG_ORANGE: &str = "\x1b[48;5;208m"; // warning
const BG_RED: &str = "\x1b[41m";
const BG_MAGENTA: &str = "\x1b[45m"; // build output
const FG_BOLD_WHITE: &str = "\x1b[97;1m";

/// Append-only, timestamped log shared by every step of a run.
///
/// Lines are always written uncolored to the file. When echo is enabled the
/// same line is mirrored to stderr, with a colored level badge unless
/// `UPDATER_NO_COLOR=1`.
#[derive(Debug, Clone)]
pub struct Logger {
    file: Arc<Mutex<tokio::fs::File>>,
    path: String,
    echo: bool,
    color_enable: bool,
}

impl Logger {
    pub async fn new(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create log directory {parent:?}"))?;
        }
        let file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open log file {path:?}"))?;
        let no_color = std::env::var("UPDATER_NO_COLOR").ok().as_deref() == Some("1");
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            path: path.to_string_lossy().into_owned(),
            echo: false,
            color_enable: !no_color,
        })
    }

    /// Mirror every line to stderr as well as the log file.
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn paint_level(&self, level: &str) -> String {
        if !self.color_enable {
            return level.to_string();
        }
        match level {
            "INFO" => format!("{BG_BLUE}{FG_BOLD_WHITE} {level} {RESET}"),
            "WARNING" => format!("{BG_ORANGE}{FG_BOLD_WHITE} {level} {RESET}"),
            "ERROR" => format!("{BG_RED}{FG_BOLD_WHITE} {level} {RESET}"),
            "BUILD" => format!("{BG_MAGENTA}{FG_BOLD_WHITE} {level} {RESET}"),
            _ => level.to_string(),
        }
    }

    pub async fn log(&self, level: &str, msg: &str) -> anyhow::Result<()> {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let line = format!("[{now}] {level}: {msg}\n");

        let mut f = self.file.lock().await;
        f.write_all(line.as_bytes()).await?;
        f.flush().await?;

        if self.echo {
            eprintln!("[{now}] {}: {msg}", self.paint_level(level));
        }
        Ok(())
    }

    pub async fn info(&self, msg: &str) -> anyhow::Result<()> {
        self.log("INFO", msg).await
    }

    pub async fn warning(&self, msg: &str) -> anyhow::Result<()> {
        self.log("WARNING", msg).await
    }

    pub async fn error(&self, msg: &str) -> anyhow::Result<()> {
        self.log("ERROR", msg).await
    }

    /// One line of build stderr.
    pub async fn build_output(&self, msg: &str) -> anyhow::Result<()> {
        self.log("BUILD", msg).await
    }
}
