use crate::tools::fetch::strategy::{AttemptContext, FetchStrategy, StrategyError};
use crate::tools::fetch::types::Target;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

const BROWSER_BINARIES: [&str; 5] = [
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Renders the page in a local headless Chrome/Chromium and returns the DOM.
///
/// Unavailable when no browser binary is on `PATH`. The browser process is
/// killed if the attempt is dropped before it exits.
#[derive(Debug, Clone, Default)]
pub struct HeadlessChrome {
    binary: Option<PathBuf>,
}

impl HeadlessChrome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific browser binary instead of searching `PATH`.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(binary.into()),
        }
    }

    fn locate(&self) -> Result<PathBuf, StrategyError> {
        if let Some(binary) = &self.binary {
            return Ok(binary.clone());
        }
        BROWSER_BINARIES
            .iter()
            .find_map(|name| which::which(name).ok())
            .ok_or_else(|| StrategyError::unavailable("no chrome or chromium binary on PATH"))
    }
}

#[async_trait]
impl FetchStrategy for HeadlessChrome {
    fn name(&self) -> &str {
        "headless-chrome"
    }

    async fn fetch(
        &self,
        target: &Target,
        ctx: &mut AttemptContext,
    ) -> Result<String, StrategyError> {
        let binary = self.locate()?;

        let output = Command::new(&binary)
            .args([
                "--headless=new",
                "--disable-gpu",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--disable-blink-features=AutomationControlled",
            ])
            .arg(format!("--user-agent={}", ctx.user_agent))
            .arg("--dump-dom")
            .arg(target.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| StrategyError::unavailable(format!("failed to launch {}: {e}", binary.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let first_line = stderr.lines().next().unwrap_or_default();
            return Err(StrategyError::transport(format!(
                "browser exited with {} {first_line}",
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
