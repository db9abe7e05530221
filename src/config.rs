//! Race configuration file.
//!
//! Looked up at `--config <path>` or `~/.pagerace/config.json`. Every field
//! is optional; missing ones take the built-in defaults.

use crate::error::{PageraceError, Result};
use crate::tools::fetch::strategies;
use crate::tools::fetch::{Mode, RaceOptions, StrategySet, ValidatorConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Semaphore;

const CONFIG_DIR: &str = ".pagerace";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub concurrency_cap: usize,
    pub mode: Mode,
    pub timeout_ms: u64,
    pub max_jitter_ms: u64,
    /// `[min, max]` pause before each attempt; `null` disables it.
    pub pacing_ms: Option<(u64, u64)>,
    pub seed: Option<u64>,
    /// Include the slow, extended-header and referrer-warming strategies.
    pub aggressive: bool,
    /// Restrict the race to these strategies, in this order.
    pub strategies: Option<Vec<String>>,
    pub validator: ValidatorConfig,
}

impl Default for RaceConfig {
    fn default() -> Self {
        let options = RaceOptions::default();
        Self {
            max_retries: options.max_retries,
            base_delay_ms: millis(options.base_delay),
            concurrency_cap: options.concurrency_cap,
            mode: options.mode,
            timeout_ms: millis(options.attempt_timeout),
            max_jitter_ms: millis(options.max_jitter),
            pacing_ms: options.pacing.map(|(min, max)| (millis(min), millis(max))),
            seed: options.seed,
            aggressive: true,
            strategies: None,
            validator: options.validator,
        }
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis().min(u64::MAX as u128) as u64
}

impl RaceConfig {
    /// `~/.pagerace/config.json`, if a home directory can be found.
    pub fn default_path() -> Option<PathBuf> {
        let user_dirs = directories::UserDirs::new()?;
        Some(user_dirs.home_dir().join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            PageraceError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load `explicit` (which must exist), else the default file when present,
    /// else built-in defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn to_options(&self) -> Result<RaceOptions> {
        if self.concurrency_cap == 0 {
            return Err(PageraceError::Config(
                "concurrency_cap must be at least 1".into(),
            ));
        }
        if self.concurrency_cap > Semaphore::MAX_PERMITS {
            return Err(PageraceError::Config(format!(
                "concurrency_cap must not exceed {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if let Some((min, max)) = self.pacing_ms {
            if min > max {
                return Err(PageraceError::Config(format!(
                    "pacing_ms range is reversed: [{min}, {max}]"
                )));
            }
        }
        if self.validator.min_len > self.validator.substantial_len {
            return Err(PageraceError::Config(
                "validator.min_len must not exceed validator.substantial_len".into(),
            ));
        }

        Ok(RaceOptions {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            concurrency_cap: self.concurrency_cap,
            mode: self.mode,
            attempt_timeout: Duration::from_millis(self.timeout_ms),
            max_jitter: Duration::from_millis(self.max_jitter_ms),
            pacing: self
                .pacing_ms
                .map(|(min, max)| (Duration::from_millis(min), Duration::from_millis(max))),
            seed: self.seed,
            validator: self.validator.clone(),
        })
    }

    pub fn strategy_set(&self) -> Result<StrategySet> {
        match &self.strategies {
            Some(names) if !names.is_empty() => strategies::select(names),
            _ => Ok(strategies::standard(self.aggressive)),
        }
    }
}
