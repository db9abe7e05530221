use super::retry::RetryPolicy;
use super::validate::ValidatorConfig;
use crate::error::{PageraceError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

const DEFAULT_CONCURRENCY_CAP: usize = 8;

/// The resource every strategy in a race tries to retrieve.
///
/// Built once per invocation with [`Target::parse`] and read-only after that.
/// The race engine never looks inside it; strategies use [`Target::as_str`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    url: Url,
}

impl Target {
    /// Normalize raw user input into a target.
    ///
    /// Trims whitespace, prefixes `https://` when no scheme is given and
    /// requires a host.
    ///
    /// # Examples
    /// ```
    /// use pagerace::tools::fetch::Target;
    ///
    /// let target = Target::parse("example.com/page").unwrap();
    /// assert_eq!(target.as_str(), "https://example.com/page");
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PageraceError::InvalidTarget("URL cannot be empty".into()));
        }

        let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };

        let url =
            Url::parse(&with_scheme).map_err(|e| PageraceError::InvalidTarget(format!("{raw}: {e}")))?;
        match url.host_str() {
            Some(host) if !host.is_empty() => Ok(Self { url }),
            _ => Err(PageraceError::InvalidTarget(format!("{raw}: missing host"))),
        }
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host without a leading `www.`.
    pub fn domain(&self) -> &str {
        let host = self.url.host_str().unwrap_or_default();
        host.strip_prefix("www.").unwrap_or(host)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Race execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Every strategy at once, first valid result wins.
    #[default]
    Concurrent,
    /// One strategy at a time, in set order.
    Sequential,
}

/// Knobs for one race.
///
/// # Examples
/// ```
/// use pagerace::tools::fetch::{Mode, RaceOptions};
/// use std::time::Duration;
///
/// let options = RaceOptions {
///     mode: Mode::Sequential,
///     base_delay: Duration::from_millis(250),
///     seed: Some(7),
///     ..RaceOptions::default()
/// };
/// assert_eq!(options.concurrency_cap, 8);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RaceOptions {
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Most strategies allowed to run at once in concurrent mode.
    pub concurrency_cap: usize,
    pub mode: Mode,
    pub attempt_timeout: Duration,
    pub max_jitter: Duration,
    /// Random pause before each attempt, `None` to disable.
    pub pacing: Option<(Duration, Duration)>,
    /// Fixed seed for reproducible jitter and user agent rotation.
    pub seed: Option<u64>,
    pub validator: ValidatorConfig,
}

impl Default for RaceOptions {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            max_retries: retry.max_retries,
            base_delay: retry.base_delay,
            concurrency_cap: DEFAULT_CONCURRENCY_CAP,
            mode: Mode::Concurrent,
            attempt_timeout: retry.attempt_timeout,
            max_jitter: retry.max_jitter,
            pacing: Some((Duration::from_millis(500), Duration::from_millis(2000))),
            seed: None,
            validator: ValidatorConfig::default(),
        }
    }
}

impl RaceOptions {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.base_delay,
            max_jitter: self.max_jitter,
            attempt_timeout: self.attempt_timeout,
            pacing: self.pacing,
        }
    }

    /// Seed for this race: the configured one, or a fresh random value.
    pub(crate) fn race_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }
}

/// Independent random source for the strategy at `index`.
pub(crate) fn strategy_rng(seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Why a strategy did not produce the winning content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureCause {
    /// Network, status or timeout failure after retries were exhausted.
    Transport(String),
    /// Strategy disabled itself because an optional capability is missing.
    Unavailable(String),
    /// Content arrived but the validator turned it down.
    Rejected { chars: usize, reason: String },
    /// Race ended before this strategy finished.
    Cancelled,
    /// Strategy panicked; contained to its own unit.
    Panicked(String),
}

impl FailureCause {
    /// Unavailable and cancelled strategies are skipped, not failed.
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::Unavailable(_) | Self::Cancelled)
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "{msg}"),
            Self::Unavailable(msg) => write!(f, "unavailable - {msg}"),
            Self::Rejected { chars, reason } => write!(f, "invalid - {reason} ({chars} chars)"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Panicked(msg) => write!(f, "panicked - {msg}"),
        }
    }
}

/// Result of one strategy's complete attempt sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Content {
        strategy: String,
        content: String,
        attempts: u32,
    },
    Failure {
        strategy: String,
        cause: FailureCause,
        attempts: u32,
    },
}

impl FetchResult {
    pub fn strategy(&self) -> &str {
        match self {
            Self::Content { strategy, .. } | Self::Failure { strategy, .. } => strategy,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Content { attempts, .. } | Self::Failure { attempts, .. } => *attempts,
        }
    }
}

/// Diagnostic entry for a strategy that did not win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyFailure {
    pub strategy: String,
    pub cause: FailureCause,
}

/// Terminal state of one race.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RaceOutcome {
    Won {
        content: String,
        strategy: String,
        attempts: u32,
        elapsed_ms: u64,
    },
    Exhausted {
        failures: Vec<StrategyFailure>,
    },
}

impl RaceOutcome {
    pub fn is_won(&self) -> bool {
        matches!(self, Self::Won { .. })
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Won { content, .. } => Some(content),
            Self::Exhausted { .. } => None,
        }
    }

    pub fn winner(&self) -> Option<&str> {
        match self {
            Self::Won { strategy, .. } => Some(strategy),
            Self::Exhausted { .. } => None,
        }
    }

    pub fn failures(&self) -> &[StrategyFailure] {
        match self {
            Self::Won { .. } => &[],
            Self::Exhausted { failures } => failures,
        }
    }

    /// Failures that count as errors (skipped strategies excluded).
    pub fn error_count(&self) -> usize {
        self.failures().iter().filter(|f| f.cause.is_error()).count()
    }

    pub(crate) fn elapsed(duration: Duration) -> u64 {
        duration.as_millis().min(u64::MAX as u128) as u64
    }
}
