use super::headers::pick_user_agent;
use super::types::Target;
use super::utils::random_between;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a single strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    /// Retryable: connection, status, timeout or empty body.
    #[error("{0}")]
    Transport(String),
    /// The strategy cannot run here (missing binary, proxy, ...).
    #[error("{0}")]
    Unavailable(String),
}

impl StrategyError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Parameters handed to every strategy attempt.
///
/// Randomness comes from here, never from process-wide state, so a race
/// seeded with the same value makes the same choices.
#[derive(Debug)]
pub struct AttemptContext {
    /// Zero-based attempt index within the retry loop.
    pub attempt: u32,
    /// Hard limit for this attempt; enforced by the retry loop as well.
    pub timeout: Duration,
    /// User agent rotated per attempt.
    pub user_agent: &'static str,
    pub rng: StdRng,
}

impl AttemptContext {
    pub(crate) fn new(attempt: u32, timeout: Duration, parent: &mut StdRng) -> Self {
        let mut rng = StdRng::seed_from_u64(parent.gen());
        let user_agent = pick_user_agent(&mut rng);
        Self {
            attempt,
            timeout,
            user_agent,
            rng,
        }
    }

    /// Random duration in `[min, max)`; `min` when the range is empty.
    pub fn random_delay(&mut self, min: Duration, max: Duration) -> Duration {
        random_between(&mut self.rng, min, max)
    }
}

/// A retrieval capability that can take part in a race.
///
/// Implementations are independent: no shared clients, no shared mutable
/// state. Faults must come back as [`StrategyError`], never as panics.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Stable identifier used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Longest deliberate pause an attempt may take before its request.
    ///
    /// Added on top of the attempt timeout, so pacing built into a strategy
    /// does not eat into the time its request gets.
    fn pause_allowance(&self) -> Duration {
        Duration::ZERO
    }

    async fn fetch(
        &self,
        target: &Target,
        ctx: &mut AttemptContext,
    ) -> Result<String, StrategyError>;
}

/// Ordered collection of strategies, fixed at construction.
///
/// Order is the attempt order in sequential mode and nothing more in
/// concurrent mode.
#[derive(Clone, Default)]
pub struct StrategySet {
    strategies: Vec<Arc<dyn FetchStrategy>>,
}

impl StrategySet {
    pub fn new(strategies: Vec<Arc<dyn FetchStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FetchStrategy>> {
        self.strategies.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl FromIterator<Arc<dyn FetchStrategy>> for StrategySet {
    fn from_iter<I: IntoIterator<Item = Arc<dyn FetchStrategy>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Debug for StrategySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
