use super::strategy::{AttemptContext, FetchStrategy, StrategyError};
use super::types::{FailureCause, FetchResult, Target};
use super::utils::random_between;
use rand::rngs::StdRng;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Bounded retries with exponential backoff and jitter for one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `max_retries + 1` attempts in total.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Upper bound of the uniform jitter added to each backoff delay.
    pub max_jitter: Duration,
    /// Fixed limit per attempt, never extended across retries.
    pub attempt_timeout: Duration,
    /// Optional random pause before every attempt.
    pub pacing: Option<(Duration, Duration)>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(10),
            pacing: None,
        }
    }
}

/// Progress of one retry loop. Owned by a single invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts started so far.
    pub attempts: u32,
    /// Delay chosen for the upcoming sleep.
    pub next_delay: Duration,
    /// Backoff sleeps completed, in order.
    pub delays: Vec<Duration>,
}

impl RetryPolicy {
    /// `base_delay * 2^attempt + jitter`, jitter uniform in `[0, max_jitter)`.
    pub fn backoff<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        exp.saturating_add(random_between(rng, Duration::ZERO, self.max_jitter))
    }

    /// Run `strategy` until it returns content, fails for good or the race
    /// is cancelled.
    ///
    /// Transport failures (including empty bodies and attempt timeouts) are
    /// retried; the last one is returned verbatim once retries run out.
    /// Each attempt gets `attempt_timeout` plus the strategy's
    /// [`FetchStrategy::pause_allowance`]. Unavailable strategies return at once. Cancellation is checked before
    /// every attempt and every sleep, and also interrupts both.
    pub async fn run_with_backoff(
        &self,
        strategy: &dyn FetchStrategy,
        target: &Target,
        rng: &mut StdRng,
        cancel: &CancellationToken,
    ) -> (FetchResult, RetryState) {
        let name = strategy.name().to_string();
        let deadline = self.attempt_timeout.saturating_add(strategy.pause_allowance());
        let mut state = RetryState::default();
        let mut last_error = StrategyError::transport("no attempt made");

        for attempt in 0..=self.max_retries {
            if cancel.is_cancelled() {
                return (cancelled(name, &state), state);
            }

            if let Some((min, max)) = self.pacing {
                let pause = random_between(rng, min, max);
                if !sleep_or_cancel(pause, cancel).await {
                    return (cancelled(name, &state), state);
                }
            }

            state.attempts = attempt + 1;
            let mut ctx = AttemptContext::new(attempt, self.attempt_timeout, rng);
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return (cancelled(name, &state), state),
                res = tokio::time::timeout(deadline, strategy.fetch(target, &mut ctx)) => res,
            };

            match result {
                Ok(Ok(content)) if !content.trim().is_empty() => {
                    let result = FetchResult::Content {
                        strategy: name,
                        content,
                        attempts: state.attempts,
                    };
                    return (result, state);
                }
                Ok(Ok(_)) => last_error = StrategyError::transport("returned no content"),
                Ok(Err(StrategyError::Unavailable(reason))) => {
                    info!(strategy = %name, %reason, "skipped");
                    let result = FetchResult::Failure {
                        strategy: name,
                        cause: FailureCause::Unavailable(reason),
                        attempts: state.attempts,
                    };
                    return (result, state);
                }
                Ok(Err(err)) => last_error = err,
                Err(_) => {
                    last_error = StrategyError::transport(format!(
                        "timed out after {}ms",
                        deadline.as_millis()
                    ))
                }
            }

            if attempt == self.max_retries {
                break;
            }

            let delay = self.backoff(attempt, rng);
            state.next_delay = delay;
            debug!(
                strategy = %name,
                attempt = attempt + 1,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "retrying after delay"
            );

            if cancel.is_cancelled() || !sleep_or_cancel(delay, cancel).await {
                return (cancelled(name, &state), state);
            }
            state.delays.push(delay);
        }

        let result = FetchResult::Failure {
            strategy: name,
            cause: FailureCause::Transport(last_error.to_string()),
            attempts: state.attempts,
        };
        (result, state)
    }
}

fn cancelled(strategy: String, state: &RetryState) -> FetchResult {
    FetchResult::Failure {
        strategy,
        cause: FailureCause::Cancelled,
        attempts: state.attempts,
    }
}

/// Sleep unless cancelled first. Returns `false` on cancellation.
pub(crate) async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
