use super::retry::RetryPolicy;
use super::strategy::{FetchStrategy, StrategySet};
use super::types::*;
use super::validate::ContentValidator;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Content accepted by the validator, waiting for (or holding) the commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Winner {
    pub strategy: String,
    pub content: String,
    pub attempts: u32,
}

/// Single place a race result can be written to.
///
/// The first successful [`OutcomeSlot::try_commit`] wins; every later call
/// sees the slot occupied and returns `false`. The race token is cancelled
/// while the lock is held, so no unit can see an empty slot after the
/// signal has gone out.
#[derive(Debug)]
pub(crate) struct OutcomeSlot {
    winner: Mutex<Option<Winner>>,
    cancel: CancellationToken,
}

impl OutcomeSlot {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            winner: Mutex::new(None),
            cancel,
        }
    }

    pub fn try_commit(&self, winner: Winner) -> bool {
        let mut slot = self.winner.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(winner);
        self.cancel.cancel();
        true
    }

    pub fn take(&self) -> Option<Winner> {
        self.winner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Validate a finished attempt sequence.
///
/// Accepted content becomes a [`Winner`] candidate; everything else becomes
/// the cause recorded for that strategy.
pub(crate) fn judge(validator: &ContentValidator, result: FetchResult) -> Result<Winner, FailureCause> {
    match result {
        FetchResult::Content {
            strategy,
            content,
            attempts,
        } => {
            let verdict = validator.check(&content);
            if verdict.is_accepted() {
                Ok(Winner {
                    strategy,
                    content,
                    attempts,
                })
            } else {
                let chars = content.trim().chars().count();
                warn!(strategy = %strategy, chars, reason = verdict.reason(), "invalid content");
                Err(FailureCause::Rejected {
                    chars,
                    reason: verdict.reason().to_string(),
                })
            }
        }
        FetchResult::Failure { strategy, cause, .. } => {
            match &cause {
                FailureCause::Unavailable(_) | FailureCause::Cancelled => {
                    debug!(strategy = %strategy, %cause, "not attempted to completion")
                }
                _ => warn!(strategy = %strategy, %cause, "failed"),
            }
            Err(cause)
        }
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub(crate) fn won(winner: Winner, started: Instant) -> RaceOutcome {
    RaceOutcome::Won {
        content: winner.content,
        strategy: winner.strategy,
        attempts: winner.attempts,
        elapsed_ms: RaceOutcome::elapsed(started.elapsed()),
    }
}

enum UnitOutcome {
    Committed,
    Lost,
    Failed(FailureCause),
}

/// Everything a unit needs, shared read-only across the race.
struct Shared {
    target: Target,
    policy: RetryPolicy,
    validator: ContentValidator,
    slot: OutcomeSlot,
    permits: Semaphore,
    cancel: CancellationToken,
    seed: u64,
}

async fn run_unit(shared: Arc<Shared>, index: usize, strategy: Arc<dyn FetchStrategy>) -> UnitOutcome {
    let _permit = tokio::select! {
        biased;
        _ = shared.cancel.cancelled() => return UnitOutcome::Failed(FailureCause::Cancelled),
        permit = shared.permits.acquire() => match permit {
            Ok(permit) => permit,
            Err(_) => return UnitOutcome::Failed(FailureCause::Cancelled),
        },
    };

    debug!(strategy = strategy.name(), "started");
    let mut rng = strategy_rng(shared.seed, index);
    let (result, _) = shared
        .policy
        .run_with_backoff(strategy.as_ref(), &shared.target, &mut rng, &shared.cancel)
        .await;

    match judge(&shared.validator, result) {
        Ok(winner) => {
            let name = winner.strategy.clone();
            let bytes = winner.content.len();
            if shared.slot.try_commit(winner) {
                info!(strategy = %name, bytes, "first success");
                UnitOutcome::Committed
            } else {
                debug!(strategy = %name, "valid content discarded, race already won");
                UnitOutcome::Lost
            }
        }
        Err(cause) => UnitOutcome::Failed(cause),
    }
}

/// Run every strategy at once and keep the first valid result.
///
/// At most `options.concurrency_cap` strategies are active at a time; the
/// rest queue for a permit. The race returns as soon as one unit commits;
/// the remaining tasks are aborted, which drops whatever they hold.
/// Cancelling `parent` ends the race early with the unfinished strategies
/// recorded as [`FailureCause::Cancelled`].
pub async fn race_concurrent(
    target: &Target,
    strategies: &StrategySet,
    options: &RaceOptions,
    parent: &CancellationToken,
) -> RaceOutcome {
    let started = Instant::now();
    let cancel = parent.child_token();
    // A cap above the set size changes nothing and must stay within what a
    // semaphore can hold.
    let cap = options.concurrency_cap.clamp(1, strategies.len().max(1));
    let shared = Arc::new(Shared {
        target: target.clone(),
        policy: options.retry_policy(),
        validator: ContentValidator::new(options.validator.clone()),
        slot: OutcomeSlot::new(cancel.clone()),
        permits: Semaphore::new(cap),
        cancel: cancel.clone(),
        seed: options.race_seed(),
    });

    info!(
        url = %target,
        strategies = strategies.len(),
        cap,
        "launching strategies concurrently"
    );

    let mut causes: Vec<Option<FailureCause>> = vec![None; strategies.len()];
    let mut units = JoinSet::new();
    for (index, strategy) in strategies.iter().enumerate() {
        let unit = run_unit(Arc::clone(&shared), index, Arc::clone(strategy));
        units.spawn(async move {
            let outcome = match AssertUnwindSafe(unit).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(payload) => UnitOutcome::Failed(FailureCause::Panicked(panic_message(payload))),
            };
            (index, outcome)
        });
    }

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            joined = units.join_next() => match joined {
                None => break,
                Some(Ok((index, UnitOutcome::Failed(cause)))) => causes[index] = Some(cause),
                Some(Ok((_, UnitOutcome::Committed | UnitOutcome::Lost))) => {}
                Some(Err(err)) => warn!(error = %err, "strategy task ended abnormally"),
            },
        }
    }

    // Stragglers are aborted, not awaited: a unit stuck outside an await
    // point must not hold the decision back.
    cancel.cancel();
    units.abort_all();
    drop(units);

    if let Some(winner) = shared.slot.take() {
        return won(winner, started);
    }

    let failures = strategies
        .iter()
        .zip(causes)
        .map(|(strategy, cause)| StrategyFailure {
            strategy: strategy.name().to_string(),
            cause: cause.unwrap_or(FailureCause::Cancelled),
        })
        .collect();
    RaceOutcome::Exhausted { failures }
}
