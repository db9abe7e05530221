use super::race::{judge, panic_message, won};
use super::strategy::StrategySet;
use super::types::*;
use super::validate::ContentValidator;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Try strategies one after another, in set order.
///
/// Returns on the first valid result without touching the strategies after
/// it. Nothing runs concurrently, which keeps the load on the host down.
pub async fn race_sequential(
    target: &Target,
    strategies: &StrategySet,
    options: &RaceOptions,
    cancel: &CancellationToken,
) -> RaceOutcome {
    let started = Instant::now();
    let policy = options.retry_policy();
    let validator = ContentValidator::new(options.validator.clone());
    let seed = options.race_seed();
    let total = strategies.len();
    let mut failures = Vec::with_capacity(total);

    info!(url = %target, strategies = total, "trying strategies sequentially");

    for (index, strategy) in strategies.iter().enumerate() {
        let name = strategy.name().to_string();
        if cancel.is_cancelled() {
            failures.push(StrategyFailure {
                strategy: name,
                cause: FailureCause::Cancelled,
            });
            continue;
        }

        info!(strategy = %name, position = index + 1, total, "trying");
        let mut rng = strategy_rng(seed, index);
        let attempt = policy.run_with_backoff(strategy.as_ref(), target, &mut rng, cancel);
        let result = match AssertUnwindSafe(attempt).catch_unwind().await {
            Ok((result, _)) => result,
            Err(payload) => FetchResult::Failure {
                strategy: name.clone(),
                cause: FailureCause::Panicked(panic_message(payload)),
                attempts: 0,
            },
        };

        match judge(&validator, result) {
            Ok(winner) => {
                info!(strategy = %winner.strategy, bytes = winner.content.len(), "success");
                return won(winner, started);
            }
            Err(cause) => failures.push(StrategyFailure {
                strategy: name,
                cause,
            }),
        }
    }

    info!(url = %target, "all strategies exhausted");
    RaceOutcome::Exhausted { failures }
}
