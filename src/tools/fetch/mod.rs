mod client;
mod headers;
mod race;
mod retry;
mod sequential;
mod strategy;
mod utils;

pub mod profile;
pub mod strategies;
pub mod types;
pub mod validate;

mod tests;

// Re-export types for public use
pub use race::race_concurrent;
pub use retry::{RetryPolicy, RetryState};
pub use sequential::race_sequential;
pub use strategy::{AttemptContext, FetchStrategy, StrategyError, StrategySet};
pub use types::*;
pub use validate::{ContentValidator, ValidatorConfig, Verdict};

use tokio_util::sync::CancellationToken;

/// Race `strategies` for `target` and return the single outcome.
///
/// `options.mode` picks between the concurrent coordinator and the
/// sequential runner. Never fails: total failure is
/// [`RaceOutcome::Exhausted`] with one entry per strategy.
///
/// # Examples
/// ```no_run
/// use pagerace::tools::fetch::{race, strategies, RaceOptions, Target};
///
/// # async fn example() -> pagerace::Result<()> {
/// let target = Target::parse("example.com")?;
/// let outcome = race(&target, &strategies::standard(false), &RaceOptions::default()).await;
/// if let Some(html) = outcome.content() {
///     println!("{} won with {} bytes", outcome.winner().unwrap_or_default(), html.len());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn race(target: &Target, strategies: &StrategySet, options: &RaceOptions) -> RaceOutcome {
    race_with_cancel(target, strategies, options, &CancellationToken::new()).await
}

/// [`race`] that also stops when `cancel` fires (e.g. on Ctrl-C).
pub async fn race_with_cancel(
    target: &Target,
    strategies: &StrategySet,
    options: &RaceOptions,
    cancel: &CancellationToken,
) -> RaceOutcome {
    match options.mode {
        Mode::Concurrent => race_concurrent(target, strategies, options, cancel).await,
        Mode::Sequential => race_sequential(target, strategies, options, cancel).await,
    }
}

/// Fetch `url` with the full built-in strategy set and default options.
///
/// Convenience wrapper returning just the content.
pub async fn fetch(url: &str) -> crate::Result<Option<String>> {
    let target = Target::parse(url)?;
    let outcome = race(&target, &strategies::standard(true), &RaceOptions::default()).await;
    Ok(match outcome {
        RaceOutcome::Won { content, .. } => Some(content),
        RaceOutcome::Exhausted { .. } => None,
    })
}
