//! Built-in strategies and the registry that orders them.

mod chrome;
mod http;
mod mimic;
mod tor;

pub use chrome::HeadlessChrome;
pub use http::{HttpFlavor, HttpStrategy};
pub use mimic::BrowserMimic;
pub use tor::TorProxy;

use super::strategy::{FetchStrategy, StrategySet};
use crate::error::{PageraceError, Result};
use std::sync::Arc;

/// Catalogue order; the aggressive extras come last.
const STANDARD: [&str; 7] = [
    "plain",
    "headers",
    "http2",
    "cookie-session",
    "mobile",
    "headless-chrome",
    "tor",
];
const AGGRESSIVE: [&str; 3] = ["slow", "extended-headers", "browser-mimic"];

/// Names of every built-in strategy, in catalogue order.
pub fn names(aggressive: bool) -> Vec<&'static str> {
    let mut names = STANDARD.to_vec();
    if aggressive {
        names.extend(AGGRESSIVE);
    }
    names
}

/// Build one built-in strategy by name.
pub fn by_name(name: &str) -> Result<Arc<dyn FetchStrategy>> {
    let strategy: Arc<dyn FetchStrategy> = match name {
        "plain" => Arc::new(HttpStrategy::new(HttpFlavor::Plain)),
        "headers" => Arc::new(HttpStrategy::new(HttpFlavor::Headers)),
        "http2" => Arc::new(HttpStrategy::new(HttpFlavor::Http2)),
        "cookie-session" => Arc::new(HttpStrategy::new(HttpFlavor::CookieSession)),
        "mobile" => Arc::new(HttpStrategy::new(HttpFlavor::Mobile)),
        "extended-headers" => Arc::new(HttpStrategy::new(HttpFlavor::ExtendedHeaders)),
        "slow" => Arc::new(HttpStrategy::new(HttpFlavor::Slow)),
        "browser-mimic" => Arc::new(BrowserMimic::new()),
        "headless-chrome" => Arc::new(HeadlessChrome::new()),
        "tor" => Arc::new(TorProxy::new()),
        other => return Err(PageraceError::UnknownStrategy(other.to_string())),
    };
    Ok(strategy)
}

/// The full built-in set. `aggressive` adds the slow, extended-header and
/// referrer-warming strategies.
pub fn standard(aggressive: bool) -> StrategySet {
    names(aggressive)
        .into_iter()
        .filter_map(|name| by_name(name).ok())
        .collect()
}

/// A set restricted to `names`, in the order given.
pub fn select<S: AsRef<str>>(names: &[S]) -> Result<StrategySet> {
    let strategies = names
        .iter()
        .map(|name| by_name(name.as_ref().trim()))
        .collect::<Result<Vec<_>>>()?;
    Ok(StrategySet::new(strategies))
}
