use crate::tools::fetch::client::{build_client, get_text, ClientSpec};
use crate::tools::fetch::headers::headers_for_profile;
use crate::tools::fetch::profile::FetchProfile;
use crate::tools::fetch::strategy::{AttemptContext, FetchStrategy, StrategyError};
use crate::tools::fetch::types::Target;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const DEFAULT_REFERRER: &str = "https://www.google.com/";
const PAUSE_MIN: Duration = Duration::from_secs(1);
const PAUSE_MAX: Duration = Duration::from_secs(3);
const WARMUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Visits a referrer page first, then the target with `Referer` set, on a
/// single cookie session.
#[derive(Debug, Clone)]
pub struct BrowserMimic {
    referrer: String,
}

impl BrowserMimic {
    pub fn new() -> Self {
        Self::with_referrer(DEFAULT_REFERRER)
    }

    pub fn with_referrer(referrer: impl Into<String>) -> Self {
        Self {
            referrer: referrer.into(),
        }
    }
}

impl Default for BrowserMimic {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for BrowserMimic {
    fn name(&self) -> &str {
        "browser-mimic"
    }

    fn pause_allowance(&self) -> Duration {
        WARMUP_TIMEOUT + PAUSE_MAX
    }

    async fn fetch(
        &self,
        target: &Target,
        ctx: &mut AttemptContext,
    ) -> Result<String, StrategyError> {
        let spec = ClientSpec {
            cookies: true,
            ..ClientSpec::default()
        };
        let client = build_client(&spec, ctx.timeout)?;

        // Warm-up failures are not fatal; the cookies are a bonus.
        let warmup_headers = headers_for_profile(FetchProfile::Minimal, ctx.user_agent);
        let warmup = get_text(&client, &self.referrer, warmup_headers, None);
        match tokio::time::timeout(WARMUP_TIMEOUT, warmup).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!(referrer = %self.referrer, error = %e, "warm-up request failed"),
            Err(_) => debug!(referrer = %self.referrer, "warm-up request timed out"),
        }

        tokio::time::sleep(ctx.random_delay(PAUSE_MIN, PAUSE_MAX)).await;

        let headers = headers_for_profile(FetchProfile::Desktop, ctx.user_agent);
        get_text(&client, target.as_str(), headers, Some(&self.referrer)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowance_covers_warm_up_and_pause() {
        let mimic = BrowserMimic::new();
        assert_eq!(mimic.pause_allowance(), Duration::from_secs(8));
    }
}
