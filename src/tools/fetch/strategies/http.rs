use crate::tools::fetch::client::{build_client, get_text, ClientSpec};
use crate::tools::fetch::headers::headers_for_profile;
use crate::tools::fetch::profile::FetchProfile;
use crate::tools::fetch::strategy::{AttemptContext, FetchStrategy, StrategyError};
use crate::tools::fetch::types::Target;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::time::Duration;
use tracing::debug;

const SLOW_MIN: Duration = Duration::from_secs(3);
const SLOW_MAX: Duration = Duration::from_secs(7);

/// Flavours of a single direct GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpFlavor {
    /// No headers beyond what the client sends by itself.
    Plain,
    /// Desktop browser headers.
    Headers,
    /// Desktop headers on a client tuned for HTTP/2.
    Http2,
    /// Desktop headers with a cookie jar.
    CookieSession,
    /// Android Chrome headers.
    Mobile,
    /// Full Sec-Fetch / client hint suite with a cookie jar.
    ExtendedHeaders,
    /// Long random pause, then a cookie session GET.
    Slow,
}

impl HttpFlavor {
    fn name(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Headers => "headers",
            Self::Http2 => "http2",
            Self::CookieSession => "cookie-session",
            Self::Mobile => "mobile",
            Self::ExtendedHeaders => "extended-headers",
            Self::Slow => "slow",
        }
    }

    fn profile(self) -> Option<FetchProfile> {
        match self {
            Self::Plain => None,
            Self::Headers | Self::Http2 | Self::CookieSession | Self::Slow => {
                Some(FetchProfile::Desktop)
            }
            Self::Mobile => Some(FetchProfile::Android),
            Self::ExtendedHeaders => Some(FetchProfile::Extended),
        }
    }

    fn client_spec(self) -> ClientSpec<'static> {
        ClientSpec {
            cookies: matches!(self, Self::CookieSession | Self::ExtendedHeaders | Self::Slow),
            http2_tuned: self == Self::Http2,
            proxy: None,
        }
    }
}

/// Direct HTTP GET with one of the [`HttpFlavor`] presets.
#[derive(Debug, Clone)]
pub struct HttpStrategy {
    flavor: HttpFlavor,
}

impl HttpStrategy {
    pub fn new(flavor: HttpFlavor) -> Self {
        Self { flavor }
    }

    pub fn flavor(&self) -> HttpFlavor {
        self.flavor
    }
}

#[async_trait]
impl FetchStrategy for HttpStrategy {
    fn name(&self) -> &str {
        self.flavor.name()
    }

    fn pause_allowance(&self) -> Duration {
        match self.flavor {
            HttpFlavor::Slow => SLOW_MAX,
            _ => Duration::ZERO,
        }
    }

    async fn fetch(
        &self,
        target: &Target,
        ctx: &mut AttemptContext,
    ) -> Result<String, StrategyError> {
        if self.flavor == HttpFlavor::Slow {
            let pause = ctx.random_delay(SLOW_MIN, SLOW_MAX);
            tokio::time::sleep(pause).await;
        }

        let headers = match self.flavor.profile() {
            Some(profile) => {
                debug!(
                    strategy = self.flavor.name(),
                    profile = profile.name(),
                    "sending profile headers"
                );
                headers_for_profile(profile, ctx.user_agent)
            }
            None => HeaderMap::new(),
        };
        let client = build_client(&self.flavor.client_spec(), ctx.timeout)?;
        get_text(&client, target.as_str(), headers, None).await
    }
}
