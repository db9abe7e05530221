use crate::tools::fetch::client::{build_client, get_text, ClientSpec};
use crate::tools::fetch::headers::headers_for_profile;
use crate::tools::fetch::profile::FetchProfile;
use crate::tools::fetch::strategy::{AttemptContext, FetchStrategy, StrategyError};
use crate::tools::fetch::types::Target;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

const DEFAULT_PROXY_ADDR: &str = "127.0.0.1:9050";
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Routes the request through a local Tor SOCKS5 proxy.
///
/// Reports itself unavailable when nothing listens on the proxy port.
#[derive(Debug, Clone)]
pub struct TorProxy {
    addr: String,
}

impl TorProxy {
    pub fn new() -> Self {
        Self::with_addr(DEFAULT_PROXY_ADDR)
    }

    pub fn with_addr(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    async fn probe(&self) -> Result<(), StrategyError> {
        match tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(StrategyError::unavailable(format!(
                "no tor proxy at {} ({e})",
                self.addr
            ))),
            Err(_) => Err(StrategyError::unavailable(format!(
                "no tor proxy at {} (probe timed out)",
                self.addr
            ))),
        }
    }
}

impl Default for TorProxy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for TorProxy {
    fn name(&self) -> &str {
        "tor"
    }

    async fn fetch(
        &self,
        target: &Target,
        ctx: &mut AttemptContext,
    ) -> Result<String, StrategyError> {
        self.probe().await?;

        let proxy = format!("socks5h://{}", self.addr);
        let spec = ClientSpec {
            proxy: Some(&proxy),
            ..ClientSpec::default()
        };
        let client = build_client(&spec, ctx.timeout)?;
        let headers = headers_for_profile(FetchProfile::Desktop, ctx.user_agent);
        get_text(&client, target.as_str(), headers, None).await
    }
}
