use super::strategy::StrategyError;
use super::utils::check_response;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::{redirect, Client, Proxy};
use std::time::Duration;

const REDIRECT_LIMIT: usize = 10;

/// How a strategy wants its private client built.
#[derive(Debug, Clone, Default)]
pub(crate) struct ClientSpec<'a> {
    pub cookies: bool,
    pub http2_tuned: bool,
    pub proxy: Option<&'a str>,
}

/// Build a fresh client for one attempt.
///
/// Nothing is cached or shared between strategies; a client lives exactly
/// as long as the attempt that built it.
pub(crate) fn build_client(spec: &ClientSpec<'_>, timeout: Duration) -> Result<Client, StrategyError> {
    let mut builder = Client::builder()
        .cookie_store(spec.cookies)
        .redirect(redirect::Policy::limited(REDIRECT_LIMIT))
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .timeout(timeout)
        .pool_max_idle_per_host(0);

    if spec.http2_tuned {
        builder = builder.http2_adaptive_window(true);
    }

    if let Some(proxy) = spec.proxy {
        let proxy = Proxy::all(proxy)
            .map_err(|e| StrategyError::unavailable(format!("invalid proxy {proxy}: {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| StrategyError::transport(format!("failed to build client: {e}")))
}

/// GET `url` and return the body of a successful, non-challenge response.
pub(crate) async fn get_text(
    client: &Client,
    url: &str,
    mut headers: HeaderMap,
    referer: Option<&str>,
) -> Result<String, StrategyError> {
    if let Some(ref_url) = referer {
        if let Ok(value) = HeaderValue::from_str(ref_url) {
            headers.insert(REFERER, value);
        }
    }

    let response = client
        .get(url)
        .headers(headers)
        .send()
        .await
        .map_err(|e| StrategyError::transport(format!("HTTP request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| StrategyError::transport(format!("failed to read response: {e}")))?;

    check_response(status, body)
}
