use super::strategy::StrategyError;
use rand::Rng;
use reqwest::StatusCode;
use std::time::Duration;

const SUSPICIOUS_PATTERNS: [&str; 10] = [
    "verify you are a human",
    "please complete the captcha",
    "solve this captcha",
    "captcha challenge",
    "cf-browser-verification",
    "cf-captcha-container",
    "px-captcha",
    "blocked by cloudflare",
    "please enable javascript and cookies",
    "bot detection",
];

/// Random duration within [min, max); `min` when the range is empty.
pub(crate) fn random_between<R: Rng + ?Sized>(rng: &mut R, min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    min + (max - min).mul_f64(rng.gen::<f64>())
}

fn describe_status(status: StatusCode) -> &'static str {
    match status {
        StatusCode::TOO_MANY_REQUESTS => "rate limited",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::NOT_FOUND => "not found",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::BAD_REQUEST => "bad request",
        s if s.is_server_error() => "server error",
        _ => "unknown error",
    }
}

/// Turn an HTTP response into a strategy result.
///
/// Non-success statuses and bot challenge pages are transport failures so
/// the retry loop gets another go at them. Content quality is not judged
/// here.
pub(crate) fn check_response(status: StatusCode, body: String) -> Result<String, StrategyError> {
    if !status.is_success() {
        return Err(StrategyError::transport(format!(
            "status {} ({})",
            status.as_u16(),
            describe_status(status)
        )));
    }

    let lower = body.to_ascii_lowercase();
    if let Some(pattern) = SUSPICIOUS_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(StrategyError::transport(format!("suspicious - {pattern}")));
    }

    Ok(body)
}
