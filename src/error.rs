use thiserror::Error;

pub type Result<T> = std::result::Result<T, PageraceError>;

#[derive(Debug, Error)]
pub enum PageraceError {
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
}
