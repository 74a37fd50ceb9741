use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid broker url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported broker url scheme: {0}")]
    UnsupportedScheme(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("transport is not open")]
    NotOpen,
    #[error("transport rejected request: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no boat identity set")]
    NoIdentity,
    #[error("display text is empty")]
    EmptyDisplayText,
    #[error("nothing armed on {0}")]
    NothingArmed(&'static str),
    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),
}
