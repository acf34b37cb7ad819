use thiserror::Error;

#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("relay answered with status {0}")]
    Status(u16),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
