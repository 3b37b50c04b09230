use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("scan depth must be between 1 and 3, got {0}")]
    InvalidDepth(u8),

    #[error("malformed server response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("server rejected scan: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
