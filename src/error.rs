use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Upstream returned status {status} for {url}")]
    Http { status: u16, url: String },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Plugin error: {0}")]
    Plugin(String),
    #[error("Timeout error: {0}")]
    Timeout(String),
}

impl From<serde_json::Error> for StreamError {
    fn from(e: serde_json::Error) -> Self {
        StreamError::Parse(e.to_string())
    }
}

impl From<hyper::Error> for StreamError {
    fn from(e: hyper::Error) -> Self {
        StreamError::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
