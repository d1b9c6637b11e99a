use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx response. `message` holds the body's `error` field when the
    /// server sent one.
    #[error("API error ({status}): {}", .message.as_deref().unwrap_or("no error message"))]
    Api {
        status: StatusCode,
        message: Option<String>,
    },

    /// 2xx response whose body reports `success: false`.
    #[error("Analysis rejected: {}", .0.as_deref().unwrap_or("no error message"))]
    Rejected(Option<String>),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file: {0}")]
    InvalidFile(String),
}

impl AnalyzerError {
    /// Message supplied by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            AnalyzerError::Api { message, .. } | AnalyzerError::Rejected(message) => {
                message.as_deref()
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
