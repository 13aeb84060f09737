//! Exchange error types

use thiserror::Error;

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Network timeout")]
    Timeout,

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parsing error: {0}")]
    Parse(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid number in {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Symbol not listed: {0}")]
    NotListed(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Coarse classification used when a failure is folded into an absent quote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SourceUnavailable,
    MalformedResponse,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::SourceUnavailable => write!(f, "source unavailable"),
            ErrorKind::MalformedResponse => write!(f, "malformed response"),
        }
    }
}

impl SourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) | Self::WebSocket(_) | Self::Timeout | Self::Status { .. } | Self::Unknown(_) => {
                ErrorKind::SourceUnavailable
            }
            Self::Parse(_) | Self::MissingField(_) | Self::InvalidNumber { .. } | Self::NotListed(_) => {
                ErrorKind::MalformedResponse
            }
        }
    }
}

/// Parse a numeric string field the way exchanges send them (`"16569.01"`)
pub fn parse_number(field: &'static str, value: &str) -> SourceResult<f64> {
    let parsed = value.trim().parse::<f64>().map_err(|_| SourceError::InvalidNumber {
        field,
        value: value.to_string(),
    })?;
    if !parsed.is_finite() {
        return Err(SourceError::InvalidNumber {
            field,
            value: value.to_string(),
        });
    }
    Ok(parsed)
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SourceError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(err.to_string())
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            Self::Unknown(err.to_string())
        }
    }
}
