use std::fmt;

use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

pub type RestResult<T> = Result<T, RestError>;

/// Where in the exchange a transport failure happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Send,
    Receive,
    Internal,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Send => "send",
            Self::Receive => "receive",
            Self::Internal => "internal",
        };
        f.write_str(label)
    }
}

/// The remote service answered but signaled failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiError {
    pub status_code: u16,
    pub message: String,
    pub raw_body: Option<Bytes>,
}

impl ApiError {
    pub fn new(status_code: u16, message: impl Into<String>, raw_body: Option<Bytes>) -> Self {
        Self {
            status_code,
            message: message.into(),
            raw_body,
        }
    }

    /// Builds the error for a non-success response.
    ///
    /// Prefers an `error` or `message` string field of a JSON body, then the
    /// raw body text, then the canonical reason phrase for the status.
    pub fn from_status(status_code: u16, body: Bytes) -> Self {
        let message = error_message_from_body(&body).unwrap_or_else(|| {
            reqwest::StatusCode::from_u16(status_code)
                .ok()
                .and_then(|status| status.canonical_reason())
                .unwrap_or("request failed")
                .to_string()
        });
        let raw_body = (!body.is_empty()).then_some(body);
        Self::new(status_code, message, raw_body)
    }

    pub fn decode_failure(status_code: u16, err: impl fmt::Display, body: Bytes) -> Self {
        Self::new(status_code, format!("decode failure: {err}"), Some(body))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "api error status={} {}", self.status_code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Error)]
pub enum RestError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport failure ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RestError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub(crate) fn from_reqwest(fallback: TransportErrorKind, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else {
            fallback
        };
        Self::transport(kind, err.to_string())
    }

    /// HTTP status carried by the error. Transport failures and errors raised
    /// before a request was sent report `0`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Api(err) => err.status_code,
            Self::Protocol(_) => 402,
            _ => 0,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            Self::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }

    pub fn raw_body(&self) -> Option<&Bytes> {
        self.api_error().and_then(|err| err.raw_body.as_ref())
    }
}

impl From<sonic_rs::Error> for RestError {
    fn from(err: sonic_rs::Error) -> Self {
        Self::InvalidRequest(format!("json encode failed: {err}"))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn error_message_from_body(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }

    if let Ok(parsed) = sonic_rs::from_slice::<ErrorBody>(body) {
        if let Some(text) = parsed.error.or(parsed.message) {
            return Some(text);
        }
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    (!text.is_empty()).then_some(text)
}
