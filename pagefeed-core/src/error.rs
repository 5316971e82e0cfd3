//! Error types for feed fetches

use std::fmt;
use thiserror::Error;

/// The ways a page fetch can fail.
///
/// The controller treats every kind the same way (the fetch is abandoned and
/// a diagnostic is recorded), but the kind is kept so diagnostics and tests
/// can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedErrorKind {
    MissingCredential,
    TransportFailure,
    HttpStatusFailure,
    EmptyBody,
    DecodeFailure,
}

impl FeedErrorKind {
    pub const ALL: [FeedErrorKind; 5] = [
        FeedErrorKind::MissingCredential,
        FeedErrorKind::TransportFailure,
        FeedErrorKind::HttpStatusFailure,
        FeedErrorKind::EmptyBody,
        FeedErrorKind::DecodeFailure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::TransportFailure => "transport_failure",
            Self::HttpStatusFailure => "http_status_failure",
            Self::EmptyBody => "empty_body",
            Self::DecodeFailure => "decode_failure",
        }
    }
}

impl fmt::Display for FeedErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed page fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct FeedError {
    pub kind: FeedErrorKind,
    pub message: String,
    /// HTTP status for [`FeedErrorKind::HttpStatusFailure`].
    pub status: Option<u16>,
}

impl FeedError {
    pub fn new(kind: FeedErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn missing_credential() -> Self {
        Self::new(FeedErrorKind::MissingCredential, "no API credential configured")
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FeedErrorKind::TransportFailure, message)
    }

    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            kind: FeedErrorKind::HttpStatusFailure,
            message: format!("HTTP {}: {}", status, body.into()),
            status: Some(status),
        }
    }

    pub fn empty_body() -> Self {
        Self::new(FeedErrorKind::EmptyBody, "response body was empty")
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(FeedErrorKind::DecodeFailure, message)
    }
}

/// Result type alias for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;
