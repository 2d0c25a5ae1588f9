//! Fetch error types and their classification

use std::fmt;
use thiserror::Error;

/// Longest response body kept in an error (characters)
const MAX_ERROR_BODY: usize = 512;

/// Terminal failure of a single JSON fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Rate limited at {url} after {waits} waits")]
    RateLimited { url: String, waits: u32 },

    #[error("HTTP {status} from {url}: {body}")]
    ServerError {
        url: String,
        status: u16,
        body: String,
    },

    #[error("HTTP {status} from {url}: {body}")]
    ClientError {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Invalid JSON from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Cannot build request URL from {base}: {message}")]
    InvalidUrl { base: String, message: String },
}

impl FetchError {
    /// The error class recorded in run logs
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => ErrorClass::TransientNetwork,
            Self::RateLimited { .. } => ErrorClass::RateLimited,
            Self::ServerError { .. } => ErrorClass::UpstreamServer,
            Self::ClientError { .. } | Self::InvalidUrl { .. } => ErrorClass::UpstreamClient,
            Self::Decode { .. } => ErrorClass::Decode,
        }
    }

    /// HTTP status of the failing response, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServerError { status, .. } | Self::ClientError { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Returns true for a 404, which usually means the id does not exist
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub(crate) fn truncate_body(body: String) -> String {
        if body.chars().count() <= MAX_ERROR_BODY {
            return body;
        }
        let mut truncated: String = body.chars().take(MAX_ERROR_BODY).collect();
        truncated.push_str("...");
        truncated
    }
}

/// Classification tag attached to every logged failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorClass {
    Config,
    TransientNetwork,
    RateLimited,
    UpstreamClient,
    UpstreamServer,
    Decode,
    IdentityUnresolved,
    Storage,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "ConfigError",
            Self::TransientNetwork => "TransientNetworkError",
            Self::RateLimited => "RateLimited",
            Self::UpstreamClient => "UpstreamClientError",
            Self::UpstreamServer => "UpstreamServerError",
            Self::Decode => "DecodeError",
            Self::IdentityUnresolved => "IdentityUnresolved",
            Self::Storage => "StorageError",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
