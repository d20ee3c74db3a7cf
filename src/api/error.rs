//! Error types for the provider API boundary.
//!
//! This module defines structured errors for all provider calls, carrying
//! the endpoint that failed so log lines point at the offending operation.

use thiserror::Error;

/// Errors that can occur while calling the provider API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error calling {endpoint}: {source}")]
    Network {
        /// The endpoint that failed.
        endpoint: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout calling {endpoint}")]
    Timeout {
        /// The endpoint that timed out.
        endpoint: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} from {endpoint}")]
    HttpStatus {
        /// The endpoint that returned an error status.
        endpoint: String,
        /// The HTTP status code.
        status: u16,
        /// The Retry-After header value, if present (for 429 responses).
        retry_after: Option<String>,
    },

    /// Response body could not be decoded into the expected shape.
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        /// The endpoint whose response failed to decode.
        endpoint: String,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A request header value could not be constructed (non-ASCII path, etc.)
    #[error("invalid header value for {endpoint}: {value}")]
    InvalidHeader {
        /// The endpoint the request was for.
        endpoint: String,
        /// The offending value.
        value: String,
    },
}

impl ApiError {
    /// Creates a network error from a reqwest error, mapping timeouts
    /// to their own variant.
    pub fn from_reqwest(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        let endpoint = endpoint.into();
        if source.is_timeout() {
            Self::Timeout { endpoint }
        } else {
            Self::Network { endpoint, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(endpoint: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            endpoint: endpoint.into(),
            status,
            retry_after: None,
        }
    }

    /// Creates an HTTP status error with a Retry-After header value.
    pub fn http_status_with_retry_after(
        endpoint: impl Into<String>,
        status: u16,
        retry_after: Option<String>,
    ) -> Self {
        Self::HttpStatus {
            endpoint: endpoint.into(),
            status,
            retry_after,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(endpoint: impl Into<String>) -> Self {
        Self::Timeout {
            endpoint: endpoint.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(endpoint: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Creates an invalid header value error.
    pub fn invalid_header(endpoint: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidHeader {
            endpoint: endpoint.into(),
            value: value.into(),
        }
    }
}

// Note on From trait implementations:
// We intentionally do NOT implement `From<reqwest::Error>` because our error
// variants require the endpoint context that the source error doesn't carry.
// The helper constructors are the correct pattern here.
