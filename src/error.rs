//! Error types for classgate
//!
//! This module defines the error hierarchy used throughout the application.
//! We use `thiserror` for library-style errors that are part of the API,
//! and only reach for `anyhow` at the binary boundary.

use std::fmt;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Store(#[from] StoreError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },
}

/// Errors returned by the BaaS REST endpoints (tables and auth)
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Unauthorized: missing, invalid or expired session")]
    Unauthorized,

    #[error("Forbidden: insufficient permissions for {action}")]
    Forbidden { action: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    /// Create an appropriate error from an HTTP status code and response body
    ///
    /// PostgREST and GoTrue both answer with small JSON documents; the most
    /// specific human-readable field is surfaced when present.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = extract_message(body);

        match status {
            401 => StoreError::Unauthorized,
            403 => StoreError::Forbidden {
                action: message.unwrap_or_else(|| "this operation".into()),
            },
            // PostgREST answers 406 when a single-row request matched nothing
            404 | 406 => StoreError::NotFound {
                resource: message.unwrap_or_else(|| "requested resource".into()),
            },
            409 => StoreError::Conflict {
                message: message.unwrap_or_else(|| format!("HTTP {}", status)),
            },
            429 => StoreError::RateLimited { retry_after: 60 },
            _ => StoreError::Api {
                status,
                message: message.unwrap_or_else(|| {
                    if body.is_empty() {
                        format!("HTTP {}", status)
                    } else {
                        body.to_string()
                    }
                }),
            },
        }
    }

    /// Whether the request is worth repeating unchanged
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Request(e) => e.is_timeout() || e.is_connect(),
            StoreError::RateLimited { .. } => true,
            StoreError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error_description", "msg", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// Credential errors for decorating backend requests
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No API key configured")]
    NotConfigured,

    #[error("Invalid API key format")]
    InvalidKey,

    #[error("Authentication failed: {0}")]
    Failed(String),
}

/// Identity provider errors (sign-in, token refresh, persistence)
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Backend error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Not signed in")]
    NoSession,

    #[error("Failed to persist session: {0}")]
    Persist(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which network call of a refresh cycle failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Session,
    Profile,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStage::Session => f.write_str("session"),
            FetchStage::Profile => f.write_str("profile"),
        }
    }
}

/// Failures observed by the freshness protocol
///
/// Logged and folded into the cached state according to the configured
/// failure policy; callers only see them in a refresh outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("session fetch failed: {0}")]
    Session(String),

    #[error("profile fetch failed: {0}")]
    Profile(String),

    #[error("{stage} fetch timed out after {timeout_ms} ms")]
    Timeout { stage: FetchStage, timeout_ms: u64 },
}

impl FetchError {
    /// The refresh stage this failure belongs to
    pub fn stage(&self) -> FetchStage {
        match self {
            FetchError::Session(_) => FetchStage::Session,
            FetchError::Profile(_) => FetchStage::Profile,
            FetchError::Timeout { stage, .. } => *stage,
        }
    }
}

/// Rejected user input, reported before any request is sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be a positive whole number, got '{value}'")]
    NotPositive { field: &'static str, value: String },

    #[error("unknown category '{0}'")]
    UnknownCategory(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for backend operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
