//! Configuration types for classgate
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use crate::access::{Destination, Role};
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// BaaS connection settings
    pub backend: BackendConfig,

    /// Session handling
    pub auth: AuthConfig,

    /// Profile/session cache maintenance
    pub freshness: FreshnessConfig,

    /// Client-side navigation targets
    pub routes: RoutesConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// BaaS connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL (e.g., `https://abcd.supabase.co`)
    pub url: String,

    /// Public anon key (prefer env var SUPABASE_ANON_KEY)
    #[serde(default)]
    pub anon_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries for failed read requests
    pub max_retries: u32,

    /// Whether to verify SSL certificates
    pub verify_ssl: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:54321".to_string(),
            anon_key: None,
            timeout_secs: 30,
            max_retries: 2,
            verify_ssl: true,
        }
    }
}

/// Session handling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Keep the session on disk between runs
    pub persist_session: bool,

    /// Where the session is stored (`~` is expanded)
    pub session_file: String,

    /// Refresh the access token this many seconds before it expires
    pub refresh_margin_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            persist_session: true,
            session_file: "~/.config/classgate/session.json".to_string(),
            refresh_margin_secs: 60,
        }
    }
}

/// Freshness protocol configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FreshnessConfig {
    /// Upper bound for each network call of a refresh cycle
    pub fetch_timeout_secs: u64,

    /// How often `watch` revalidates silently
    pub revalidate_interval_secs: u64,

    /// What a failed fetch does to the cached values
    pub on_fetch_failure: FailurePolicy,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 10,
            revalidate_interval_secs: 30,
            on_fetch_failure: FailurePolicy::FailClosed,
        }
    }
}

/// Effect of a failed session/profile fetch on the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Drop the value that could not be fetched (the gate then redirects to login)
    #[default]
    FailClosed,
    /// Leave the cached value as it was
    KeepCached,
}

/// Navigation targets for gate redirects
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    pub login: String,
    pub pending: String,
    pub teacher_home: String,
    pub student_home: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            pending: "/pending".to_string(),
            teacher_home: "/teacher/students".to_string(),
            student_home: "/student/calendar".to_string(),
        }
    }
}

impl RoutesConfig {
    /// Path a gate destination navigates to
    pub fn path_for(&self, destination: Destination) -> &str {
        match destination {
            Destination::Login => &self.login,
            Destination::PendingApproval => &self.pending,
            Destination::RoleHome(Role::Teacher) => &self.teacher_home,
            Destination::RoleHome(Role::Student) => &self.student_home,
        }
    }

    pub(crate) fn all(&self) -> [(&'static str, &str); 4] {
        [
            ("routes.login", &self.login),
            ("routes.pending", &self.pending),
            ("routes.teacher_home", &self.teacher_home),
            ("routes.student_home", &self.student_home),
        ]
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}
