//! Session types
//!
//! A session is the auth service's proof that a user signed in. The client
//! only ever replaces it wholesale; it never edits one in place.

use crate::util::SecretString;
use serde::{Deserialize, Serialize};

/// Signed-in user as reported by the auth service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    /// Expiry as unix seconds
    pub expires_at: Option<i64>,
    pub user: SessionUser,
}

impl Session {
    /// Identity the profile lookup is keyed by
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Whether the access token expires within `margin_secs` of `now`
    pub fn expires_within(&self, now: i64, margin_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= now.saturating_add(margin_secs))
    }
}

/// Kind of identity change pushed by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Identity change notification
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub kind: AuthChange,
    pub session: Option<Session>,
}

impl SessionEvent {
    pub fn signed_in(session: Session) -> Self {
        Self {
            kind: AuthChange::SignedIn,
            session: Some(session),
        }
    }

    pub fn refreshed(session: Session) -> Self {
        Self {
            kind: AuthChange::TokenRefreshed,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: AuthChange::SignedOut,
            session: None,
        }
    }
}

/// Token grant response from the auth service
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: SecretString,
    #[serde(default)]
    pub refresh_token: Option<SecretString>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: SessionUser,
}

impl TokenResponse {
    pub fn into_session(self, now: i64) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now.saturating_add(secs)));

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// On-disk form of a session
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PersistedSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: SessionUser,
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.access_token.expose_secret().to_string(),
            refresh_token: session
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
            expires_at: session.expires_at,
            user: session.user.clone(),
        }
    }
}

impl From<PersistedSession> for Session {
    fn from(saved: PersistedSession) -> Self {
        Self {
            access_token: SecretString::new(saved.access_token),
            refresh_token: saved.refresh_token.map(SecretString::new),
            expires_at: saved.expires_at,
            user: saved.user,
        }
    }
}
