//! Auth-service backed identity provider
//!
//! Signs users in with email and password, refreshes access tokens shortly
//! before they expire, and optionally keeps the session in a JSON file so a
//! later run starts signed in.

use crate::auth::AnonKeyProvider;
use crate::baas::BaasClient;
use crate::config::{AuthConfig, BackendConfig};
use crate::error::{IdentityError, StoreError};
use crate::identity::provider::IdentityProvider;
use crate::identity::session::{PersistedSession, Session, SessionEvent, TokenResponse};
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, instrument, warn};

const EVENT_CAPACITY: usize = 16;

/// Identity provider talking to the project's auth endpoints
pub struct GoTrueIdentity {
    client: BaasClient,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
    session_file: Option<PathBuf>,
    refresh_margin_secs: i64,
}

impl GoTrueIdentity {
    /// Create a provider, restoring a persisted session when enabled
    pub fn new(
        backend: &BackendConfig,
        auth: &AuthConfig,
        anon: AnonKeyProvider,
    ) -> Result<Self, IdentityError> {
        let client = BaasClient::new(backend, Box::new(anon))?;

        let session_file = auth
            .persist_session
            .then(|| PathBuf::from(shellexpand::tilde(&auth.session_file).as_ref()));

        let restored = session_file.as_deref().and_then(load_session);

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            client,
            session: Mutex::new(restored),
            events,
            session_file,
            refresh_margin_secs: i64::try_from(auth.refresh_margin_secs).unwrap_or(i64::MAX),
        })
    }

    /// Exchange email and password for a session
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let body = json!({ "email": email, "password": password });

        let response: TokenResponse = self
            .client
            .post("/auth/v1/token?grant_type=password", &body)
            .await
            .map_err(|e| match e {
                StoreError::Api { status: 400, .. } | StoreError::Unauthorized => {
                    IdentityError::InvalidCredentials
                }
                other => IdentityError::Store(other),
            })?;

        let session = response.into_session(now());
        self.replace(Some(session.clone())).await?;
        info!(user = %session.user_id(), "Signed in");
        let _ = self.events.send(SessionEvent::signed_in(session.clone()));

        Ok(session)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Option<Session>, IdentityError> {
        let body = json!({ "refresh_token": refresh_token });

        match self
            .client
            .post::<TokenResponse, _>("/auth/v1/token?grant_type=refresh_token", &body)
            .await
        {
            Ok(response) => {
                let session = response.into_session(now());
                debug!(user = %session.user_id(), "Access token refreshed");
                let _ = self.events.send(SessionEvent::refreshed(session.clone()));
                Ok(Some(session))
            }
            Err(StoreError::Api { status: 400, .. } | StoreError::Unauthorized) => {
                warn!("Refresh token rejected, signing out");
                let _ = self.events.send(SessionEvent::signed_out());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Swap the stored session and keep the file in step
    async fn replace(&self, next: Option<Session>) -> Result<(), IdentityError> {
        let mut guard = self.session.lock().await;
        *guard = next;
        self.persist(guard.as_ref()).await
    }

    async fn persist(&self, session: Option<&Session>) -> Result<(), IdentityError> {
        let Some(path) = &self.session_file else {
            return Ok(());
        };

        match session {
            Some(session) => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                let text = serde_json::to_string_pretty(&PersistedSession::from(session))
                    .map_err(|e| IdentityError::Persist(e.to_string()))?;
                tokio::fs::write(path, text).await?;
            }
            None => match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }

        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for GoTrueIdentity {
    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        // Held across the refresh so concurrent callers share one token grant
        let mut guard = self.session.lock().await;

        let Some(current) = guard.as_ref() else {
            return Ok(None);
        };

        if !current.expires_within(now(), self.refresh_margin_secs) {
            return Ok(Some(current.clone()));
        }

        let next = match current.refresh_token.clone() {
            Some(token) => self.refresh(token.expose_secret()).await?,
            None => {
                warn!("Session expired without a refresh token");
                let _ = self.events.send(SessionEvent::signed_out());
                None
            }
        };

        *guard = next.clone();
        self.persist(guard.as_ref()).await?;
        Ok(next)
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let previous = self.session.lock().await.take();

        if let Some(session) = &previous
            && let Err(e) = self
                .client
                .post_as("/auth/v1/logout", session.access_token.expose_secret(), &json!({}))
                .await
        {
            // The local session is dropped regardless
            warn!(error = %e, "Remote sign-out failed");
        }

        self.persist(None).await?;
        info!("Signed out");
        let _ = self.events.send(SessionEvent::signed_out());
        Ok(())
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn load_session(path: &Path) -> Option<Session> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read saved session");
            return None;
        }
    };

    match serde_json::from_str::<PersistedSession>(&text) {
        Ok(saved) => Some(saved.into()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring corrupt saved session");
            None
        }
    }
}
