//! Identity provider trait

use crate::error::IdentityError;
use crate::identity::session::{Session, SessionEvent};
// async_trait required for dyn-compatibility with Arc<dyn IdentityProvider>
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Source of the current session and of session change notifications
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, refreshed transparently when it is about to expire
    async fn get_session(&self) -> Result<Option<Session>, IdentityError>;

    /// Register for sign-in, sign-out and token refresh notifications
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    /// End the current session
    async fn sign_out(&self) -> Result<(), IdentityError>;
}
