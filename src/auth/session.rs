//! Session-bearing authentication
//!
//! Sends the signed-in user's access token as the bearer so that table
//! policies evaluate requests as that user. Falls back to the anon key when
//! nobody is signed in.

use crate::auth::provider::{AuthHeader, AuthProvider};
use crate::error::AuthError;
use crate::identity::IdentityProvider;
use crate::util::SecretString;
use async_trait::async_trait;
use std::sync::Arc;

/// Auth provider backed by the identity provider's current session
pub struct SessionAuthProvider {
    anon_key: SecretString,
    identity: Arc<dyn IdentityProvider>,
}

impl SessionAuthProvider {
    pub fn new(anon_key: SecretString, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { anon_key, identity }
    }
}

#[async_trait]
impl AuthProvider for SessionAuthProvider {
    async fn get_auth_headers(&self) -> Result<Vec<AuthHeader>, AuthError> {
        let session = self
            .identity
            .get_session()
            .await
            .map_err(|e| AuthError::Failed(e.to_string()))?;

        let bearer = match session {
            Some(session) => session.access_token,
            None => self.anon_key.clone(),
        };

        Ok(vec![
            AuthHeader::ApiKey(self.anon_key.clone()),
            AuthHeader::Bearer(bearer),
        ])
    }

    fn auth_type(&self) -> &'static str {
        "Session access token"
    }
}
