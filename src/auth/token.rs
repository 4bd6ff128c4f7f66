//! Anonymous project-key authentication
//!
//! Used for auth-service calls (sign-in, refresh, logout) and for table
//! requests made before anyone has signed in.

use crate::auth::provider::{AuthHeader, AuthProvider};
use crate::error::AuthError;
use crate::util::SecretString;
use async_trait::async_trait;

/// Project anon-key authentication provider
#[derive(Debug, Clone)]
pub struct AnonKeyProvider {
    key: SecretString,
}

impl AnonKeyProvider {
    /// Create a new anon-key provider
    pub fn new(key: impl Into<String>) -> Result<Self, AuthError> {
        let key = key.into();

        if key.trim().is_empty() {
            return Err(AuthError::InvalidKey);
        }

        Ok(Self {
            key: SecretString::new(key),
        })
    }

    /// Create from environment variable
    ///
    /// Checks SUPABASE_ANON_KEY, then SUPABASE_KEY.
    pub fn from_env() -> Result<Self, AuthError> {
        for var in &["SUPABASE_ANON_KEY", "SUPABASE_KEY"] {
            if let Ok(key) = std::env::var(var)
                && !key.is_empty()
            {
                return Self::new(key);
            }
        }

        Err(AuthError::NotConfigured)
    }

    /// The raw project key
    pub fn key(&self) -> &SecretString {
        &self.key
    }
}

#[async_trait]
impl AuthProvider for AnonKeyProvider {
    async fn get_auth_headers(&self) -> Result<Vec<AuthHeader>, AuthError> {
        Ok(vec![
            AuthHeader::ApiKey(self.key.clone()),
            AuthHeader::Bearer(self.key.clone()),
        ])
    }

    fn auth_type(&self) -> &'static str {
        "Anon key"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anon_key_provider_new() {
        let provider = AnonKeyProvider::new("anon-xxxx").unwrap();
        assert_eq!(provider.key().expose_secret(), "anon-xxxx");
    }

    #[test]
    fn test_anon_key_provider_empty_key() {
        let result = AnonKeyProvider::new("  ");
        assert!(matches!(result.unwrap_err(), AuthError::InvalidKey));
    }

    #[tokio::test]
    async fn test_anon_key_headers() {
        let provider = AnonKeyProvider::new("test-key").unwrap();
        let headers = provider.get_auth_headers().await.unwrap();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].header_name(), "apikey");
        assert_eq!(headers[0].header_value(), "test-key");
        assert_eq!(headers[1].header_name(), "Authorization");
        assert_eq!(headers[1].header_value(), "Bearer test-key");
    }
}
