//! Authentication module
//!
//! Provides the credentials attached to backend requests: the project anon
//! key for anonymous calls and the signed-in user's access token otherwise.

pub mod provider;
pub mod session;
pub mod token;

pub use provider::{AuthHeader, AuthProvider, BoxedAuthProvider};
pub use session::SessionAuthProvider;
pub use token::AnonKeyProvider;

use crate::config::BackendConfig;
use crate::error::AuthError;

/// Create an anon-key provider from configuration
pub fn create_auth_provider(config: &BackendConfig) -> Result<AnonKeyProvider, AuthError> {
    if let Some(key) = &config.anon_key {
        AnonKeyProvider::new(key.clone())
    } else {
        // Try environment variables
        AnonKeyProvider::from_env()
    }
}
