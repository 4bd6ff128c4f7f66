//! Authentication provider trait
//!
//! Every backend request carries the project key in an `apikey` header and a
//! bearer token that the gateway turns into a database role. Anonymous
//! requests use the project key as the bearer; signed-in requests use the
//! session's access token so row-level policies see the caller's identity.

use crate::error::AuthError;
use crate::util::SecretString;
// async_trait required for dyn-compatibility with Box<dyn AuthProvider>
use async_trait::async_trait;

/// Authentication provider trait
///
/// Implementations supply the headers attached to each backend request.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Headers to attach to the next request
    async fn get_auth_headers(&self) -> Result<Vec<AuthHeader>, AuthError>;

    /// Get a description of the auth method (for logging)
    fn auth_type(&self) -> &'static str;
}

/// Authentication header to use with requests
#[derive(Debug, Clone)]
pub enum AuthHeader {
    /// Project key, sent on every request
    ApiKey(SecretString),
    /// Bearer token (session access token or the project key)
    Bearer(SecretString),
}

impl AuthHeader {
    /// Get the header name for this auth type
    pub fn header_name(&self) -> &'static str {
        match self {
            AuthHeader::ApiKey(_) => "apikey",
            AuthHeader::Bearer(_) => "Authorization",
        }
    }

    /// Get the header value for this auth type
    pub fn header_value(&self) -> String {
        match self {
            AuthHeader::ApiKey(key) => key.expose_secret().to_string(),
            AuthHeader::Bearer(token) => format!("Bearer {}", token.expose_secret()),
        }
    }
}

/// Box type alias for auth providers
pub type BoxedAuthProvider = Box<dyn AuthProvider>;
