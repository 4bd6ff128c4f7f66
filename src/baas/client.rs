//! BaaS REST client
//!
//! Typed HTTP client for the table endpoints (`/rest/v1`) and the auth
//! endpoints (`/auth/v1`) of a hosted Postgres/auth project.

use crate::auth::{AuthHeader, BoxedAuthProvider};
use crate::baas::query::Query;
use crate::config::BackendConfig;
use crate::error::{StoreError, StoreResult};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Prefer header asking PostgREST to echo the affected rows
const RETURN_REPRESENTATION: &str = "return=representation";

/// Upper bound on the delay between retries
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Exponential backoff before retry `attempt` (1-based): 100ms, 200ms, 400ms, ...
fn backoff(attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(100u64.saturating_mul(factor)).min(MAX_BACKOFF)
}

/// BaaS API client
pub struct BaasClient {
    http: Client,
    base_url: String,
    auth: BoxedAuthProvider,
    max_retries: u32,
}

impl BaasClient {
    /// Create a new client from configuration
    pub fn new(config: &BackendConfig, auth: BoxedAuthProvider) -> StoreResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .user_agent(format!("classgate/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StoreError::Request)?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            auth,
            max_retries: config.max_retries,
        })
    }

    /// Build a URL for an endpoint below the project root
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn table_path(table: &str, query: &Query) -> String {
        format!("/rest/v1/{}{}", table, query.build())
    }

    /// Add authentication to a request
    async fn authenticate(&self, request: RequestBuilder) -> StoreResult<RequestBuilder> {
        self.authenticate_with(request, None).await
    }

    /// Add authentication, optionally replacing the provider's bearer token
    async fn authenticate_with(
        &self,
        request: RequestBuilder,
        bearer: Option<&str>,
    ) -> StoreResult<RequestBuilder> {
        let headers = self.auth.get_auth_headers().await.map_err(|e| StoreError::Api {
            status: 401,
            message: e.to_string(),
        })?;

        let request = headers
            .iter()
            .filter(|h| bearer.is_none() || !matches!(h, AuthHeader::Bearer(_)))
            .fold(request, |req, h| req.header(h.header_name(), h.header_value()));

        Ok(match bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    /// Execute a request, retrying transient failures up to `retries` times
    async fn execute(&self, request: RequestBuilder, retries: u32) -> StoreResult<Response> {
        let mut last_error = None;

        for attempt in 0..=retries {
            if attempt > 0 {
                tokio::time::sleep(backoff(attempt)).await;
                debug!("Retrying request (attempt {})", attempt + 1);
            }

            let req = request
                .try_clone()
                .ok_or_else(|| StoreError::InvalidResponse("Cannot clone request".to_string()))?;

            let error = match req.send().await {
                Ok(response) => match self.handle_response(response).await {
                    Ok(response) => return Ok(response),
                    Err(e) => e,
                },
                Err(e) => {
                    warn!("Request failed: {}", e);
                    StoreError::Request(e)
                }
            };

            let retryable = error.is_transient();
            last_error = Some(error);
            if !retryable {
                break;
            }
        }

        Err(last_error.unwrap_or_else(|| StoreError::InvalidResponse("Unknown error".to_string())))
    }

    /// Handle API response
    async fn handle_response(&self, response: Response) -> StoreResult<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(StoreError::RateLimited { retry_after });
        }

        let body = response.text().await.unwrap_or_default();
        Err(StoreError::from_response(status.as_u16(), &body))
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
        response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    /// Make a GET request (retried on transient failures)
    #[instrument(skip(self), fields(endpoint = %endpoint))]
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> StoreResult<T> {
        let request = self.http.get(self.url(endpoint));
        let request = self.authenticate(request).await?;

        let response = self.execute(request, self.max_retries).await?;
        Self::parse(response).await
    }

    /// Make a POST request (never retried)
    #[instrument(skip(self, body), fields(endpoint = %endpoint))]
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> StoreResult<T> {
        let request = self.http.post(self.url(endpoint)).json(body);
        let request = self.authenticate(request).await?;

        let response = self.execute(request, 0).await?;
        Self::parse(response).await
    }

    /// POST with an explicit bearer token instead of the provider's
    pub async fn post_as<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        bearer: &str,
        body: &B,
    ) -> StoreResult<()> {
        let request = self.http.post(self.url(endpoint)).json(body);
        let request = self.authenticate_with(request, Some(bearer)).await?;

        self.execute(request, 0).await?;
        Ok(())
    }

    /// Read rows from a table
    pub async fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> StoreResult<Vec<T>> {
        self.get(&Self::table_path(table, query)).await
    }

    /// Insert rows, returning them as stored
    #[instrument(skip(self, body), fields(table = %table))]
    pub async fn insert<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        table: &str,
        body: &B,
    ) -> StoreResult<Vec<T>> {
        let url = self.url(&Self::table_path(table, &Query::new()));
        let request = self
            .http
            .post(url)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(body);
        let request = self.authenticate(request).await?;

        let response = self.execute(request, 0).await?;
        Self::parse(response).await
    }

    /// Update the rows matching `filter`, returning them as stored
    #[instrument(skip(self, filter, body), fields(table = %table))]
    pub async fn update<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        table: &str,
        filter: &Query,
        body: &B,
    ) -> StoreResult<Vec<T>> {
        let url = self.url(&Self::table_path(table, filter));
        let request = self
            .http
            .patch(url)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(body);
        let request = self.authenticate(request).await?;

        let response = self.execute(request, 0).await?;
        Self::parse(response).await
    }

    /// Delete the rows matching `filter`
    #[instrument(skip(self, filter), fields(table = %table))]
    pub async fn delete(&self, table: &str, filter: &Query) -> StoreResult<()> {
        let url = self.url(&Self::table_path(table, filter));
        let request = self.http.delete(url);
        let request = self.authenticate(request).await?;

        self.execute(request, 0).await?;
        Ok(())
    }
}
