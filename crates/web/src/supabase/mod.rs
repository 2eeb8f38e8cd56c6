//! Client for the hosted Supabase backend.
//!
//! # Architecture
//!
//! - Supabase is the source of truth - no local copies of business data
//! - Data API (`PostgREST`) for table reads and writes, filtered per store
//! - Auth API (`GoTrue`) for sign-up, sign-in, refresh and sign-out
//! - Storage API for product and logo images
//! - Edge functions for AI product detection
//! - In-memory caching via `moka` for public catalogue reads (60 second TTL)
//!
//! Requests run as a [`Caller`]: the anonymous role, a signed-in user (so the
//! backend's row-level security applies), or the service role for CLI jobs.
//!
//! # Example
//!
//! ```rust,ignore
//! use bizgrow_web::supabase::{Caller, Query, SupabaseClient, tables};
//!
//! let client = SupabaseClient::new(&config.supabase)?;
//! let products: Vec<Product> = client
//!     .select(
//!         Caller::User(&user.access_token),
//!         tables::PRODUCTS,
//!         &Query::new().eq("store_id", store.id).order("created_at", false),
//!     )
//!     .await?;
//! ```

mod auth;
mod cache;
mod functions;
mod query;
mod rest;
mod storage;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::SupabaseConfig;

pub use auth::{AuthSession, AuthUser, SignUpOutcome};
pub use cache::{CacheKey, CacheValue};
pub use query::Query;
pub use storage::extension_for;
pub use types::*;

/// Table names of the hosted schema.
pub mod tables {
    pub const STORES: &str = "stores";
    pub const PRODUCTS: &str = "products";
    pub const ORDERS: &str = "orders";
    pub const CUSTOMERS: &str = "customers";
    pub const PROFILES: &str = "profiles";
    pub const ADMIN_USERS: &str = "admin_users";
}

/// Message the auth API returns for a wrong email or password.
const INVALID_LOGIN_MESSAGE: &str = "Invalid login credentials";

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Token missing, expired or rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response body could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Email or password rejected by the auth API.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// Operation needs a key that is not configured.
    #[error("Missing credentials: {0}")]
    MissingCredentials(&'static str),
}

impl SupabaseError {
    /// Whether the error means the caller's session is no longer valid.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Identity a request is made as.
#[derive(Clone, Copy)]
pub enum Caller<'a> {
    /// Public anonymous role (storefront reads, checkout inserts).
    Anon,
    /// Signed-in user; row-level security scopes what they can touch.
    User(&'a SecretString),
    /// Service role (CLI jobs); bypasses row-level security.
    Service,
}

/// Client for the Supabase APIs.
///
/// Cheap to clone. Public catalogue reads are cached for 60 seconds.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    service_role_key: Option<SecretString>,
    storage_bucket: String,
    detect_function: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl SupabaseClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the anon key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.anon_key.expose_secret())
                .map_err(|e| SupabaseError::Parse(format!("Invalid anon key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(60))
            .build();

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                client,
                base_url: config.url.trim_end_matches('/').to_string(),
                anon_key: config.anon_key.clone(),
                service_role_key: config.service_role_key.clone(),
                storage_bucket: config.storage_bucket.clone(),
                detect_function: config.detect_function.clone(),
                cache,
            }),
        })
    }

    /// Bucket used for image uploads.
    #[must_use]
    pub fn storage_bucket(&self) -> &str {
        &self.inner.storage_bucket
    }

    /// Name of the AI detection edge function.
    #[must_use]
    pub fn detect_function(&self) -> &str {
        &self.inner.detect_function
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Attach the bearer token for `caller` to a request.
    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        caller: Caller<'_>,
    ) -> Result<reqwest::RequestBuilder, SupabaseError> {
        let token = match caller {
            Caller::Anon => self.inner.anon_key.expose_secret(),
            Caller::User(token) => token.expose_secret(),
            Caller::Service => {
                let key = self
                    .inner
                    .service_role_key
                    .as_ref()
                    .ok_or(SupabaseError::MissingCredentials("SUPABASE_SERVICE_ROLE_KEY"))?;
                // The service role key must replace the anon key as `apikey` too
                return Ok(request
                    .header("apikey", key.expose_secret())
                    .bearer_auth(key.expose_secret()));
            }
        };
        Ok(request.bearer_auth(token))
    }

    /// Check status and decode a JSON body.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SupabaseError> {
        let response = Self::check_status(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse Supabase response"
            );
            SupabaseError::Parse(e.to_string())
        })
    }

    /// Map non-success statuses to errors, passing successful responses through.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SupabaseError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(SupabaseError::RateLimited(retry_after));
        }

        let body = response.text().await.unwrap_or_default();
        Err(parse_error(status.as_u16(), &body))
    }
}

/// Turn an error body into a [`SupabaseError`].
///
/// The services disagree on the field carrying the message (`msg`, `message`,
/// `error_description`, `error`), so all are tried in that order.
fn parse_error(status: u16, body: &str) -> SupabaseError {
    let message = extract_message(body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            format!("HTTP {status}")
        } else {
            body.chars().take(200).collect()
        }
    });

    if message.contains(INVALID_LOGIN_MESSAGE) {
        return SupabaseError::InvalidCredentials;
    }

    match status {
        401 | 403 => SupabaseError::Unauthorized(message),
        404 | 406 => SupabaseError::NotFound(message),
        _ => SupabaseError::Api { status, message },
    }
}

fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_invalid_login_from_gotrue() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert!(matches!(
            parse_error(400, body),
            SupabaseError::InvalidCredentials
        ));
    }

    #[test]
    fn test_parse_error_invalid_login_new_shape() {
        let body = r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#;
        assert!(matches!(
            parse_error(400, body),
            SupabaseError::InvalidCredentials
        ));
    }

    #[test]
    fn test_parse_error_postgrest_message() {
        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint","details":null}"#;
        match parse_error(409, body) {
            SupabaseError::Api { status, message } => {
                assert_eq!(status, 409);
                assert!(message.starts_with("duplicate key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_status_mapping() {
        assert!(matches!(
            parse_error(401, r#"{"message":"JWT expired"}"#),
            SupabaseError::Unauthorized(_)
        ));
        assert!(matches!(parse_error(404, ""), SupabaseError::NotFound(_)));
    }

    #[test]
    fn test_parse_error_plain_text_body() {
        match parse_error(500, "upstream exploded") {
            SupabaseError::Api { message, .. } => assert_eq!(message, "upstream exploded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
