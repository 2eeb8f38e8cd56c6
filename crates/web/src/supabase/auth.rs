//! Auth API (`GoTrue`) operations.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use super::{Caller, SupabaseClient, SupabaseError};

/// A user as returned by the auth API.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    /// Full name stored at sign-up, if any.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        self.user_metadata
            .get("full_name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_owned)
    }
}

/// Tokens for a signed-in user.
#[derive(Debug)]
pub struct AuthSession {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

/// Raw token response; only built into [`AuthSession`] once validated.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: Option<AuthUser>,
}

impl TokenResponse {
    fn into_session(self) -> Option<AuthSession> {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(|| Utc::now() + Duration::seconds(self.expires_in.unwrap_or(3600)));
        Some(AuthSession {
            access_token: SecretString::from(self.access_token?),
            refresh_token: SecretString::from(self.refresh_token?),
            expires_at,
            user: self.user?,
        })
    }
}

/// Result of a sign-up.
#[derive(Debug)]
pub enum SignUpOutcome {
    /// Email confirmation is disabled; the user is signed in.
    SignedIn(AuthSession),
    /// The backend sent a confirmation email; no session yet.
    ConfirmationRequired { user_id: Option<Uuid> },
}

impl SupabaseClient {
    fn auth_url(&self, path: &str) -> String {
        self.url(&format!("/auth/v1{path}"))
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError::InvalidCredentials`] for a wrong email or
    /// password, or another error if the request fails.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, SupabaseError> {
        let request = self
            .inner
            .client
            .post(self.auth_url("/token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password.expose_secret() }));
        let response = self.authorize(request, Caller::Anon)?.send().await?;
        let tokens: TokenResponse = Self::handle_response(response).await?;
        tokens
            .into_session()
            .ok_or_else(|| SupabaseError::Parse("token response without session".to_string()))
    }

    /// Create an account. The full name is stored in user metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the sign-up (for example an
    /// already registered email or a weak password).
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        full_name: &str,
    ) -> Result<SignUpOutcome, SupabaseError> {
        let request = self.inner.client.post(self.auth_url("/signup")).json(&json!({
            "email": email,
            "password": password.expose_secret(),
            "data": { "full_name": full_name },
        }));
        let response = self.authorize(request, Caller::Anon)?.send().await?;
        let body: serde_json::Value = Self::handle_response(response).await?;

        let user_id = body
            .get("id")
            .or_else(|| body.get("user").and_then(|u| u.get("id")))
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok());

        let tokens: TokenResponse = serde_json::from_value(body)
            .map_err(|e| SupabaseError::Parse(e.to_string()))?;
        Ok(tokens.into_session().map_or(
            SignUpOutcome::ConfirmationRequired { user_id },
            SignUpOutcome::SignedIn,
        ))
    }

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token is revoked or expired.
    #[instrument(skip_all)]
    pub async fn refresh_session(
        &self,
        refresh_token: &SecretString,
    ) -> Result<AuthSession, SupabaseError> {
        let request = self
            .inner
            .client
            .post(self.auth_url("/token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token.expose_secret() }));
        let response = self.authorize(request, Caller::Anon)?.send().await?;
        let tokens: TokenResponse = Self::handle_response(response).await?;
        tokens
            .into_session()
            .ok_or_else(|| SupabaseError::Unauthorized("refresh returned no session".to_string()))
    }

    /// Revoke the user's session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &SecretString) -> Result<(), SupabaseError> {
        let request = self.inner.client.post(self.auth_url("/logout"));
        let response = self
            .authorize(request, Caller::User(access_token))?
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// Fetch the user owning `access_token`.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError::Unauthorized`] if the token is invalid.
    #[instrument(skip_all)]
    pub async fn get_user(&self, access_token: &SecretString) -> Result<AuthUser, SupabaseError> {
        let request = self.inner.client.get(self.auth_url("/user"));
        let response = self
            .authorize(request, Caller::User(access_token))?
            .send()
            .await?;
        Self::handle_response(response).await
    }
}
