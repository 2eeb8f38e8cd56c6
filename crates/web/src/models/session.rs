//! Session-related types.
//!
//! Types stored in the session for authentication state.

use bizgrow_core::UserId;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::supabase::AuthSession;

/// Refresh the access token when it expires within this window.
const REFRESH_MARGIN_SECONDS: i64 = 60;

/// Session-stored user identity and backend tokens.
///
/// The access token is forwarded on every dashboard request so the backend's
/// row-level security scopes reads and writes to this user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Backend user ID.
    pub id: UserId,
    /// Email address used to sign in.
    pub email: String,
    /// Name given at sign-up.
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(with = "secret")]
    pub access_token: SecretString,
    #[serde(with = "secret")]
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl CurrentUser {
    /// Name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }

    /// Whether the access token is expired or about to expire.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= Duration::seconds(REFRESH_MARGIN_SECONDS)
    }
}

impl From<AuthSession> for CurrentUser {
    fn from(session: AuthSession) -> Self {
        let full_name = session.user.full_name();
        Self {
            id: UserId::from(session.user.id),
            email: session.user.email.unwrap_or_default(),
            full_name,
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_at: session.expires_at,
        }
    }
}

/// Serde helpers for tokens kept in the server-side session record.
mod secret {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::from)
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
