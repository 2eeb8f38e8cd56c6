//! Authentication extractors.
//!
//! The signed-in user lives in the session as [`CurrentUser`], including the
//! backend access token. [`RequireUser`] refreshes that token shortly before
//! it expires so long dashboard sessions keep working.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use bizgrow_core::AdminRole;
use chrono::Utc;
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;
use crate::supabase::{AdminUser, Caller, Query, SupabaseError, tables};

/// Login page the dashboard redirects to.
pub const LOGIN_PATH: &str = "/auth?mode=login";

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn overview(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name())
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Error returned when a page needs a user (or an admin) it does not have.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for JSON requests).
    Unauthorized,
    /// Signed in, but not an admin.
    NotAdmin,
    /// The role lookup itself failed.
    Backend(SupabaseError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required").into_response(),
            Self::Backend(e) => AppError::from(e).into_response(),
        }
    }
}

fn missing_user(parts: &Parts) -> AuthRejection {
    let path = parts.uri.path();
    if path.starts_with("/api/") || path.ends_with(".json") {
        AuthRejection::Unauthorized
    } else {
        AuthRejection::RedirectToLogin
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unauthorized)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| missing_user(parts))?;

        if !user.needs_refresh(Utc::now()) {
            return Ok(Self(user));
        }

        match state.supabase().refresh_session(&user.refresh_token).await {
            Ok(auth) => {
                debug!(user_id = %user.id, "Refreshed access token");
                let refreshed = CurrentUser::from(auth);
                if let Err(e) = set_current_user(&session, &refreshed).await {
                    warn!(error = %e, "Failed to store refreshed session");
                }
                Ok(Self(refreshed))
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Token refresh failed, signing out");
                if let Err(e) = clear_current_user(&session).await {
                    warn!(error = %e, "Failed to clear expired session");
                }
                Err(missing_user(parts))
            }
        }
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike [`RequireUser`], this never rejects and never refreshes tokens.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Extractor for the admin console: a signed-in user with an `admin_users` row.
pub struct RequireAdmin {
    pub user: CurrentUser,
    pub role: AdminRole,
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;

        let admin: Result<Option<AdminUser>, _> = state
            .supabase()
            .select_one(
                Caller::User(&user.access_token),
                tables::ADMIN_USERS,
                Query::new().eq("user_id", user.id),
            )
            .await;

        match admin {
            Ok(Some(admin)) => Ok(Self {
                user,
                role: admin.role,
            }),
            Ok(None) => {
                debug!(user_id = %user.id, "Not an admin");
                Err(AuthRejection::NotAdmin)
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Admin role lookup failed");
                Err(AuthRejection::Backend(e))
            }
        }
    }
}

/// Store the signed-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Start a fresh session for a user who just signed in.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_in_session(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    set_current_user(session, user).await
}

/// Clear the signed-in user (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
