//! Authentication route handlers.
//!
//! One page serves both the sign-in and sign-up forms (`/auth?mode=`).
//! Credentials go straight to the hosted auth API; on success the returned
//! tokens are stored in the server-side session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use bizgrow_core::Email;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalUser, clear_current_user, sign_in_session};
use crate::models::{CurrentUser, session_keys};
use crate::routes::{Toast, message_for, redirect_error, redirect_success};
use crate::state::AppState;
use crate::supabase::{Caller, Profile, SignUpOutcome, SupabaseError, tables};

const MIN_PASSWORD_LEN: usize = 8;

/// Which form the auth page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

impl AuthMode {
    const fn path(self) -> &'static str {
        match self {
            Self::Login => "/auth?mode=login",
            Self::Signup => "/auth?mode=signup",
        }
    }
}

/// Query parameters of the auth page.
#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    #[serde(default)]
    pub mode: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl AuthQuery {
    fn mode(&self) -> AuthMode {
        match self.mode.as_deref() {
            Some("signup") => AuthMode::Signup,
            _ => AuthMode::Login,
        }
    }
}

/// Sign-in form data. No `Debug`: it carries a password.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Sign-up form data.
#[derive(Deserialize)]
pub struct SignupForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Auth page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth.html")]
pub struct AuthTemplate {
    pub toast: Option<Toast>,
    pub signed_in: bool,
    pub signup: bool,
}

/// Display the sign-in or sign-up form.
///
/// Signed-in users are sent to the dashboard.
#[instrument(skip(user))]
pub async fn auth_page(
    OptionalUser(user): OptionalUser,
    Query(query): Query<AuthQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/dashboard").into_response();
    }

    let toast = query
        .error
        .as_deref()
        .map(|code| Toast::error(message_for(code)))
        .or_else(|| {
            query
                .success
                .as_deref()
                .map(|code| Toast::success(message_for(code)))
        });

    AuthTemplate {
        toast,
        signed_in: false,
        signup: query.mode() == AuthMode::Signup,
    }
    .into_response()
}

/// Handle sign-in.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let back = AuthMode::Login.path();
    let Ok(email) = Email::parse(&form.email) else {
        return redirect_error(back, "invalid_email").into_response();
    };

    match state
        .supabase()
        .sign_in_with_password(email.as_str(), &SecretString::from(form.password))
        .await
    {
        Ok(auth) => start_session(&session, CurrentUser::from(auth)).await,
        Err(SupabaseError::InvalidCredentials) => {
            info!("Sign-in rejected");
            redirect_error(back, "invalid_credentials").into_response()
        }
        Err(e) => {
            warn!(error = %e, "Sign-in failed");
            redirect_error(back, "signin_failed").into_response()
        }
    }
}

/// Handle sign-up.
///
/// Creates the auth user and its `profiles` row. When the backend requires
/// email confirmation no session comes back; the visitor is sent to the
/// sign-in form with a "check your email" notice.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Response {
    let back = AuthMode::Signup.path();
    let Ok(email) = Email::parse(&form.email) else {
        return redirect_error(back, "invalid_email").into_response();
    };
    let full_name = form.full_name.trim();
    if full_name.is_empty() {
        return redirect_error(back, "name_required").into_response();
    }
    if let Some(code) = password_problem(&form.password, &form.password_confirm) {
        return redirect_error(back, code).into_response();
    }
    let password = SecretString::from(form.password);

    match state
        .supabase()
        .sign_up(email.as_str(), &password, full_name)
        .await
    {
        Ok(SignUpOutcome::SignedIn(auth)) => {
            let user = CurrentUser::from(auth);
            create_profile(&state, &user).await;
            start_session(&session, user).await
        }
        Ok(SignUpOutcome::ConfirmationRequired { user_id }) => {
            debug!(?user_id, "Sign-up awaiting email confirmation");
            redirect_success(AuthMode::Login.path(), "check_email").into_response()
        }
        Err(e) => {
            warn!(error = %e, "Sign-up failed");
            redirect_error(back, "signup_failed").into_response()
        }
    }
}

/// Handle sign-out: revoke the token (best effort) and flush the session.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Ok(Some(user)) = session.get::<CurrentUser>(session_keys::CURRENT_USER).await {
        if let Err(e) = state.supabase().sign_out(&user.access_token).await {
            warn!(error = %e, "Failed to revoke backend session");
        }
    }

    if let Err(e) = clear_current_user(&session).await {
        error!(error = %e, "Failed to clear session");
    }
    clear_sentry_user();

    redirect_success("/", "signed_out").into_response()
}

fn password_problem(password: &str, confirm: &str) -> Option<&'static str> {
    if password != confirm {
        return Some("password_mismatch");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Some("password_too_short");
    }
    None
}

async fn create_profile(state: &AppState, user: &CurrentUser) {
    let row = json!({
        "id": user.id,
        "email": user.email,
        "full_name": user.full_name,
    });
    let created: Result<Vec<Profile>, _> = state
        .supabase()
        .insert(Caller::User(&user.access_token), tables::PROFILES, &row)
        .await;
    if let Err(e) = created {
        // A database trigger may already have created it.
        warn!(user_id = %user.id, error = %e, "Profile insert failed");
    }
}

async fn start_session(session: &Session, user: CurrentUser) -> Response {
    if let Err(e) = sign_in_session(session, &user).await {
        error!(error = %e, "Failed to store session");
        return redirect_error(AuthMode::Login.path(), "signin_failed").into_response();
    }
    set_sentry_user(&user.id, Some(&user.email));
    info!(user_id = %user.id, "Signed in");
    Redirect::to("/dashboard").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_defaults_to_login() {
        let query = AuthQuery {
            mode: Some("something".to_string()),
            error: None,
            success: None,
        };
        assert_eq!(query.mode(), AuthMode::Login);
        let query = AuthQuery {
            mode: Some("signup".to_string()),
            error: None,
            success: None,
        };
        assert_eq!(query.mode(), AuthMode::Signup);
    }

    #[test]
    fn test_password_checks() {
        assert_eq!(
            password_problem("longenough", "different1"),
            Some("password_mismatch")
        );
        assert_eq!(
            password_problem("short", "short"),
            Some("password_too_short")
        );
        assert_eq!(
            password_problem("longenough", "longenough"),
            None
        );
    }
}
