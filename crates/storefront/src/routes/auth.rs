//! Authentication route handlers.
//!
//! Login and registration go through the backend; on success the profile
//! and bearer tokens are stored in the session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use nexgen_core::{
    FieldErrors,
    validation::{LoginInput, RegisterInput},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{PageContext, auth::safe_next, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Flash};
use crate::services::{auth::AuthService, checkout::reset_state, flash::set_flash};
use crate::state::AppState;

const WELCOME: &str = "Welcome back!";
const LOGGED_OUT: &str = "Logged out successfully";
const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the auth pages.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    /// Page to return to after signing in.
    pub next: Option<String>,
    /// Set when the shopper was signed out because their tokens expired.
    pub expired: Option<String>,
}

impl AuthQuery {
    fn next(&self) -> &str {
        safe_next(self.next.as_deref())
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub email: String,
    pub next: String,
    pub errors: FieldErrors,
    pub error: Option<String>,
    pub notice: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub full_name: String,
    pub company_name: String,
    pub email: String,
    pub next: String,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Start an authenticated session.
///
/// The session ID is rotated to prevent fixation.
async fn sign_in(session: &Session, user: &CurrentUser) -> Result<(), AppError> {
    session.cycle_id().await?;
    set_current_user(session, user).await?;
    set_sentry_user(&user.id, Some(&user.email));
    set_flash(session, Flash::success(WELCOME)).await;
    tracing::info!(user_id = %user.id, "Signed in");
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// `/auth` goes to the login page.
pub async fn index() -> Redirect {
    Redirect::to("/auth/login")
}

/// Display login page.
#[instrument(skip(page))]
pub async fn login_page(page: PageContext, Query(query): Query<AuthQuery>) -> impl IntoResponse {
    LoginTemplate {
        page,
        email: String::new(),
        next: query.next().to_string(),
        errors: FieldErrors::new(),
        error: None,
        notice: query.expired.is_some().then(|| SESSION_EXPIRED.to_string()),
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, page, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Query(query): Query<AuthQuery>,
    Form(form): Form<LoginInput>,
) -> Result<Response, AppError> {
    let render = |page, errors, error: Option<String>, email: String| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            LoginTemplate {
                page,
                email,
                next: query.next().to_string(),
                errors,
                error,
                notice: None,
            },
        )
            .into_response()
    };

    if let Err(errors) = form.validate() {
        return Ok(render(page, errors, None, form.email));
    }

    match AuthService::new(state.backend()).login(&form).await {
        Ok(user) => {
            sign_in(&session, &user).await?;
            Ok(Redirect::to(query.next()).into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            Ok(render(page, FieldErrors::new(), Some(e.user_message()), form.email))
        }
    }
}

/// Display registration page.
#[instrument(skip(page))]
pub async fn register_page(page: PageContext, Query(query): Query<AuthQuery>) -> impl IntoResponse {
    RegisterTemplate {
        page,
        full_name: String::new(),
        company_name: String::new(),
        email: String::new(),
        next: query.next().to_string(),
        errors: FieldErrors::new(),
        error: None,
    }
}

/// Handle registration form submission.
#[instrument(skip(state, session, page, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Query(query): Query<AuthQuery>,
    Form(form): Form<RegisterInput>,
) -> Result<Response, AppError> {
    let render = |page, errors, error: Option<String>| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            RegisterTemplate {
                page,
                full_name: form.full_name.clone(),
                company_name: form.company_name.clone().unwrap_or_default(),
                email: form.email.clone(),
                next: query.next().to_string(),
                errors,
                error,
            },
        )
            .into_response()
    };

    if let Err(errors) = form.validate() {
        return Ok(render(page, errors, None));
    }

    match AuthService::new(state.backend()).register(&form).await {
        Ok(user) => {
            sign_in(&session, &user).await?;
            Ok(Redirect::to(query.next()).into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            Ok(render(page, FieldErrors::new(), Some(e.user_message())))
        }
    }
}

/// Handle logout.
///
/// Only the sign-in is dropped; the cart stays with the browser session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    clear_current_user(&session).await?;
    reset_state(&session).await?;
    session.cycle_id().await?;
    clear_sentry_user();
    set_flash(&session, Flash::info(LOGGED_OUT)).await;
    Ok(Redirect::to("/auth"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_query_next_is_sanitized() {
        let query = AuthQuery {
            next: Some("//evil.example".to_string()),
            expired: None,
        };
        assert_eq!(query.next(), "/");

        let query = AuthQuery {
            next: Some("/checkout/details".to_string()),
            expired: Some("1".to_string()),
        };
        assert_eq!(query.next(), "/checkout/details");
    }
}
