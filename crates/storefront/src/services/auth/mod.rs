//! Authentication service.
//!
//! Accounts live in the backend; the storefront only keeps the shopper's
//! profile and bearer tokens in the session.

mod error;

pub use error::AuthError;

use std::future::Future;

use nexgen_core::validation::{LoginInput, RegisterInput};
use tower_sessions::Session;

use crate::backend::{BackendClient, BackendError, TokenPair, UserRegister};
use crate::error::{AppError, clear_sentry_user};
use crate::middleware::auth::{clear_current_user, set_current_user};
use crate::models::CurrentUser;

/// Authentication service.
///
/// Handles sign-in and registration against the backend.
pub struct AuthService<'a> {
    backend: &'a BackendClient,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(backend: &'a BackendClient) -> Self {
        Self { backend }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// The input must already be validated.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the backend rejects the pair.
    pub async fn login(&self, input: &LoginInput) -> Result<CurrentUser, AuthError> {
        let mut tokens = self
            .backend
            .obtain_token(input.email.trim(), &input.password)
            .await
            .map_err(|e| match e {
                BackendError::Unauthorized
                | BackendError::Api {
                    status: 400 | 401, ..
                } => AuthError::InvalidCredentials,
                other => AuthError::Backend(other),
            })?;

        let profile = self.backend.get_me(&mut tokens).await?;
        Ok(CurrentUser::from_profile(profile, tokens))
    }

    /// Create an account and sign straight in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` with the backend's message if the
    /// account cannot be created.
    pub async fn register(&self, input: &RegisterInput) -> Result<CurrentUser, AuthError> {
        let (first_name, last_name) = input.split_name();
        let request = UserRegister {
            email: input.email.trim().to_string(),
            password: input.password.clone(),
            first_name,
            last_name,
            company_name: input.company().map(String::from),
        };

        let response = self.backend.register(&request).await.map_err(|e| match e {
            BackendError::Api { message, .. } => AuthError::Rejected(message),
            other => AuthError::Backend(other),
        })?;

        let mut tokens = TokenPair::new(response.access, response.refresh);
        let profile = match response.user {
            Some(profile) => profile,
            None => self.backend.get_me(&mut tokens).await?,
        };
        Ok(CurrentUser::from_profile(profile, tokens))
    }
}

// =============================================================================
// Token-gated calls
// =============================================================================

/// Run a backend call with the shopper's tokens.
///
/// `call` receives a copy of the tokens and hands back the (possibly
/// refreshed) pair with its result. Refreshed tokens are stored on `user`
/// and written back to the session, so consecutive calls reuse them. If the
/// refresh failed the shopper is signed out and `AppError::SessionExpired`
/// is returned.
///
/// # Example
///
/// ```rust,ignore
/// let backend = state.backend();
/// let profile = authorized(&session, &mut user, |mut tokens| async move {
///     let result = backend.get_me(&mut tokens).await;
///     (tokens, result)
/// })
/// .await?;
/// ```
///
/// # Errors
///
/// Returns `AppError::SessionExpired`, or `AppError::Backend` for any other
/// backend failure.
pub async fn authorized<T, F, Fut>(
    session: &Session,
    user: &mut CurrentUser,
    call: F,
) -> Result<T, AppError>
where
    F: FnOnce(TokenPair) -> Fut,
    Fut: Future<Output = (TokenPair, Result<T, BackendError>)>,
{
    let (tokens, result) = call(user.tokens.clone()).await;
    settle(session, user, tokens, result).await
}

/// Persist refreshed tokens and translate an expired session.
///
/// # Errors
///
/// See [`authorized`].
pub async fn settle<T>(
    session: &Session,
    user: &mut CurrentUser,
    tokens: TokenPair,
    result: Result<T, BackendError>,
) -> Result<T, AppError> {
    match result {
        Err(BackendError::SessionExpired) => {
            tracing::info!(user_id = %user.id, "Session expired, signing out");
            clear_current_user(session).await?;
            clear_sentry_user();
            Err(AppError::SessionExpired)
        }
        result => {
            if tokens != user.tokens {
                tracing::debug!(user_id = %user.id, "Storing refreshed tokens");
                user.tokens = tokens;
                set_current_user(session, user).await?;
            }
            result.map_err(AppError::from)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use nexgen_core::UserId;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::middleware::auth::current_user;

    fn user() -> CurrentUser {
        CurrentUser {
            id: UserId::new(1),
            email: "buyer@example.com".to_string(),
            first_name: "Ravi".to_string(),
            last_name: "Kumar".to_string(),
            company_name: None,
            tokens: TokenPair::new("old-access", "old-refresh"),
        }
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_settle_stores_refreshed_tokens() {
        let session = session();
        let mut user = user();
        set_current_user(&session, &user).await.unwrap();

        let refreshed = TokenPair::new("new-access", "old-refresh");
        let value = settle(&session, &mut user, refreshed.clone(), Ok(7))
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(user.tokens, refreshed);
        assert_eq!(current_user(&session).await.unwrap().tokens, refreshed);
    }

    #[tokio::test]
    async fn test_settle_signs_out_on_expired_session() {
        let session = session();
        let mut user = user();
        set_current_user(&session, &user).await.unwrap();

        let tokens = user.tokens.clone();
        let result: Result<(), _> = settle(
            &session,
            &mut user,
            tokens,
            Err(BackendError::SessionExpired),
        )
        .await;

        assert!(matches!(result, Err(AppError::SessionExpired)));
        assert!(current_user(&session).await.is_none());
    }

    #[tokio::test]
    async fn test_authorized_passes_other_errors_through() {
        let session = session();
        let mut user = user();

        let result: Result<(), _> = authorized(&session, &mut user, |tokens| async move {
            (tokens, Err(BackendError::NotFound("/api/auth/me".to_string())))
        })
        .await;

        assert!(matches!(
            result,
            Err(AppError::Backend(BackendError::NotFound(_)))
        ));
    }

    #[test]
    fn test_auth_error_messages() {
        assert_eq!(
            AuthError::InvalidCredentials.user_message(),
            "Invalid email or password"
        );
        assert_eq!(
            AuthError::Rejected("Email already registered".to_string()).user_message(),
            "Email already registered"
        );
    }
}
