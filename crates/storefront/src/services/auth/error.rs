//! Authentication error types.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors that can occur during sign-in and registration.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The backend refused the registration (e.g. email already in use).
    #[error("registration rejected: {0}")]
    Rejected(String),

    /// Backend call failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl AuthError {
    /// Message shown on the form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::Rejected(message) => message.clone(),
            Self::Backend(_) => "Something went wrong. Please try again.".to_string(),
        }
    }
}
