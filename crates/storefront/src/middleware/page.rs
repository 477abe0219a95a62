//! Per-page layout data.
//!
//! Every full page renders the navigation bar (signed-in name, cart badge)
//! and any pending toast, so handlers take a [`PageContext`] instead of
//! reading those pieces from the session one by one.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use super::auth::current_user;
use super::csp::CspNonce;
use crate::models::Flash;
use crate::services::{cart::load_cart, flash::take_flash};

/// Layout data for the base template.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// CSP nonce for inline scripts.
    pub nonce: String,
    /// Name shown in the navigation bar when signed in.
    pub user_name: Option<String>,
    /// Number of distinct cart lines, for the badge.
    pub cart_count: usize,
    /// Toast to show on this page. Taking it removes it from the session.
    pub flash: Option<Flash>,
}

impl PageContext {
    /// Cart badge count, bound by value in `base.html`.
    #[must_use]
    pub const fn badge_count(&self) -> usize {
        self.cart_count
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(CspNonce(nonce)) = CspNonce::from_request_parts(parts, state).await;

        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            return Ok(Self {
                nonce,
                ..Self::default()
            });
        };

        let user_name = current_user(&session)
            .await
            .map(|user| user.display_name().to_string());

        Ok(Self {
            nonce,
            user_name,
            cart_count: load_cart(&session).await.line_count(),
            flash: take_flash(&session).await,
        })
    }
}
