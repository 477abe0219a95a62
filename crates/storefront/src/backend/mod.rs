//! Client for the catalogue, account and order REST API.
//!
//! # Architecture
//!
//! - Plain JSON over `reqwest`; every endpoint has a typed method on
//!   [`BackendClient`]
//! - The backend is the source of truth - no local sync, direct API calls
//! - Product listings and details are cached in memory via `moka`
//! - Bearer-authenticated calls go through [`BackendClient::call_authorized`],
//!   which refreshes an expired access token once and retries
//!
//! # Endpoints
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | GET  | `/api/products/` | - |
//! | GET  | `/api/products/{id}` | - |
//! | POST | `/api/auth/register` | - |
//! | POST | `/api/token/pair` | - |
//! | POST | `/api/token/refresh` | - |
//! | GET  | `/api/auth/me` | bearer |
//! | POST | `/api/quotes/request` | bearer |
//! | POST | `/api/order/initiate` | bearer |
//! | GET  | `/api/order/my-addresses` | bearer |
//! | POST | `/api/order/verify` | bearer |
//!
//! # Example
//!
//! ```rust,ignore
//! use nexgen_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(&config.backend)?;
//! let products = client.list_products().await?;
//!
//! let mut tokens = user.tokens.clone();
//! let profile = client.get_me(&mut tokens).await?;
//! if tokens != user.tokens {
//!     // persist the refreshed tokens
//! }
//! ```

mod cache;
mod client;
pub mod types;

pub use client::BackendClient;
pub use types::*;

use thiserror::Error;

/// Path of the token refresh endpoint. Requests to it never trigger a refresh.
pub const TOKEN_REFRESH_PATH: &str = "/api/token/refresh";

/// Placeholder shown for products without an image.
pub const PLACEHOLDER_IMAGE: &str = "/static/images/placeholder.svg";

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The access token was rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The backend rejected the request.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The refresh token is missing or was rejected; the user must sign in again.
    #[error("Session expired")]
    SessionExpired,
}

impl BackendError {
    /// Message suitable for showing to the shopper, if the backend gave one.
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Resolve a product image path to a URL the browser can load.
///
/// Missing paths use the local placeholder, absolute URLs pass through, and
/// anything else is served from the backend.
#[must_use]
pub fn media_url(api_url: &str, path: Option<&str>) -> String {
    match path.map(str::trim).filter(|p| !p.is_empty()) {
        None => PLACEHOLDER_IMAGE.to_string(),
        Some(p) if p.starts_with("http://") || p.starts_with("https://") => p.to_string(),
        Some(p) if p.starts_with('/') => format!("{api_url}{p}"),
        Some(p) => format!("{api_url}/{p}"),
    }
}

/// Pull a human-readable message out of an error body.
///
/// Looks for `message`, then `detail` (string, or list of `{msg}` objects).
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    if let Some(message) = value.get("message").and_then(serde_json::Value::as_str) {
        return Some(message.to_string());
    }

    match value.get("detail")? {
        serde_json::Value::String(detail) => Some(detail.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}
