//! Session-related types.
//!
//! Types stored in the session for authentication, cart and checkout state.

use nexgen_core::{CheckoutFlow, OrderId, UserId, validation::CheckoutDetails};
use serde::{Deserialize, Serialize};

use crate::backend::{OrderInit, TokenPair, UserProfile};

/// Session-stored user identity and backend tokens.
///
/// `Debug` never prints tokens (see [`TokenPair`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    /// Backend user ID.
    pub id: UserId,
    /// User's email address.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub company_name: Option<String>,
    /// Bearer tokens for backend calls made on the user's behalf.
    pub tokens: TokenPair,
}

impl CurrentUser {
    #[must_use]
    pub fn from_profile(profile: UserProfile, tokens: TokenPair) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            company_name: profile.company_name,
            tokens,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Name for the navigation bar: first name, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        let first = self.first_name.trim();
        if first.is_empty() { &self.email } else { first }
    }
}

/// Toast style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    /// CSS modifier used by the toast partial.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }
}

/// Summary shown on the success page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedCheckout {
    /// Paid order, if the checkout included a payment.
    pub order_id: Option<OrderId>,
    /// Number of quote requests submitted.
    pub quotes_submitted: usize,
}

/// The visitor's checkout progress.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutState {
    pub flow: CheckoutFlow,
    /// Details from the last valid form submission, used to prefill and for
    /// the payment dialog.
    #[serde(default)]
    pub details: Option<CheckoutDetails>,
    /// Gateway order awaiting payment.
    #[serde(default)]
    pub pending_payment: Option<OrderInit>,
    /// Quote requests already sent during this checkout.
    #[serde(default)]
    pub quotes_submitted: usize,
    #[serde(default)]
    pub completed: Option<CompletedCheckout>,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the cart lines.
    pub const CART: &str = "cart";

    /// Key for checkout progress.
    pub const CHECKOUT: &str = "checkout";

    /// Key for the pending one-shot message.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user() -> CurrentUser {
        CurrentUser {
            id: UserId::new(5),
            email: "asha@example.com".to_string(),
            first_name: "Asha".to_string(),
            last_name: String::new(),
            company_name: None,
            tokens: TokenPair::new("access-value", "refresh-value"),
        }
    }

    #[test]
    fn test_current_user_debug_hides_tokens() {
        let debug = format!("{:?}", user());
        assert!(debug.contains("asha@example.com"));
        assert!(!debug.contains("access-value"));
        assert!(!debug.contains("refresh-value"));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut user = user();
        assert_eq!(user.display_name(), "Asha");
        assert_eq!(user.full_name(), "Asha");

        user.first_name = " ".to_string();
        assert_eq!(user.display_name(), "asha@example.com");
    }

    #[test]
    fn test_current_user_session_round_trip_keeps_tokens() {
        let json = serde_json::to_value(user()).unwrap();
        let back: CurrentUser = serde_json::from_value(json).unwrap();
        assert_eq!(back.tokens.access, "access-value");
    }

    #[test]
    fn test_flash_kind_serializes_lowercase() {
        let json = serde_json::to_string(&Flash::info("Logged out successfully")).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"info","message":"Logged out successfully"}"#
        );
    }
}
