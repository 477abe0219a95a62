//! Session cart persistence.
//!
//! The cart is stored under [`keys::CART`] as a JSON array of lines. It is
//! written back after every mutation; a record that cannot be read loads as
//! an empty cart.

use nexgen_core::Cart;
use tower_sessions::Session;

use crate::models::keys;

/// Load the visitor's cart.
pub async fn load_cart(session: &Session) -> Cart {
    let raw = match session.get::<serde_json::Value>(keys::CART).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return Cart::new(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read cart from session");
            return Cart::new();
        }
    };

    serde_json::from_value(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Discarding unreadable cart");
        Cart::new()
    })
}

/// Persist the cart. An empty cart removes the record.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    if cart.is_empty() {
        session.remove_value(keys::CART).await?;
        return Ok(());
    }
    session.insert(keys::CART, cart).await
}
