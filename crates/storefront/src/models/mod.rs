//! Session-backed models for the storefront.
//!
//! Everything here is serialized into the `tower-sessions` record for the
//! visitor; the backend remains the source of truth for accounts, products
//! and orders.

pub mod session;

pub use crate::backend::TokenPair;
pub use session::{CheckoutState, CompletedCheckout, CurrentUser, Flash, FlashKind, keys};
