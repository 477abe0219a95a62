//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Sign-in, registration and token-gated backend calls
//! - `cart` - Loading and saving the session cart
//! - `checkout` - Order payloads, quote submissions and payment options
//! - `flash` - One-shot toast messages

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod flash;
