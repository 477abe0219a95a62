//! NexGen Core - storefront domain library.
//!
//! This crate holds the parts of the storefront that are plain logic:
//! - `storefront` - server-rendered shop (uses every module here)
//! - `cli` - operator tooling
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no sessions,
//! no HTTP clients. The storefront loads a [`Cart`] and a [`CheckoutFlow`]
//! from the session, mutates them here, and writes them back.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails and prices
//! - [`cart`] - Cart lines, quantity reconciliation and totals
//! - [`checkout`] - The checkout wizard state machine
//! - [`validation`] - Field-level form validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod types;
pub mod validation;

pub use cart::{Cart, CartLine, CartProduct, PriceType};
pub use checkout::{CheckoutError, CheckoutFlow, CheckoutMode, CheckoutStep};
pub use types::*;
pub use validation::FieldErrors;
