//! Checkout payloads and session state.
//!
//! Turns the cart and the validated checkout details into backend requests:
//! an [`OrderCreate`] for the fixed-price lines and one [`QuoteInput`] per
//! line that goes through a quote request. Also renders the options handed
//! to the payment dialog.

use nexgen_core::{
    Cart, CartLine, CheckoutError, CheckoutMode, to_minor_units,
    validation::{AddressInput, CheckoutDetails},
};
use serde::Serialize;
use tower_sessions::Session;

use crate::backend::{Address, BackendError, OrderCreate, OrderInit, OrderItem, QuoteInput};
use crate::config::CheckoutConfig;
use crate::models::{CheckoutState, keys};

/// Message attached to quote requests sent from checkout without a note.
pub const DEFAULT_QUOTE_MESSAGE: &str = "Quote requested at checkout";

/// Shown when a failure carries no backend message.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

// =============================================================================
// Session state
// =============================================================================

/// Load checkout progress; unreadable state starts over.
pub async fn load_state(session: &Session) -> CheckoutState {
    session
        .get::<CheckoutState>(keys::CHECKOUT)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Discarding unreadable checkout state");
            None
        })
        .unwrap_or_default()
}

/// Persist checkout progress.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_state(
    session: &Session,
    state: &CheckoutState,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CHECKOUT, state).await
}

/// Drop checkout progress (the flow finished or was abandoned).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn reset_state(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove_value(keys::CHECKOUT).await?;
    Ok(())
}

/// Send checkout back to the cart step, e.g. after the cart changed.
///
/// A gateway order already handed to the payment dialog survives, along with
/// the quote requests sent for it, so a late payment callback can still be
/// verified.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn restart_state(
    session: &Session,
) -> Result<CheckoutState, tower_sessions::session::Error> {
    let previous = load_state(session).await;
    if previous.pending_payment.is_none() {
        reset_state(session).await?;
        return Ok(CheckoutState::default());
    }

    let state = CheckoutState {
        pending_payment: previous.pending_payment,
        quotes_submitted: previous.quotes_submitted,
        ..CheckoutState::default()
    };
    save_state(session, &state).await?;
    Ok(state)
}

// =============================================================================
// Payloads
// =============================================================================

fn address(input: &AddressInput) -> Address {
    Address {
        address_line1: input.line1.trim().to_string(),
        address_line2: input.line2().map(String::from),
        city: input.city.trim().to_string(),
        state: input.state.trim().to_string(),
        pincode: input.pincode.trim().to_string(),
    }
}

/// Order for the cart's fixed-price lines.
///
/// # Errors
///
/// Returns `CheckoutError::NoPurchasableItems` when nothing can be paid for.
pub fn build_order(details: &CheckoutDetails, cart: &Cart) -> Result<OrderCreate, CheckoutError> {
    let items: Vec<OrderItem> = cart
        .fixed_lines()
        .map(|line| OrderItem {
            product_id: line.product.id,
            quantity: line.qty,
        })
        .collect();

    if items.is_empty() {
        return Err(CheckoutError::NoPurchasableItems);
    }

    Ok(OrderCreate {
        first_name: details.first_name.trim().to_string(),
        last_name: details.last_name.trim().to_string(),
        email: details.email.trim().to_string(),
        phone: details.phone.trim().to_string(),
        company_name: details.company().map(String::from),
        gstin: details.gstin().map(|g| g.to_ascii_uppercase()),
        billing_address: address(&details.billing),
        shipping_address: address(details.shipping_address()),
        items,
        save_info: details.save_info,
    })
}

/// Lines that become quote requests in the given mode.
///
/// Combined mode quotes everything; split mode only the price-on-request lines.
#[must_use]
pub fn quote_lines(cart: &Cart, mode: CheckoutMode) -> Vec<&CartLine> {
    match mode {
        CheckoutMode::Combined => cart.lines().iter().collect(),
        CheckoutMode::Split => cart.quote_lines().collect(),
    }
}

/// Quote request for one cart line.
#[must_use]
pub fn quote_request(details: &CheckoutDetails, line: &CartLine) -> QuoteInput {
    let mut message = details.notes().unwrap_or(DEFAULT_QUOTE_MESSAGE).to_string();
    if let Some(company) = details.company() {
        message.push_str(&format!("\nCompany: {company}"));
    }
    if let Some(gstin) = details.gstin() {
        message.push_str(&format!("\nGSTIN: {}", gstin.to_ascii_uppercase()));
    }

    QuoteInput {
        product_id: line.product.id,
        email: details.email.trim().to_string(),
        phone: Some(details.phone.trim().to_string()),
        quantity: line.qty,
        message: Some(message),
    }
}

// =============================================================================
// Payment dialog
// =============================================================================

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentPrefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentTheme {
    pub color: String,
}

/// Options for the Razorpay checkout dialog, serialized into the page.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentOptions {
    pub key: String,
    /// Amount in minor units (paise).
    pub amount: i64,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub order_id: String,
    pub prefill: PaymentPrefill,
    pub theme: PaymentTheme,
}

impl PaymentOptions {
    /// Build dialog options for a created order.
    ///
    /// Returns `None` if the amount cannot be expressed in minor units.
    #[must_use]
    pub fn new(
        order: &OrderInit,
        details: Option<&CheckoutDetails>,
        config: &CheckoutConfig,
    ) -> Option<Self> {
        let prefill = details.map_or_else(
            || PaymentPrefill {
                name: String::new(),
                email: String::new(),
                contact: String::new(),
            },
            |d| PaymentPrefill {
                name: d.full_name(),
                email: d.email.trim().to_string(),
                contact: d.phone.trim().to_string(),
            },
        );

        Some(Self {
            key: order.key_id.clone(),
            amount: to_minor_units(order.amount)?,
            currency: order.currency.clone(),
            name: config.merchant_name.clone(),
            description: format!("Order #{}", order.order_id),
            order_id: order.razorpay_order_id.clone(),
            prefill,
            theme: PaymentTheme {
                color: config.theme_color.clone(),
            },
        })
    }
}

/// Toast text for a failed order or quote submission.
#[must_use]
pub fn failure_message(err: &BackendError) -> String {
    match err {
        BackendError::Api { message, .. } => format!("Checkout failed: {message}"),
        BackendError::NotFound(_) => "Checkout failed: Not Found".to_string(),
        _ => GENERIC_FAILURE.to_string(),
    }
}
