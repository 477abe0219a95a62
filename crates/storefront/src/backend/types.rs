//! Request and response schemas for the backend REST API.
//!
//! Field names follow the backend's JSON exactly; conversions into cart and
//! view types live alongside the schema they start from.

use std::collections::BTreeMap;

use nexgen_core::{
    AddressId, CartProduct, OrderId, PriceType, ProductId, QuoteId, UserId, format_price,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Catalogue
// =============================================================================

/// A catalogue product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    /// "Software" or "Hardware".
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Unit price; absent for quote-only products.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price_type: PriceType,
    /// Image paths, relative to the backend or absolute URLs.
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub specs: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub reviews: Option<u32>,
}

impl Product {
    /// URL key: `"<id>-<slug>"`, or just the id when there is no slug.
    #[must_use]
    pub fn url_key(&self) -> String {
        if self.slug.is_empty() {
            self.id.to_string()
        } else {
            format!("{}-{}", self.id, self.slug)
        }
    }

    /// Canonical detail page path.
    #[must_use]
    pub fn path(&self) -> String {
        format!("/product/{}", self.url_key())
    }

    #[must_use]
    pub fn first_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    #[must_use]
    pub const fn is_quote(&self) -> bool {
        self.price_type.is_quote()
    }

    #[must_use]
    pub fn is_software(&self) -> bool {
        self.category.eq_ignore_ascii_case("software")
    }

    /// Price label for cards and detail pages.
    #[must_use]
    pub fn price_label(&self) -> String {
        if self.is_quote() {
            "Price on request".to_string()
        } else {
            format_price(self.price)
        }
    }

    /// Specification table rows with values rendered as text.
    #[must_use]
    pub fn spec_rows(&self) -> Vec<(String, String)> {
        self.specs
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key.clone(), text)
            })
            .collect()
    }

    /// Snapshot stored in the cart.
    #[must_use]
    pub fn to_cart_product(&self) -> CartProduct {
        CartProduct {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            category: self.category.clone(),
            price: self.price,
            price_type: self.price_type,
            image: self.first_image().map(str::to_string),
        }
    }
}

// =============================================================================
// Accounts & tokens
// =============================================================================

/// The signed-in user's profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(default)]
    pub company_name: Option<String>,
}

impl UserProfile {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Sign-up payload.
#[derive(Debug, Clone, Serialize)]
pub struct UserRegister {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

/// Sign-up response: fresh tokens and, usually, the new profile.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access: String,
    pub refresh: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPairRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenRefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Refresh response. `refresh` is only present when the backend rotates it.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Access and refresh token for one signed-in user.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

impl TokenPair {
    #[must_use]
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: Some(refresh.into()),
        }
    }

    /// Apply a refresh response, keeping the old refresh token unless rotated.
    #[must_use]
    pub fn refreshed(&self, response: TokenRefreshResponse) -> Self {
        Self {
            access: response.access,
            refresh: response.refresh.or_else(|| self.refresh.clone()),
        }
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"[REDACTED]")
            .field("refresh", &self.refresh.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// =============================================================================
// Quotes
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct QuoteInput {
    pub product_id: ProductId,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteSuccess {
    #[serde(default)]
    pub id: Option<QuoteId>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Orders & payment
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderCreate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub company_name: Option<String>,
    pub gstin: Option<String>,
    pub billing_address: Address,
    pub shipping_address: Address,
    pub items: Vec<OrderItem>,
    pub save_info: bool,
}

/// A created order awaiting payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderInit {
    pub order_id: OrderId,
    pub razorpay_order_id: String,
    /// Order total in the currency's standard unit.
    pub amount: Decimal,
    pub currency: String,
    /// Public gateway key.
    pub key_id: String,
}

/// Gateway callback fields forwarded for signature verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentVerify {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// An address saved on the user's account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedAddress {
    pub id: AddressId,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default)]
    pub address_type: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl SavedAddress {
    /// Single-line rendering for lists.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.address_line1.as_str()];
        if let Some(line2) = self.address_line2.as_deref().filter(|l| !l.trim().is_empty()) {
            parts.push(line2);
        }
        parts.extend([self.city.as_str(), self.state.as_str(), self.pincode.as_str()]);
        parts.join(", ")
    }
}
