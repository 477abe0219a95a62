//! Field-level form validation.
//!
//! Each input type validates itself into a [`FieldErrors`] map keyed by form
//! field name, so templates can show the message next to the offending field.
//! Messages are the exact strings shown to shoppers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Email;

/// Validation errors keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error. The first error for a field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Error message for a field, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge errors from a nested form, prefixing field names (`billing.city`).
    pub fn merge_prefixed(&mut self, prefix: &str, other: Self) {
        for (field, message) in other.0 {
            self.add(format!("{prefix}.{field}"), message);
        }
    }

    /// `Ok(())` when empty, otherwise the errors.
    ///
    /// # Errors
    ///
    /// Returns `self` if any field failed validation.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Minimum password length for sign-in and sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 8;

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn check_email(errors: &mut FieldErrors, field: &str, email: &str) {
    if is_blank(email) {
        errors.add(field, "Email address is required");
    } else if Email::parse(email.trim()).is_err() {
        errors.add(field, "Please enter a valid email address");
    }
}

fn check_password(errors: &mut FieldErrors, password: &str) {
    if password.is_empty() {
        errors.add("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add("password", "Password must be at least 8 characters");
    }
}

fn check_required(errors: &mut FieldErrors, field: &str, value: &str, message: &str) {
    if is_blank(value) {
        errors.add(field, message);
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Authentication
// =============================================================================

/// Sign-in form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginInput {
    /// # Errors
    ///
    /// Returns the failing fields.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, "email", &self.email);
        check_password(&mut errors, &self.password);
        errors.into_result()
    }
}

/// Sign-up form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl RegisterInput {
    /// # Errors
    ///
    /// Returns the failing fields. Company name is optional.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_required(&mut errors, "full_name", &self.full_name, "Full name is required");
        check_email(&mut errors, "email", &self.email);
        check_password(&mut errors, &self.password);
        if self.confirm_password != self.password {
            errors.add("confirm_password", "Passwords do not match");
        }
        errors.into_result()
    }

    /// Split the full name into first and last name at the first whitespace.
    #[must_use]
    pub fn split_name(&self) -> (String, String) {
        let trimmed = self.full_name.trim();
        trimmed.split_once(char::is_whitespace).map_or_else(
            || (trimmed.to_string(), String::new()),
            |(first, last)| (first.to_string(), last.trim().to_string()),
        )
    }

    #[must_use]
    pub fn company(&self) -> Option<&str> {
        non_blank(self.company_name.as_deref())
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// A postal address on the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AddressInput {
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
}

impl AddressInput {
    /// # Errors
    ///
    /// Returns the failing fields, unprefixed.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_required(&mut errors, "line1", &self.line1, "Address is required");
        check_required(&mut errors, "city", &self.city, "City is required");
        check_required(&mut errors, "state", &self.state, "State is required");
        if is_blank(&self.pincode) {
            errors.add("pincode", "Pincode is required");
        } else if !is_pincode(self.pincode.trim()) {
            errors.add("pincode", "Pincode must be 6 digits");
        }
        errors.into_result()
    }

    #[must_use]
    pub fn line2(&self) -> Option<&str> {
        non_blank(self.line2.as_deref())
    }
}

/// Contact, tax and address details collected before an order or quote.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CheckoutDetails {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub gstin: Option<String>,
    #[serde(default)]
    pub billing: AddressInput,
    #[serde(default)]
    pub shipping: AddressInput,
    #[serde(default)]
    pub same_as_billing: bool,
    #[serde(default)]
    pub save_info: bool,
    /// Free-text note attached to quote requests.
    #[serde(default)]
    pub notes: Option<String>,
}

impl CheckoutDetails {
    /// # Errors
    ///
    /// Returns the failing fields; address errors are prefixed with
    /// `billing.` / `shipping.`.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_required(&mut errors, "first_name", &self.first_name, "First name is required");
        check_required(&mut errors, "last_name", &self.last_name, "Last name is required");
        check_email(&mut errors, "email", &self.email);
        if is_blank(&self.phone) {
            errors.add("phone", "Phone number is required");
        } else if !is_phone(&self.phone) {
            errors.add("phone", "Please enter a valid phone number");
        }
        if let Some(gstin) = self.gstin()
            && !is_gstin(gstin)
        {
            errors.add("gstin", "Please enter a valid GSTIN");
        }

        if let Err(billing) = self.billing.validate() {
            errors.merge_prefixed("billing", billing);
        }
        if !self.same_as_billing
            && let Err(shipping) = self.shipping.validate()
        {
            errors.merge_prefixed("shipping", shipping);
        }
        errors.into_result()
    }

    /// The address goods ship to.
    #[must_use]
    pub const fn shipping_address(&self) -> &AddressInput {
        if self.same_as_billing {
            &self.billing
        } else {
            &self.shipping
        }
    }

    #[must_use]
    pub fn company(&self) -> Option<&str> {
        non_blank(self.company_name.as_deref())
    }

    /// GSTIN, if one was entered.
    #[must_use]
    pub fn gstin(&self) -> Option<&str> {
        non_blank(self.gstin.as_deref())
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        non_blank(self.notes.as_deref())
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

// =============================================================================
// Quote requests
// =============================================================================

/// Request-a-quote form.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequestInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub message: Option<String>,
}

const fn default_quantity() -> i64 {
    1
}

impl Default for QuoteRequestInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            phone: None,
            quantity: default_quantity(),
            message: None,
        }
    }
}

impl QuoteRequestInput {
    /// # Errors
    ///
    /// Returns the failing fields. Phone and message are optional.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_required(&mut errors, "name", &self.name, "Full name is required");
        check_email(&mut errors, "email", &self.email);
        if let Some(phone) = self.phone()
            && !is_phone(phone)
        {
            errors.add("phone", "Please enter a valid phone number");
        }
        if self.quantity < 1 {
            errors.add("quantity", "Quantity must be at least 1");
        }
        errors.into_result()
    }

    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        non_blank(self.phone.as_deref())
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        non_blank(self.message.as_deref())
    }
}

// =============================================================================
// Field rules
// =============================================================================

/// Six-digit postal code.
#[must_use]
pub fn is_pincode(value: &str) -> bool {
    value.len() == 6 && value.bytes().all(|b| b.is_ascii_digit())
}

/// Ten-digit mobile number, optionally prefixed with `+91`, `91` or `0`.
/// Spaces and dashes are ignored.
#[must_use]
pub fn is_phone(value: &str) -> bool {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();
    let digits = cleaned
        .strip_prefix("+91")
        .or_else(|| (cleaned.len() == 12).then(|| cleaned.strip_prefix("91")).flatten())
        .or_else(|| (cleaned.len() == 11).then(|| cleaned.strip_prefix('0')).flatten())
        .unwrap_or(&cleaned);
    digits.len() == 10 && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Indian GSTIN layout: 2-digit state code, 10-char PAN, entity digit,
/// `Z`, and a checksum character. Case-insensitive.
#[must_use]
pub fn is_gstin(value: &str) -> bool {
    let upper = value.trim().to_ascii_uppercase();
    let bytes = upper.as_bytes();
    let [s1, s2, p @ .., entity, z, check] = bytes else {
        return false;
    };
    let [p1, p2, p3, p4, p5, p6, p7, p8, p9, p10] = p else {
        return false;
    };

    s1.is_ascii_digit()
        && s2.is_ascii_digit()
        && [p1, p2, p3, p4, p5].iter().all(|b| b.is_ascii_uppercase())
        && [p6, p7, p8, p9].iter().all(|b| b.is_ascii_digit())
        && p10.is_ascii_uppercase()
        && entity.is_ascii_alphanumeric()
        && *entity != b'0'
        && *z == b'Z'
        && check.is_ascii_alphanumeric()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> AddressInput {
        AddressInput {
            line1: "12 MG Road".to_string(),
            line2: None,
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560001".to_string(),
        }
    }

    fn details() -> CheckoutDetails {
        CheckoutDetails {
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: "+91 98765 43210".to_string(),
            billing: address(),
            same_as_billing: true,
            ..CheckoutDetails::default()
        }
    }

    #[test]
    fn test_login_messages() {
        let errors = LoginInput::default().validate().unwrap_err();
        assert_eq!(errors.get("email"), Some("Email address is required"));
        assert_eq!(errors.get("password"), Some("Password is required"));

        let errors = LoginInput {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("email"), Some("Please enter a valid email address"));
        assert_eq!(
            errors.get("password"),
            Some("Password must be at least 8 characters")
        );
    }

    #[test]
    fn test_login_valid() {
        let input = LoginInput {
            email: "buyer@example.com".to_string(),
            password: "correct-horse".to_string(),
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_register_requires_name_and_matching_passwords() {
        let input = RegisterInput {
            full_name: "  ".to_string(),
            company_name: None,
            email: "buyer@example.com".to_string(),
            password: "password123".to_string(),
            confirm_password: "password124".to_string(),
        };
        let errors = input.validate().unwrap_err();

        assert_eq!(errors.get("full_name"), Some("Full name is required"));
        assert_eq!(errors.get("confirm_password"), Some("Passwords do not match"));
        assert!(!errors.has("company_name"));
    }

    #[test]
    fn test_register_split_name() {
        let mut input = RegisterInput {
            full_name: " Asha  Devi Rao ".to_string(),
            ..RegisterInput::default()
        };
        assert_eq!(
            input.split_name(),
            ("Asha".to_string(), "Devi Rao".to_string())
        );

        input.full_name = "Cher".to_string();
        assert_eq!(input.split_name(), ("Cher".to_string(), String::new()));
    }

    #[test]
    fn test_checkout_details_valid() {
        assert!(details().validate().is_ok());
    }

    #[test]
    fn test_checkout_details_prefixes_address_errors() {
        let mut input = details();
        input.same_as_billing = false;
        input.billing.pincode = "5600".to_string();

        let errors = input.validate().unwrap_err();
        assert_eq!(errors.get("billing.pincode"), Some("Pincode must be 6 digits"));
        assert_eq!(errors.get("shipping.line1"), Some("Address is required"));
        assert_eq!(errors.get("shipping.pincode"), Some("Pincode is required"));
    }

    #[test]
    fn test_shipping_address_follows_same_as_billing() {
        let mut input = details();
        assert_eq!(input.shipping_address(), &input.billing);

        input.same_as_billing = false;
        input.shipping.city = "Mysuru".to_string();
        assert_eq!(input.shipping_address().city, "Mysuru");
    }

    #[test]
    fn test_checkout_rejects_bad_gstin() {
        let mut input = details();
        input.gstin = Some("12345".to_string());
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.get("gstin"), Some("Please enter a valid GSTIN"));

        input.gstin = Some("  ".to_string());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_quote_request_rules() {
        let input = QuoteRequestInput {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            phone: Some("12".to_string()),
            quantity: 0,
            message: None,
        };
        let errors = input.validate().unwrap_err();

        assert_eq!(errors.get("phone"), Some("Please enter a valid phone number"));
        assert_eq!(errors.get("quantity"), Some("Quantity must be at least 1"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_quote_request_optional_fields() {
        let input = QuoteRequestInput {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            phone: Some(String::new()),
            ..QuoteRequestInput::default()
        };
        assert!(input.validate().is_ok());
        assert_eq!(input.phone(), None);
    }

    #[test]
    fn test_phone_rule() {
        assert!(is_phone("9876543210"));
        assert!(is_phone("+91 98765-43210"));
        assert!(is_phone("919876543210"));
        assert!(is_phone("09876543210"));
        assert!(!is_phone("98765"));
        assert!(!is_phone("98765abcde"));
    }

    #[test]
    fn test_pincode_rule() {
        assert!(is_pincode("560001"));
        assert!(!is_pincode("56000"));
        assert!(!is_pincode("56000a"));
    }

    #[test]
    fn test_gstin_rule() {
        assert!(is_gstin("29ABCDE1234F1Z5"));
        assert!(is_gstin("29abcde1234f1z5"));
        assert!(!is_gstin("29ABCDE1234F1X5"));
        assert!(!is_gstin("29ABCDE1234F0Z5"));
        assert!(!is_gstin("29ABCDE1234F1Z"));
    }
}
