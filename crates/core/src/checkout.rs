//! Checkout wizard state machine.
//!
//! ```text
//!            proceed (mixed cart)          choose_mode
//!   Cart ───────────────────────► Decision ───────────► Form
//!     │                                                  ▲ │
//!     └──────── proceed (fixed-only / quote-only) ───────┘ │
//!                                                          │ start_payment (Split)
//!                                          complete        ▼
//!   Success ◄──────────────────────────────────────── Payment
//!      ▲
//!      └── complete (Combined, straight from Form)
//! ```
//!
//! `back()` walks one step towards `Cart`; `reset()` jumps there.
//! `confirm_payment()` jumps to `Success` once the gateway has taken payment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::Cart;

/// Where the shopper is in the checkout wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    #[default]
    Cart,
    Decision,
    Form,
    Payment,
    Success,
}

impl CheckoutStep {
    /// Lowercase name used in logs and URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Decision => "decision",
            Self::Form => "form",
            Self::Payment => "payment",
            Self::Success => "success",
        }
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a cart is checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    /// Every line becomes part of a quote request.
    #[default]
    Combined,
    /// Fixed-price lines are paid online; quote lines become quote requests.
    Split,
}

impl CheckoutMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Combined => "combined",
            Self::Split => "split",
        }
    }
}

/// Errors raised by invalid checkout transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// Checkout was started with nothing in the cart.
    #[error("Your cart is empty.")]
    EmptyCart,

    /// A split checkout has nothing that can be paid for.
    #[error("Your cart contains no purchasable items.")]
    NoPurchasableItems,

    /// The requested action is not allowed from the current step.
    #[error("cannot {action} from the {from} step")]
    InvalidTransition {
        from: CheckoutStep,
        action: &'static str,
    },
}

/// The checkout wizard for one shopper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CheckoutFlow {
    step: CheckoutStep,
    mode: CheckoutMode,
    /// Whether the decision step was shown, so `back()` can return to it.
    decided: bool,
}

impl CheckoutFlow {
    /// A fresh flow sitting on the cart step.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            step: CheckoutStep::Cart,
            mode: CheckoutMode::Combined,
            decided: false,
        }
    }

    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    #[must_use]
    pub const fn mode(&self) -> CheckoutMode {
        self.mode
    }

    /// Leave the cart step.
    ///
    /// A cart mixing fixed and quote items asks the shopper how to proceed;
    /// any other cart goes straight to the form in the only mode that fits.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart` for an empty cart and `InvalidTransition` unless
    /// the flow is on the cart step.
    pub fn proceed(&mut self, cart: &Cart) -> Result<CheckoutStep, CheckoutError> {
        if self.step != CheckoutStep::Cart {
            return Err(self.invalid("proceed"));
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        if cart.has_mixed_items() {
            self.step = CheckoutStep::Decision;
            self.decided = true;
        } else {
            self.mode = if cart.fixed_items_count() > 0 {
                CheckoutMode::Split
            } else {
                CheckoutMode::Combined
            };
            self.step = CheckoutStep::Form;
            self.decided = false;
        }
        Ok(self.step)
    }

    /// Pick combined or split checkout on the decision step.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the flow is on the decision step.
    pub fn choose_mode(&mut self, mode: CheckoutMode) -> Result<CheckoutStep, CheckoutError> {
        if self.step != CheckoutStep::Decision {
            return Err(self.invalid("choose a checkout mode"));
        }
        self.mode = mode;
        self.step = CheckoutStep::Form;
        Ok(self.step)
    }

    /// Move from the submitted form to online payment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the flow is on the form step in
    /// split mode.
    pub fn start_payment(&mut self) -> Result<CheckoutStep, CheckoutError> {
        if self.step != CheckoutStep::Form || self.mode != CheckoutMode::Split {
            return Err(self.invalid("start payment"));
        }
        self.step = CheckoutStep::Payment;
        Ok(self.step)
    }

    /// Finish checkout.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the flow is on the payment step, or
    /// on the form step in combined mode.
    pub fn complete(&mut self) -> Result<CheckoutStep, CheckoutError> {
        let allowed = match self.step {
            CheckoutStep::Payment => true,
            CheckoutStep::Form => self.mode == CheckoutMode::Combined,
            _ => false,
        };
        if !allowed {
            return Err(self.invalid("complete checkout"));
        }
        self.step = CheckoutStep::Success;
        Ok(self.step)
    }

    /// Finish a split checkout whose payment the gateway has confirmed.
    ///
    /// Lands on `Success` from any step: the gateway callback can arrive
    /// after the shopper left the payment step, e.g. by editing the cart.
    pub const fn confirm_payment(&mut self) -> CheckoutStep {
        self.mode = CheckoutMode::Split;
        self.step = CheckoutStep::Success;
        self.step
    }

    /// Step back one screen.
    pub fn back(&mut self) -> CheckoutStep {
        self.step = match self.step {
            CheckoutStep::Cart | CheckoutStep::Decision | CheckoutStep::Success => {
                CheckoutStep::Cart
            }
            CheckoutStep::Form if self.decided => CheckoutStep::Decision,
            CheckoutStep::Form => CheckoutStep::Cart,
            CheckoutStep::Payment => CheckoutStep::Form,
        };
        self.step
    }

    /// Return to the cart step with default settings.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    const fn invalid(&self, action: &'static str) -> CheckoutError {
        CheckoutError::InvalidTransition {
            from: self.step,
            action,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::cart::{CartProduct, PriceType};
    use crate::types::ProductId;

    fn item(id: i64, price_type: PriceType) -> CartProduct {
        CartProduct {
            id: ProductId::new(id),
            name: format!("Item {id}"),
            slug: String::new(),
            category: "Hardware".to_string(),
            price: Some(Decimal::new(100, 0)),
            price_type,
            image: None,
        }
    }

    fn cart_with(types: &[PriceType]) -> Cart {
        let mut cart = Cart::new();
        for (id, price_type) in (1..).zip(types) {
            cart.add(item(id, *price_type), 1);
        }
        cart
    }

    #[test]
    fn test_proceed_empty_cart() {
        let mut flow = CheckoutFlow::new();
        assert_eq!(flow.proceed(&Cart::new()), Err(CheckoutError::EmptyCart));
        assert_eq!(flow.step(), CheckoutStep::Cart);
    }

    #[test]
    fn test_proceed_fixed_only_goes_to_split_form() {
        let mut flow = CheckoutFlow::new();
        let step = flow.proceed(&cart_with(&[PriceType::Fixed])).unwrap();

        assert_eq!(step, CheckoutStep::Form);
        assert_eq!(flow.mode(), CheckoutMode::Split);
    }

    #[test]
    fn test_proceed_quote_only_goes_to_combined_form() {
        let mut flow = CheckoutFlow::new();
        flow.proceed(&cart_with(&[PriceType::Quote])).unwrap();

        assert_eq!(flow.step(), CheckoutStep::Form);
        assert_eq!(flow.mode(), CheckoutMode::Combined);
    }

    #[test]
    fn test_mixed_cart_asks_for_decision() {
        let mut flow = CheckoutFlow::new();
        let cart = cart_with(&[PriceType::Fixed, PriceType::Quote]);

        assert_eq!(flow.proceed(&cart).unwrap(), CheckoutStep::Decision);
        assert_eq!(
            flow.choose_mode(CheckoutMode::Split).unwrap(),
            CheckoutStep::Form
        );
        assert_eq!(flow.mode(), CheckoutMode::Split);
        assert_eq!(flow.back(), CheckoutStep::Decision);
        assert_eq!(flow.back(), CheckoutStep::Cart);
    }

    #[test]
    fn test_split_checkout_runs_through_payment() {
        let mut flow = CheckoutFlow::new();
        flow.proceed(&cart_with(&[PriceType::Fixed])).unwrap();

        assert!(flow.complete().is_err());
        assert_eq!(flow.start_payment().unwrap(), CheckoutStep::Payment);
        assert_eq!(flow.back(), CheckoutStep::Form);
        flow.start_payment().unwrap();
        assert_eq!(flow.complete().unwrap(), CheckoutStep::Success);
    }

    #[test]
    fn test_combined_checkout_completes_from_form() {
        let mut flow = CheckoutFlow::new();
        flow.proceed(&cart_with(&[PriceType::Quote])).unwrap();

        assert!(flow.start_payment().is_err());
        assert_eq!(flow.complete().unwrap(), CheckoutStep::Success);
        assert_eq!(flow.back(), CheckoutStep::Cart);
    }

    #[test]
    fn test_choose_mode_outside_decision() {
        let mut flow = CheckoutFlow::new();
        let err = flow.choose_mode(CheckoutMode::Split).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot choose a checkout mode from the cart step"
        );
    }

    #[test]
    fn test_proceed_rejected_after_payment_started() {
        let mut flow = CheckoutFlow::new();
        let cart = cart_with(&[PriceType::Fixed]);
        flow.proceed(&cart).unwrap();
        flow.start_payment().unwrap();

        assert!(matches!(
            flow.proceed(&cart),
            Err(CheckoutError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_proceed_only_from_cart_step() {
        let mut flow = CheckoutFlow::new();
        let cart = cart_with(&[PriceType::Fixed, PriceType::Quote]);
        flow.proceed(&cart).unwrap();
        assert_eq!(
            flow.proceed(&cart).unwrap_err().to_string(),
            "cannot proceed from the decision step"
        );

        flow.choose_mode(CheckoutMode::Combined).unwrap();
        assert!(flow.proceed(&cart).is_err());
        assert_eq!(flow.step(), CheckoutStep::Form);
        assert_eq!(flow.mode(), CheckoutMode::Combined);
    }

    #[test]
    fn test_confirm_payment_from_any_step() {
        let mut flow = CheckoutFlow::new();
        assert_eq!(flow.confirm_payment(), CheckoutStep::Success);
        assert_eq!(flow.mode(), CheckoutMode::Split);

        let mut flow = CheckoutFlow::new();
        flow.proceed(&cart_with(&[PriceType::Fixed])).unwrap();
        flow.start_payment().unwrap();
        assert_eq!(flow.confirm_payment(), CheckoutStep::Success);
    }

    #[test]
    fn test_reset() {
        let mut flow = CheckoutFlow::new();
        flow.proceed(&cart_with(&[PriceType::Fixed])).unwrap();
        flow.reset();
        assert_eq!(flow, CheckoutFlow::new());
    }
}
