//! Checkout route handlers.
//!
//! The wizard state ([`CheckoutState`]) lives in the session next to the
//! cart. Each page checks that the shopper is on its step and otherwise
//! redirects to the page for the step they are actually on.
//!
//! ```text
//! GET  /checkout            proceed from the cart
//! GET  /checkout/decision   combined vs split (mixed carts only)
//! GET  /checkout/details    contact, tax and address form
//! GET  /checkout/payment    payment dialog (split mode)
//! POST /checkout/verify     gateway callback fields
//! GET  /checkout/success    confirmation
//! ```

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use nexgen_core::{
    Cart, CheckoutMode, CheckoutStep, FieldErrors, format_price,
    validation::{AddressInput, CheckoutDetails},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::cart::CartView;
use crate::backend::{BackendClient, PaymentVerify, SavedAddress};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, PageContext, RequireAuth, auth::login_url};
use crate::models::{CheckoutState, CompletedCheckout, CurrentUser, Flash};
use crate::services::{
    auth::authorized,
    cart::{load_cart, save_cart},
    checkout::{
        PaymentOptions, build_order, failure_message, load_state, quote_lines, quote_request,
        reset_state, restart_state, save_state,
    },
    flash::set_flash,
};
use crate::state::AppState;

/// Page for each wizard step.
#[must_use]
pub const fn step_path(step: CheckoutStep) -> &'static str {
    match step {
        CheckoutStep::Cart => "/cart",
        CheckoutStep::Decision => "/checkout/decision",
        CheckoutStep::Form => "/checkout/details",
        CheckoutStep::Payment => "/checkout/payment",
        CheckoutStep::Success => "/checkout/success",
    }
}

const LOGIN_REQUIRED: &str = "You must be logged in to checkout";
const QUOTE_RECEIVED: &str = "Quote request received!";
const QUOTE_FAILED: &str = "Failed to submit request. Please try again.";
const PAYMENT_SUCCESSFUL: &str = "Payment Successful!";
const VERIFICATION_FAILED: &str = "Payment verification failed. Please contact support.";

// =============================================================================
// Form Types
// =============================================================================

/// Combined vs split choice.
#[derive(Debug, Deserialize)]
pub struct DecisionForm {
    pub mode: CheckoutMode,
}

/// Flat checkout form as posted by the browser (and used to refill it).
///
/// Checkboxes are present only when ticked.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub company_name: String,
    pub gstin: String,
    pub billing_line1: String,
    pub billing_line2: String,
    pub billing_city: String,
    pub billing_state: String,
    pub billing_pincode: String,
    pub shipping_line1: String,
    pub shipping_line2: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_pincode: String,
    pub same_as_billing: Option<String>,
    pub save_info: Option<String>,
    pub notes: String,
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl CheckoutForm {
    #[must_use]
    pub const fn same_as_billing(&self) -> bool {
        self.same_as_billing.is_some()
    }

    #[must_use]
    pub const fn save_info(&self) -> bool {
        self.save_info.is_some()
    }

    /// Prefill for a signed-in shopper: profile plus their default address.
    fn for_user(user: &CurrentUser, address: Option<&SavedAddress>) -> Self {
        let mut form = Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            company_name: user.company_name.clone().unwrap_or_default(),
            same_as_billing: Some("on".to_string()),
            save_info: Some("on".to_string()),
            ..Self::default()
        };
        if let Some(address) = address {
            form.billing_line1.clone_from(&address.address_line1);
            form.billing_line2 = address.address_line2.clone().unwrap_or_default();
            form.billing_city.clone_from(&address.city);
            form.billing_state.clone_from(&address.state);
            form.billing_pincode.clone_from(&address.pincode);
        }
        form
    }
}

impl From<&CheckoutForm> for CheckoutDetails {
    fn from(form: &CheckoutForm) -> Self {
        Self {
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone: form.phone.trim().to_string(),
            company_name: optional(&form.company_name),
            gstin: optional(&form.gstin),
            billing: AddressInput {
                line1: form.billing_line1.clone(),
                line2: optional(&form.billing_line2),
                city: form.billing_city.clone(),
                state: form.billing_state.clone(),
                pincode: form.billing_pincode.clone(),
            },
            shipping: AddressInput {
                line1: form.shipping_line1.clone(),
                line2: optional(&form.shipping_line2),
                city: form.shipping_city.clone(),
                state: form.shipping_state.clone(),
                pincode: form.shipping_pincode.clone(),
            },
            same_as_billing: form.same_as_billing(),
            save_info: form.save_info(),
            notes: optional(&form.notes),
        }
    }
}

impl From<&CheckoutDetails> for CheckoutForm {
    fn from(details: &CheckoutDetails) -> Self {
        let flag = |on: bool| on.then(|| "on".to_string());
        Self {
            first_name: details.first_name.clone(),
            last_name: details.last_name.clone(),
            email: details.email.clone(),
            phone: details.phone.clone(),
            company_name: details.company_name.clone().unwrap_or_default(),
            gstin: details.gstin.clone().unwrap_or_default(),
            billing_line1: details.billing.line1.clone(),
            billing_line2: details.billing.line2.clone().unwrap_or_default(),
            billing_city: details.billing.city.clone(),
            billing_state: details.billing.state.clone(),
            billing_pincode: details.billing.pincode.clone(),
            shipping_line1: details.shipping.line1.clone(),
            shipping_line2: details.shipping.line2.clone().unwrap_or_default(),
            shipping_city: details.shipping.city.clone(),
            shipping_state: details.shipping.state.clone(),
            shipping_pincode: details.shipping.pincode.clone(),
            same_as_billing: flag(details.same_as_billing),
            save_info: flag(details.save_info),
            notes: details.notes.clone().unwrap_or_default(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Combined vs split decision page.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/decision.html")]
pub struct DecisionTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Checkout details form.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/form.html")]
pub struct CheckoutFormTemplate {
    pub page: PageContext,
    pub cart: CartView,
    pub mode: CheckoutMode,
    pub form: CheckoutForm,
    pub errors: FieldErrors,
    /// Quote requests already sent by an earlier, partly failed attempt.
    pub quotes_submitted: usize,
}

impl CheckoutFormTemplate {
    /// Whether submitting takes the shopper to the payment dialog.
    #[must_use]
    pub fn pays_online(&self) -> bool {
        self.mode == CheckoutMode::Split
    }
}

/// Payment page; `checkout.js` opens the gateway dialog from `options_json`.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub page: PageContext,
    pub order_label: String,
    pub amount: String,
    pub currency: String,
    pub options_json: String,
    pub quotes_submitted: usize,
}

/// Confirmation page.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct SuccessTemplate {
    pub page: PageContext,
    pub completed: CompletedCheckout,
}

// =============================================================================
// Helpers
// =============================================================================

/// Redirect to the page for the shopper's actual step.
fn to_current_step(state: &CheckoutState) -> Response {
    Redirect::to(step_path(state.flow.step())).into_response()
}

/// Send a signed-out shopper to the login page, returning to `next`.
async fn login_first(session: &Session, next: &str) -> Response {
    set_flash(session, Flash::error(LOGIN_REQUIRED)).await;
    Redirect::to(&login_url(next)).into_response()
}

/// Default saved address, if the backend has one for the shopper.
///
/// Failures other than an expired session only lose the prefill.
async fn default_address(
    backend: &BackendClient,
    session: &Session,
    user: &mut CurrentUser,
) -> Result<Option<SavedAddress>, AppError> {
    let result = authorized(session, user, |mut tokens| async move {
        let result = backend.my_addresses(&mut tokens).await;
        (tokens, result)
    })
    .await;

    match result {
        Ok(addresses) => {
            let default = addresses.iter().position(|a| a.is_default).unwrap_or(0);
            Ok(addresses.into_iter().nth(default))
        }
        Err(AppError::Backend(e)) => {
            tracing::warn!(error = %e, "Could not load saved addresses");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Submit a quote request for each line, removing each accepted line from
/// the cart. Stops at the first failure.
///
/// Returns the number of accepted requests; on failure, alongside the error.
async fn submit_quotes(
    backend: &BackendClient,
    session: &Session,
    user: &mut CurrentUser,
    details: &CheckoutDetails,
    cart: &mut Cart,
    mode: CheckoutMode,
) -> Result<usize, (usize, AppError)> {
    let requests: Vec<_> = quote_lines(cart, mode)
        .into_iter()
        .map(|line| quote_request(details, line))
        .collect();

    let mut submitted = 0;
    for request in requests {
        let product_id = request.product_id;
        let result = authorized(session, user, |mut tokens| async move {
            let result = backend.create_quote_request(&mut tokens, &request).await;
            (tokens, result)
        })
        .await;

        match result {
            Ok(_) => {
                cart.remove(product_id);
                submitted += 1;
            }
            Err(e) => {
                save_cart(session, cart)
                    .await
                    .map_err(|err| (submitted, err.into()))?;
                return Err((submitted, e));
            }
        }
    }

    save_cart(session, cart)
        .await
        .map_err(|err| (submitted, err.into()))?;
    Ok(submitted)
}

// =============================================================================
// Handlers
// =============================================================================

/// Proceed from the cart: to the decision page for mixed carts, otherwise
/// straight to the details form.
#[instrument(skip(session))]
pub async fn start(session: Session) -> Result<Response, AppError> {
    let cart = load_cart(&session).await;
    let mut state = restart_state(&session).await?;

    if let Err(e) = state.flow.proceed(&cart) {
        set_flash(&session, Flash::error(e.to_string())).await;
        return Ok(Redirect::to("/cart").into_response());
    }

    save_state(&session, &state).await?;
    tracing::info!(step = %state.flow.step(), mode = state.flow.mode().as_str(), "Checkout started");
    Ok(to_current_step(&state))
}

/// Display the combined vs split choice.
#[instrument(skip(state, session, page))]
pub async fn decision_page(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
) -> Response {
    let checkout = load_state(&session).await;
    if checkout.flow.step() != CheckoutStep::Decision {
        return to_current_step(&checkout);
    }

    let cart = load_cart(&session).await;
    DecisionTemplate {
        page,
        cart: CartView::new(&cart, state.backend().api_url()),
    }
    .into_response()
}

/// Record the combined vs split choice.
#[instrument(skip(session))]
pub async fn decide(
    session: Session,
    Form(form): Form<DecisionForm>,
) -> Result<Response, AppError> {
    let mut checkout = load_state(&session).await;
    if let Err(e) = checkout.flow.choose_mode(form.mode) {
        tracing::debug!(error = %e, "Ignoring checkout decision");
        return Ok(to_current_step(&checkout));
    }

    save_state(&session, &checkout).await?;
    Ok(to_current_step(&checkout))
}

/// Display the checkout details form, prefilled from the last attempt or
/// the shopper's profile.
#[instrument(skip(state, session, page, user))]
pub async fn details_page(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response, AppError> {
    let Some(mut user) = user else {
        return Ok(login_first(&session, step_path(CheckoutStep::Form)).await);
    };

    let checkout = load_state(&session).await;
    if checkout.flow.step() != CheckoutStep::Form {
        return Ok(to_current_step(&checkout));
    }

    let form = match &checkout.details {
        Some(details) => CheckoutForm::from(details),
        None => {
            let address = default_address(state.backend(), &session, &mut user).await?;
            CheckoutForm::for_user(&user, address.as_ref())
        }
    };

    let cart = load_cart(&session).await;
    Ok(CheckoutFormTemplate {
        page,
        cart: CartView::new(&cart, state.backend().api_url()),
        mode: checkout.flow.mode(),
        form,
        errors: FieldErrors::new(),
        quotes_submitted: checkout.quotes_submitted,
    }
    .into_response())
}

/// Submit the checkout details.
///
/// Quote lines are sent as quote requests first (each accepted line leaves
/// the cart, so a retry never duplicates them). Combined checkouts finish
/// there; split checkouts then create the order and move on to payment.
#[instrument(skip(state, session, page, user, form))]
pub async fn submit_details(
    State(state): State<AppState>,
    session: Session,
    mut page: PageContext,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Response, AppError> {
    let Some(mut user) = user else {
        return Ok(login_first(&session, step_path(CheckoutStep::Form)).await);
    };

    let mut checkout = load_state(&session).await;
    if checkout.flow.step() != CheckoutStep::Form {
        return Ok(to_current_step(&checkout));
    }

    let mut cart = load_cart(&session).await;
    let api_url = state.backend().api_url();
    let mode = checkout.flow.mode();
    let details = CheckoutDetails::from(&form);

    if let Err(errors) = details.validate() {
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            CheckoutFormTemplate {
                page,
                cart: CartView::new(&cart, api_url),
                mode,
                form,
                errors,
                quotes_submitted: checkout.quotes_submitted,
            },
        )
            .into_response());
    }

    checkout.details = Some(details.clone());

    // Validate the order before sending anything.
    let order = if mode == CheckoutMode::Split {
        match build_order(&details, &cart) {
            Ok(order) => Some(order),
            Err(e) => {
                set_flash(&session, Flash::error(e.to_string())).await;
                checkout.flow.reset();
                save_state(&session, &checkout).await?;
                return Ok(Redirect::to("/cart").into_response());
            }
        }
    } else {
        None
    };

    let backend = state.backend();
    let submitted =
        submit_quotes(backend, &session, &mut user, &details, &mut cart, mode).await;
    let submitted = match submitted {
        Ok(count) => count,
        Err((count, e)) => {
            // Accepted lines already left the cart; a retry only sends the rest.
            checkout.quotes_submitted += count;
            save_state(&session, &checkout).await?;
            let AppError::Backend(e) = e else {
                return Err(e);
            };
            tracing::warn!(error = %e, accepted = count, "Quote request failed during checkout");
            page.flash = Some(Flash::error(QUOTE_FAILED));
            let cart = load_cart(&session).await;
            return Ok(CheckoutFormTemplate {
                page,
                cart: CartView::new(&cart, api_url),
                mode,
                form,
                errors: FieldErrors::new(),
                quotes_submitted: checkout.quotes_submitted,
            }
            .into_response());
        }
    };
    checkout.quotes_submitted += submitted;

    let Some(order) = order else {
        checkout.flow.complete().map_err(|e| AppError::Internal(e.to_string()))?;
        checkout.completed = Some(CompletedCheckout {
            order_id: None,
            quotes_submitted: checkout.quotes_submitted,
        });
        save_state(&session, &checkout).await?;
        set_flash(&session, Flash::success(QUOTE_RECEIVED)).await;
        return Ok(to_current_step(&checkout));
    };

    let result = authorized(&session, &mut user, |mut tokens| async move {
        let result = backend.initiate_order(&mut tokens, &order).await;
        (tokens, result)
    })
    .await;

    match result {
        Ok(init) => {
            add_breadcrumb("checkout", "Order initiated", None);
            tracing::info!(order_id = %init.order_id, "Order initiated");
            checkout.pending_payment = Some(init);
            checkout
                .flow
                .start_payment()
                .map_err(|e| AppError::Internal(e.to_string()))?;
            save_state(&session, &checkout).await?;
            Ok(to_current_step(&checkout))
        }
        Err(AppError::Backend(e)) => {
            tracing::warn!(error = %e, "Order initiation failed");
            save_state(&session, &checkout).await?;
            page.flash = Some(Flash::error(failure_message(&e)));
            Ok(CheckoutFormTemplate {
                page,
                cart: CartView::new(&cart, api_url),
                mode,
                form,
                errors: FieldErrors::new(),
                quotes_submitted: checkout.quotes_submitted,
            }
            .into_response())
        }
        Err(e) => Err(e),
    }
}

/// Display the payment page for the pending order.
#[instrument(skip(state, session, page, _user))]
pub async fn payment_page(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireAuth(_user): RequireAuth,
) -> Result<Response, AppError> {
    let checkout = load_state(&session).await;
    let Some(order) = checkout
        .pending_payment
        .as_ref()
        .filter(|_| checkout.flow.step() == CheckoutStep::Payment)
    else {
        return Ok(to_current_step(&checkout));
    };

    let options = PaymentOptions::new(order, checkout.details.as_ref(), &state.config().checkout)
        .ok_or_else(|| AppError::Internal(format!("unpayable amount {}", order.amount)))?;
    let options_json =
        serde_json::to_string(&options).map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(PaymentTemplate {
        page,
        order_label: options.description.clone(),
        amount: format_price(Some(order.amount)),
        currency: order.currency.clone(),
        options_json,
        quotes_submitted: checkout.quotes_submitted,
    }
    .into_response())
}

/// Verify the gateway's payment callback.
///
/// The callback is honoured for the pending gateway order even when the
/// shopper has since left the payment step.
#[instrument(skip(state, session, user, form))]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(mut user): RequireAuth,
    Form(form): Form<PaymentVerify>,
) -> Result<Response, AppError> {
    let mut checkout = load_state(&session).await;
    let Some(pending) = checkout.pending_payment.clone() else {
        return Ok(to_current_step(&checkout));
    };

    if pending.razorpay_order_id != form.razorpay_order_id {
        tracing::warn!(
            expected = %pending.razorpay_order_id,
            received = %form.razorpay_order_id,
            "Payment callback for a different order"
        );
        set_flash(&session, Flash::error(VERIFICATION_FAILED)).await;
        return Ok(to_current_step(&checkout));
    }

    let backend = state.backend();
    let result = authorized(&session, &mut user, |mut tokens| async move {
        let result = backend.verify_payment(&mut tokens, &form).await;
        (tokens, result)
    })
    .await;

    match result {
        Ok(_) => {
            tracing::info!(order_id = %pending.order_id, "Payment verified");
            save_cart(&session, &Cart::new()).await?;
            checkout.flow.confirm_payment();
            checkout.pending_payment = None;
            checkout.completed = Some(CompletedCheckout {
                order_id: Some(pending.order_id),
                quotes_submitted: checkout.quotes_submitted,
            });
            save_state(&session, &checkout).await?;
            set_flash(&session, Flash::success(PAYMENT_SUCCESSFUL)).await;
            Ok(to_current_step(&checkout))
        }
        Err(AppError::Backend(e)) => {
            tracing::error!(error = %e, order_id = %pending.order_id, "Payment verification failed");
            set_flash(&session, Flash::error(VERIFICATION_FAILED)).await;
            Ok(to_current_step(&checkout))
        }
        Err(e) => Err(e),
    }
}

/// Step back one page.
#[instrument(skip(session))]
pub async fn back(session: Session) -> Result<Redirect, AppError> {
    let mut checkout = load_state(&session).await;
    let step = checkout.flow.back();

    if step == CheckoutStep::Cart {
        reset_state(&session).await?;
    } else {
        if step == CheckoutStep::Form {
            // The gateway order is abandoned; a new one is created on resubmit.
            checkout.pending_payment = None;
        }
        save_state(&session, &checkout).await?;
    }
    Ok(Redirect::to(step_path(step)))
}

/// Display the confirmation page once, then forget the checkout.
#[instrument(skip(session, page))]
pub async fn success(session: Session, page: PageContext) -> Result<Response, AppError> {
    let checkout = load_state(&session).await;
    let Some(completed) = checkout
        .completed
        .filter(|_| checkout.flow.step() == CheckoutStep::Success)
    else {
        return Ok(Redirect::to("/cart").into_response());
    };

    reset_state(&session).await?;
    Ok(SuccessTemplate { page, completed }.into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> CheckoutForm {
        CheckoutForm {
            first_name: " Meera ".to_string(),
            last_name: "Iyer".to_string(),
            email: "meera@example.com".to_string(),
            phone: "98765 43210".to_string(),
            company_name: "  ".to_string(),
            billing_line1: "12 MG Road".to_string(),
            billing_city: "Pune".to_string(),
            billing_state: "Maharashtra".to_string(),
            billing_pincode: "411001".to_string(),
            same_as_billing: Some("on".to_string()),
            ..CheckoutForm::default()
        }
    }

    #[test]
    fn test_step_paths() {
        assert_eq!(step_path(CheckoutStep::Cart), "/cart");
        assert_eq!(step_path(CheckoutStep::Form), "/checkout/details");
        assert_eq!(step_path(CheckoutStep::Success), "/checkout/success");
    }

    #[test]
    fn test_form_converts_to_valid_details() {
        let details = CheckoutDetails::from(&form());
        assert_eq!(details.first_name, "Meera");
        assert_eq!(details.company_name, None);
        assert!(details.same_as_billing);
        assert!(!details.save_info);
        assert!(details.validate().is_ok());
    }

    #[test]
    fn test_missing_shipping_is_reported_when_not_same_as_billing() {
        let mut form = form();
        form.same_as_billing = None;
        let errors = CheckoutDetails::from(&form).validate().unwrap_err();
        assert_eq!(errors.get("shipping.line1"), Some("Address is required"));
    }

    #[test]
    fn test_details_refill_the_form() {
        let details = CheckoutDetails::from(&form());
        let refilled = CheckoutForm::from(&details);
        assert_eq!(refilled.first_name, "Meera");
        assert!(refilled.same_as_billing());
        assert_eq!(refilled.billing_pincode, "411001");
    }
}
