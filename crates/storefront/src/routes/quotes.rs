//! Request-a-quote route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use nexgen_core::{FieldErrors, ProductId, validation::QuoteRequestInput};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::products::ProductView;
use crate::backend::{BackendError, QuoteInput};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, PageContext, auth::login_url};
use crate::models::Flash;
use crate::services::{auth::authorized, flash::set_flash};
use crate::state::AppState;

const LOGIN_REQUIRED: &str = "Please log in to request a quote";
const QUOTE_RECEIVED: &str = "Quote request received!";
const QUOTE_FAILED: &str = "Failed to submit request. Please try again.";

/// Quote form values, as posted and as re-rendered.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub message: String,
}

impl QuoteForm {
    /// Parse into validated input. An unparseable quantity counts as 0.
    fn to_input(&self) -> QuoteRequestInput {
        QuoteRequestInput {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: Some(self.phone.clone()),
            quantity: self.quantity.trim().parse().unwrap_or(0),
            message: Some(self.message.clone()),
        }
    }
}

/// Request-a-quote page template.
#[derive(Template, WebTemplate)]
#[template(path = "quotes/form.html")]
pub struct QuoteFormTemplate {
    pub page: PageContext,
    pub product: ProductView,
    pub form: QuoteForm,
    pub errors: FieldErrors,
    /// Submission failed after validation.
    pub form_error: Option<String>,
}

/// Quote request confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "quotes/success.html")]
pub struct QuoteSuccessTemplate {
    pub page: PageContext,
    pub product: ProductView,
}

fn quote_path(id: ProductId) -> String {
    format!("/quote/{id}")
}

async fn load_product(state: &AppState, id: ProductId) -> Result<ProductView, AppError> {
    let product = state.backend().get_product(id).await.map_err(|e| match e {
        BackendError::NotFound(_) => AppError::NotFound(format!("product {id}")),
        other => AppError::Backend(other),
    })?;
    Ok(ProductView::new(&product, state.backend().api_url()))
}

/// Display the quote form, prefilled with the shopper's name and email.
#[instrument(skip(state, session, page, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<ProductId>,
) -> Result<Response, AppError> {
    let Some(user) = user else {
        set_flash(&session, Flash::error(LOGIN_REQUIRED)).await;
        return Ok(Redirect::to(&login_url(&quote_path(id))).into_response());
    };

    let product = load_product(&state, id).await?;
    let form = QuoteForm {
        name: user.full_name(),
        email: user.email.clone(),
        phone: String::new(),
        quantity: "1".to_string(),
        message: String::new(),
    };

    Ok(QuoteFormTemplate {
        page,
        product,
        form,
        errors: FieldErrors::new(),
        form_error: None,
    }
    .into_response())
}

/// Submit a quote request for one product.
#[instrument(skip(state, session, page, user, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    mut page: PageContext,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<ProductId>,
    Form(form): Form<QuoteForm>,
) -> Result<Response, AppError> {
    let Some(mut user) = user else {
        set_flash(&session, Flash::error(LOGIN_REQUIRED)).await;
        return Ok(Redirect::to(&login_url(&quote_path(id))).into_response());
    };

    let product = load_product(&state, id).await?;
    let input = form.to_input();

    if let Err(errors) = input.validate() {
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            QuoteFormTemplate {
                page,
                product,
                form,
                errors,
                form_error: None,
            },
        )
            .into_response());
    }

    let request = QuoteInput {
        product_id: id,
        email: input.email.clone(),
        phone: input.phone().map(String::from),
        // validated >= 1 above
        quantity: u32::try_from(input.quantity).unwrap_or(u32::MAX),
        message: input.message().map(String::from),
    };

    let backend = state.backend();
    let result = authorized(&session, &mut user, |mut tokens| async move {
        let result = backend.create_quote_request(&mut tokens, &request).await;
        (tokens, result)
    })
    .await;

    match result {
        Ok(success) => {
            add_breadcrumb("quote", "Quote requested", None);
            tracing::info!(product_id = %id, quote_id = ?success.id, "Quote request submitted");
            page.flash = Some(Flash::success(QUOTE_RECEIVED));
            Ok(QuoteSuccessTemplate { page, product }.into_response())
        }
        Err(AppError::Backend(e)) => {
            tracing::warn!(error = %e, product_id = %id, "Quote request failed");
            page.flash = Some(Flash::error(QUOTE_FAILED));
            Ok(QuoteFormTemplate {
                page,
                product,
                form,
                errors: FieldErrors::new(),
                form_error: Some(QUOTE_FAILED.to_string()),
            }
            .into_response())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_form_to_input() {
        let form = QuoteForm {
            name: " Ravi Kumar ".to_string(),
            email: "ravi@example.com".to_string(),
            phone: "  ".to_string(),
            quantity: "abc".to_string(),
            message: "Need 20 seats".to_string(),
        };
        let input = form.to_input();

        assert_eq!(input.name, "Ravi Kumar");
        assert_eq!(input.phone(), None);
        assert_eq!(input.message(), Some("Need 20 seats"));
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.get("quantity"), Some("Quantity must be at least 1"));
    }
}
