//! Cart route handlers.
//!
//! The cart lives in the session. Every mutation is written straight back
//! and drops any checkout in progress, since its totals no longer hold.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use nexgen_core::{Cart, CartLine, ProductId, format_price};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{BackendError, media_url};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{PageContext, auth::safe_next};
use crate::models::Flash;
use crate::services::{
    cart::{load_cart, save_cart},
    checkout::restart_state,
    flash::set_flash,
};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone, Debug)]
pub struct CartLineView {
    pub id: ProductId,
    pub href: String,
    pub name: String,
    pub category: String,
    pub image: String,
    pub qty: u32,
    pub is_quote: bool,
    pub unit_price: String,
    pub line_total: String,
}

impl CartLineView {
    #[must_use]
    pub fn new(line: &CartLine, api_url: &str) -> Self {
        let product = &line.product;
        let href = if product.slug.is_empty() {
            format!("/product/{}", product.id)
        } else {
            format!("/product/{}-{}", product.id, product.slug)
        };
        let is_quote = product.price_type.is_quote();

        Self {
            id: product.id,
            href,
            name: product.name.clone(),
            category: product.category.clone(),
            image: media_url(api_url, product.image.as_deref()),
            qty: line.qty,
            is_quote,
            unit_price: if is_quote {
                "Price on request".to_string()
            } else {
                format_price(product.price)
            },
            line_total: line
                .subtotal()
                .map_or_else(|| "Quote".to_string(), |t| format_price(Some(t))),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone, Debug)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub fixed_count: usize,
    pub quote_count: usize,
    pub has_mixed: bool,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &Cart, api_url: &str) -> Self {
        Self {
            lines: cart
                .lines()
                .iter()
                .map(|line| CartLineView::new(line, api_url))
                .collect(),
            total: format_price(Some(cart.total())),
            fixed_count: cart.fixed_items_count(),
            quote_count: cart.quote_items_count(),
            has_mixed: cart.has_mixed_items(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Apply a change to the cart, persist it and drop checkout progress.
async fn mutate_cart(
    session: &Session,
    change: impl FnOnce(&mut Cart),
) -> Result<Cart, AppError> {
    let mut cart = load_cart(session).await;
    change(&mut cart);
    save_cart(session, &cart).await?;
    restart_state(session).await?;
    Ok(cart)
}

// =============================================================================
// Form Types
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
    /// Page to return to; defaults to the cart.
    pub return_to: Option<String>,
}

/// Relative quantity change (+1 / -1 buttons).
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub delta: i64,
}

/// Absolute quantity from the number input.
#[derive(Debug, Deserialize)]
pub struct SetQuantityForm {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Cart count badge fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, session, page))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
) -> impl IntoResponse {
    let cart = load_cart(&session).await;

    CartShowTemplate {
        page,
        cart: CartView::new(&cart, state.backend().api_url()),
    }
}

/// Add a product to the cart.
///
/// The product is looked up so the cart stores a current snapshot.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect, AppError> {
    let product = state
        .backend()
        .get_product(form.product_id)
        .await
        .map_err(|e| match e {
            BackendError::NotFound(_) => AppError::NotFound(format!("product {}", form.product_id)),
            other => AppError::Backend(other),
        })?;

    let quantity = form.quantity.unwrap_or(1).max(1);
    let snapshot = product.to_cart_product();
    mutate_cart(&session, |cart| cart.add(snapshot, quantity)).await?;

    let product_id = product.id.to_string();
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));
    set_flash(&session, Flash::success(format!("{} added to cart!", product.name))).await;

    let target = form
        .return_to
        .as_deref()
        .map_or("/cart", |next| safe_next(Some(next)));
    Ok(Redirect::to(target))
}

/// Change a line's quantity by a signed delta; zero or less removes it.
#[instrument(skip(session))]
pub async fn update(
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Result<Redirect, AppError> {
    mutate_cart(&session, |cart| {
        cart.update_qty(form.product_id, form.delta);
    })
    .await?;
    Ok(Redirect::to("/cart"))
}

/// Set a line's quantity; zero removes it.
#[instrument(skip(session))]
pub async fn set_quantity(
    session: Session,
    Form(form): Form<SetQuantityForm>,
) -> Result<Redirect, AppError> {
    mutate_cart(&session, |cart| {
        cart.set_qty(form.product_id, form.quantity);
    })
    .await?;
    Ok(Redirect::to("/cart"))
}

/// Remove a line.
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Redirect, AppError> {
    mutate_cart(&session, |cart| {
        cart.remove(form.product_id);
    })
    .await?;
    Ok(Redirect::to("/cart"))
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Redirect, AppError> {
    mutate_cart(&session, Cart::clear).await?;
    Ok(Redirect::to("/cart"))
}

/// Cart count badge fragment.
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: load_cart(&session).await.line_count(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nexgen_core::{CartProduct, PriceType};
    use rust_decimal::Decimal;

    use super::*;

    fn line(id: i64, price_type: PriceType, qty: u32) -> CartLine {
        CartLine {
            product: CartProduct {
                id: ProductId::new(id),
                name: format!("Item {id}"),
                slug: if id == 1 { "mcafee".to_string() } else { String::new() },
                category: "Software".to_string(),
                price: Some(Decimal::new(1250, 2)),
                price_type,
                image: None,
            },
            qty,
        }
    }

    #[test]
    fn test_cart_line_view_formats_prices() {
        let view = CartLineView::new(&line(1, PriceType::Fixed, 3), "http://api");
        assert_eq!(view.href, "/product/1-mcafee");
        assert_eq!(view.unit_price, "$12.50");
        assert_eq!(view.line_total, "$37.50");
        assert_eq!(view.image, crate::backend::PLACEHOLDER_IMAGE);

        let quote = CartLineView::new(&line(2, PriceType::Quote, 1), "http://api");
        assert_eq!(quote.href, "/product/2");
        assert_eq!(quote.unit_price, "Price on request");
        assert_eq!(quote.line_total, "Quote");
    }

    #[test]
    fn test_cart_view_totals_fixed_lines_only() {
        let cart = Cart::from_lines(vec![
            line(1, PriceType::Fixed, 2),
            line(2, PriceType::Quote, 4),
        ]);
        let view = CartView::new(&cart, "http://api");

        assert_eq!(view.total, "$25.00");
        assert_eq!(view.fixed_count, 1);
        assert_eq!(view.quote_count, 1);
        assert!(view.has_mixed);
    }
}
