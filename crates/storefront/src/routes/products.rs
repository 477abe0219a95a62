//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use nexgen_core::ProductId;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{BackendError, Product, media_url};
use crate::error::AppError;
use crate::filters;
use crate::middleware::PageContext;
use crate::services::cart::load_cart;
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone, Debug)]
pub struct ProductView {
    pub id: ProductId,
    pub href: String,
    pub name: String,
    pub category: String,
    pub is_software: bool,
    pub description: String,
    pub price_label: String,
    pub is_quote: bool,
    pub image: String,
    pub images: Vec<String>,
    pub features: Vec<String>,
    pub specs: Vec<(String, String)>,
    pub rating: Option<String>,
    pub reviews: Option<u32>,
}

impl ProductView {
    /// Build the view, resolving image paths against the backend.
    #[must_use]
    pub fn new(product: &Product, api_url: &str) -> Self {
        let images: Vec<String> = product
            .images
            .iter()
            .map(|path| media_url(api_url, Some(path)))
            .collect();

        Self {
            id: product.id,
            href: product.path(),
            name: product.name.clone(),
            category: product.category.clone(),
            is_software: product.is_software(),
            description: product.description.clone(),
            price_label: product.price_label(),
            is_quote: product.is_quote(),
            image: media_url(api_url, product.first_image()),
            images,
            features: product.features.clone(),
            specs: product.spec_rows(),
            rating: product.rating.map(|r| format!("{r:.1}")),
            reviews: product.reviews,
        }
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: ProductView,
    /// Quantity of this product already in the cart.
    pub in_cart: Option<u32>,
}

/// Product id from a URL key (`"12"` or `"12-some-slug"`).
fn parse_key(key: &str) -> Option<ProductId> {
    key.split('-').next()?.parse().ok()
}

/// Display product detail page.
///
/// Redirects permanently to the canonical `/product/<id>-<slug>` path.
#[instrument(skip(state, session, page))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_key(&key).ok_or_else(|| AppError::NotFound(format!("product {key}")))?;

    let product = state.backend().get_product(id).await.map_err(|e| match e {
        BackendError::NotFound(_) => AppError::NotFound(format!("product {id}")),
        other => AppError::Backend(other),
    })?;

    if product.url_key() != key {
        return Ok(Redirect::permanent(&product.path()).into_response());
    }

    let in_cart = load_cart(&session).await.quantity_of(product.id);

    Ok(ProductShowTemplate {
        page,
        product: ProductView::new(&product, state.backend().api_url()),
        in_cart,
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("12"), Some(ProductId::new(12)));
        assert_eq!(parse_key("12-unity-pro"), Some(ProductId::new(12)));
        assert_eq!(parse_key("unity-pro"), None);
        assert_eq!(parse_key(""), None);
    }

    #[test]
    fn test_product_view_resolves_images() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "BlackBox 4K LTE",
            "slug": "blackbox-4k-lte",
            "category": "Hardware",
            "price": "249.00",
            "price_type": "fixed",
            "images": ["/media/dashcam.png"],
            "specs": {"Resolution": "4K", "LTE": true},
            "rating": 4.6
        }))
        .unwrap();

        let view = ProductView::new(&product, "http://127.0.0.1:8000");
        assert_eq!(view.href, "/product/3-blackbox-4k-lte");
        assert_eq!(view.image, "http://127.0.0.1:8000/media/dashcam.png");
        assert_eq!(view.rating.as_deref(), Some("4.6"));
        assert!(!view.is_quote);
        assert!(view.specs.contains(&("LTE".to_string(), "true".to_string())));
    }
}
