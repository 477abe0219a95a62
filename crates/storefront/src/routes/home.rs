//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use super::products::ProductView;
use crate::filters;
use crate::middleware::PageContext;
use crate::state::AppState;

/// Catalogue categories offered as filters.
const CATEGORIES: [&str; 2] = ["Software", "Hardware"];

/// A highlight card under the hero.
#[derive(Clone, Debug)]
pub struct Highlight {
    pub title: &'static str,
    pub body: &'static str,
    pub tags: &'static [&'static str],
    pub link_text: &'static str,
    pub category: &'static str,
}

const HIGHLIGHTS: [Highlight; 2] = [
    Highlight {
        title: "Software Solutions",
        body: "Secure licensing for creative, security, and development tools.",
        tags: &["Unity", "McAfee"],
        link_text: "Explore Software",
        category: "Software",
    },
    Highlight {
        title: "Fleet Hardware",
        body: "Dashcams, trackers and telematics for commercial fleets.",
        tags: &["Dashcams", "GPS"],
        link_text: "Explore Hardware",
        category: "Hardware",
    },
];

/// Category filter link.
#[derive(Clone, Debug)]
pub struct CategoryTab {
    pub label: &'static str,
    pub href: String,
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    pub category: Option<String>,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub highlights: &'static [Highlight],
    pub categories: Vec<CategoryTab>,
    pub products: Vec<ProductView>,
    /// The catalogue could not be loaded.
    pub unavailable: bool,
}

/// Known category matching `raw`, ignoring case.
fn selected_category(raw: Option<&str>) -> Option<&'static str> {
    let raw = raw?.trim();
    CATEGORIES
        .into_iter()
        .find(|category| category.eq_ignore_ascii_case(raw))
}

fn category_tabs(selected: Option<&str>) -> Vec<CategoryTab> {
    let mut tabs = vec![CategoryTab {
        label: "All Products",
        href: "/#products".to_string(),
        active: selected.is_none(),
    }];
    tabs.extend(CATEGORIES.into_iter().map(|category| CategoryTab {
        label: category,
        href: format!("/?category={category}#products"),
        active: selected == Some(category),
    }));
    tabs
}

/// Display the home page: hero, highlights and the product grid.
#[instrument(skip(state, page))]
pub async fn home(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<HomeQuery>,
) -> impl IntoResponse {
    let selected = selected_category(query.category.as_deref());

    let (products, unavailable) = match state.backend().list_products().await {
        Ok(products) => {
            let api_url = state.backend().api_url();
            let views = products
                .iter()
                .filter(|p| selected.is_none_or(|c| p.category.eq_ignore_ascii_case(c)))
                .map(|p| ProductView::new(p, api_url))
                .collect();
            (views, false)
        }
        Err(e) => {
            tracing::error!("Failed to fetch products: {e}");
            (Vec::new(), true)
        }
    };

    HomeTemplate {
        page,
        highlights: &HIGHLIGHTS,
        categories: category_tabs(selected),
        products,
        unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_category_is_case_insensitive() {
        assert_eq!(selected_category(Some("software")), Some("Software"));
        assert_eq!(selected_category(Some(" HARDWARE ")), Some("Hardware"));
        assert_eq!(selected_category(Some("toys")), None);
        assert_eq!(selected_category(None), None);
    }

    #[test]
    fn test_category_tabs_mark_active() {
        let tabs = category_tabs(Some("Hardware"));
        let active: Vec<&str> = tabs.iter().filter(|t| t.active).map(|t| t.label).collect();
        assert_eq!(active, vec!["Hardware"]);

        assert!(category_tabs(None).first().is_some_and(|t| t.active));
    }
}
