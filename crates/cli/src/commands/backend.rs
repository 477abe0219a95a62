//! Backend smoke check.

use std::collections::BTreeMap;

use tracing::{info, warn};

/// List the catalogue and log how many products each category has.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached or answers with an error.
pub async fn check(url: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::backend_client(url)?;
    info!(backend = %client.api_url(), "Checking backend");

    let products = client.list_products().await?;
    if products.is_empty() {
        warn!("Backend answered but the catalogue is empty");
        return Ok(());
    }

    let mut by_category: BTreeMap<&str, usize> = BTreeMap::new();
    for product in &products {
        *by_category.entry(product.category.as_str()).or_default() += 1;
    }

    for (category, count) in &by_category {
        info!(category = %category, count, "Products");
    }
    info!(total = products.len(), "Backend OK");
    Ok(())
}
