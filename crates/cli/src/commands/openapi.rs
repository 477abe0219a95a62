//! Download the backend's OpenAPI document.

use std::path::Path;

use tracing::info;

/// Fetch `/api/openapi.json` and write it, pretty-printed, to `out`.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached or the file cannot be
/// written.
pub async fn fetch(url: Option<&str>, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::backend_client(url)?;
    info!(backend = %client.api_url(), "Fetching OpenAPI document");

    let document = client.openapi_document().await?;
    let paths = document
        .get("paths")
        .and_then(serde_json::Value::as_object)
        .map_or(0, serde_json::Map::len);

    let pretty = serde_json::to_string_pretty(&document)?;
    tokio::fs::write(out, pretty).await?;

    info!(paths, out = %out.display(), "OpenAPI document saved");
    Ok(())
}
