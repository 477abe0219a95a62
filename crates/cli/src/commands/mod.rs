//! CLI subcommands.

pub mod backend;
pub mod migrate;
pub mod openapi;

use nexgen_storefront::backend::{BackendClient, BackendError};
use nexgen_storefront::config::BackendConfig;

/// Backend URL used when neither `--url` nor `BACKEND_API_URL` is set.
const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

/// Resolve the backend URL from the flag, then the environment.
fn backend_url(flag: Option<&str>) -> String {
    dotenvy::dotenv().ok();
    flag.map(str::to_string)
        .or_else(|| std::env::var("BACKEND_API_URL").ok())
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
}

/// Backend client for `flag`, falling back to the environment.
fn backend_client(flag: Option<&str>) -> Result<BackendClient, BackendError> {
    BackendClient::new(&BackendConfig {
        api_url: backend_url(flag),
        ..BackendConfig::default()
    })
}
