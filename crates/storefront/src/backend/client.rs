//! Backend REST client implementation.
//!
//! Uses `reqwest` 0.13 for HTTP. Caches products using `moka` (TTL from
//! config) and coalesces concurrent token refreshes through a second `moka`
//! cache keyed by refresh token.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use nexgen_core::ProductId;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::cache::{CacheKey, CacheValue};
use super::types::{
    AuthResponse, OrderCreate, OrderInit, PaymentVerify, Product, QuoteInput, QuoteSuccess,
    SavedAddress, TokenPair, TokenPairRequest, TokenPairResponse, TokenRefreshRequest,
    TokenRefreshResponse, UserProfile, UserRegister,
};
use super::{BackendError, TOKEN_REFRESH_PATH, extract_error_message};
use crate::config::BackendConfig;

/// How long a completed refresh is shared with late arrivals holding the same
/// (now superseded) refresh token.
const REFRESH_SHARE_WINDOW: Duration = Duration::from_secs(30);

const MAX_LOGGED_BODY: usize = 500;

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the backend REST API.
///
/// Cheap to clone; clones share the HTTP connection pool and caches.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    api_url: String,
    cache: Cache<CacheKey, CacheValue>,
    refreshes: Cache<String, TokenPair>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("nexgen-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.product_cache_ttl)
            .build();

        let refreshes = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(REFRESH_SHARE_WINDOW)
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                api_url: config.api_url.trim_end_matches('/').to_string(),
                cache,
                refreshes,
            }),
        })
    }

    /// Base URL of the backend, without a trailing slash.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.inner.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.api_url)
    }

    /// Send a request and decode the JSON response.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let path = response.url().path().to_string();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        if status == StatusCode::UNAUTHORIZED {
            debug!(path = %path, "Backend rejected credentials");
            return Err(BackendError::Unauthorized);
        }

        let response_text = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(path));
        }

        if !status.is_success() {
            let body = truncate(&response_text);
            if status.is_server_error() {
                tracing::error!(status = %status, path = %path, body = %body, "Backend returned server error");
            } else {
                warn!(status = %status, path = %path, body = %body, "Backend rejected request");
            }
            let message = extract_error_message(&response_text).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = if response_text.trim().is_empty() {
            "null"
        } else {
            response_text.as_str()
        };

        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                path = %path,
                body = %truncate(&response_text),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    // =========================================================================
    // Token refresh gate
    // =========================================================================

    /// Run a bearer-authenticated request, refreshing the access token once
    /// if it is rejected.
    ///
    /// `build` is called once per attempt and must produce the same request
    /// each time. On a refresh `tokens` is updated in place; callers persist
    /// it whenever it changed, even if the call itself then failed.
    ///
    /// Concurrent callers holding the same refresh token share a single
    /// refresh request and all receive its result.
    ///
    /// # Errors
    ///
    /// Returns `SessionExpired` if there is no refresh token, the refresh is
    /// rejected, or the retried request is still unauthorized. Other errors
    /// are passed through.
    pub async fn call_authorized<T, F>(
        &self,
        tokens: &mut TokenPair,
        build: F,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let first = build(&self.inner.client).bearer_auth(&tokens.access);
        match self.execute(first).await {
            Err(BackendError::Unauthorized) => {}
            other => return other,
        }

        let Some(refresh) = tokens.refresh.clone() else {
            warn!("Access token rejected and no refresh token is stored");
            return Err(BackendError::SessionExpired);
        };

        *tokens = self.refresh_shared(tokens, refresh).await?;

        let retry = build(&self.inner.client).bearer_auth(&tokens.access);
        match self.execute(retry).await {
            Err(BackendError::Unauthorized) => {
                warn!("Request still unauthorized after token refresh");
                Err(BackendError::SessionExpired)
            }
            other => other,
        }
    }

    /// Refresh `tokens`, joining any refresh already in flight for the same
    /// refresh token.
    async fn refresh_shared(
        &self,
        tokens: &TokenPair,
        refresh: String,
    ) -> Result<TokenPair, BackendError> {
        let current = tokens.clone();
        let client = self.clone();
        let refresh_for_call = refresh.clone();

        self.inner
            .refreshes
            .try_get_with(refresh, async move {
                let response = client.refresh_token(&refresh_for_call).await?;
                Ok::<_, BackendError>(current.refreshed(response))
            })
            .await
            .map_err(|err| {
                warn!(error = %err, "Token refresh failed, ending session");
                BackendError::SessionExpired
            })
    }

    // =========================================================================
    // Catalogue
    // =========================================================================

    /// List all products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let request = self.inner.client.get(self.url("/api/products/"));
        let products: Vec<Product> = self.execute(request).await?;

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist, or an error if the
    /// API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, BackendError> {
        let cache_key = CacheKey::Product(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let request = self.inner.client.get(self.url(&format!("/api/products/{id}")));
        let product: Product = self.execute(request).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Drop all cached catalogue responses.
    pub fn invalidate_catalogue(&self) {
        self.inner.cache.invalidate_all();
    }

    // =========================================================================
    // Accounts & tokens
    // =========================================================================

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `Api` with the backend's message if the account is rejected
    /// (e.g. the email is taken).
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: &UserRegister) -> Result<AuthResponse, BackendError> {
        let request = self.inner.client.post(self.url("/api/auth/register")).json(input);
        self.execute(request).await
    }

    /// Exchange credentials for a token pair.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for wrong credentials.
    #[instrument(skip(self, password))]
    pub async fn obtain_token(&self, email: &str, password: &str) -> Result<TokenPair, BackendError> {
        let request = self
            .inner
            .client
            .post(self.url("/api/token/pair"))
            .json(&TokenPairRequest { email, password });
        let response: TokenPairResponse = self.execute(request).await?;
        Ok(TokenPair::new(response.access, response.refresh))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Never goes through the refresh gate itself.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the refresh token was rejected.
    #[instrument(skip_all)]
    pub async fn refresh_token(&self, refresh: &str) -> Result<TokenRefreshResponse, BackendError> {
        let request = self
            .inner
            .client
            .post(self.url(TOKEN_REFRESH_PATH))
            .json(&TokenRefreshRequest { refresh });
        self.execute(request).await
    }

    /// Fetch the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// See [`Self::call_authorized`].
    #[instrument(skip_all)]
    pub async fn get_me(&self, tokens: &mut TokenPair) -> Result<UserProfile, BackendError> {
        let url = self.url("/api/auth/me");
        self.call_authorized(tokens, |client| client.get(&url)).await
    }

    // =========================================================================
    // Quotes & orders
    // =========================================================================

    /// Submit a quote request for one product.
    ///
    /// # Errors
    ///
    /// See [`Self::call_authorized`].
    #[instrument(skip(self, tokens, input), fields(product_id = %input.product_id))]
    pub async fn create_quote_request(
        &self,
        tokens: &mut TokenPair,
        input: &QuoteInput,
    ) -> Result<QuoteSuccess, BackendError> {
        let url = self.url("/api/quotes/request");
        self.call_authorized(tokens, |client| client.post(&url).json(input))
            .await
    }

    /// Create an order for the fixed-price items and open a gateway order.
    ///
    /// # Errors
    ///
    /// See [`Self::call_authorized`].
    #[instrument(skip(self, tokens, order), fields(items = order.items.len()))]
    pub async fn initiate_order(
        &self,
        tokens: &mut TokenPair,
        order: &OrderCreate,
    ) -> Result<OrderInit, BackendError> {
        let url = self.url("/api/order/initiate");
        self.call_authorized(tokens, |client| client.post(&url).json(order))
            .await
    }

    /// Addresses saved on the user's account.
    ///
    /// # Errors
    ///
    /// See [`Self::call_authorized`].
    #[instrument(skip_all)]
    pub async fn my_addresses(
        &self,
        tokens: &mut TokenPair,
    ) -> Result<Vec<SavedAddress>, BackendError> {
        let url = self.url("/api/order/my-addresses");
        self.call_authorized(tokens, |client| client.get(&url)).await
    }

    /// Verify a gateway payment signature.
    ///
    /// # Errors
    ///
    /// See [`Self::call_authorized`].
    #[instrument(skip(self, tokens, payment), fields(razorpay_order_id = %payment.razorpay_order_id))]
    pub async fn verify_payment(
        &self,
        tokens: &mut TokenPair,
        payment: &PaymentVerify,
    ) -> Result<serde_json::Value, BackendError> {
        let url = self.url("/api/order/verify");
        self.call_authorized(tokens, |client| client.post(&url).json(payment))
            .await
    }

    // =========================================================================
    // Tooling
    // =========================================================================

    /// Download the backend's OpenAPI document.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn openapi_document(&self) -> Result<serde_json::Value, BackendError> {
        let request = self.inner.client.get(self.url("/api/openapi.json"));
        self.execute(request).await
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_LOGGED_BODY).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(api_url: &str) -> BackendClient {
        BackendClient::new(&BackendConfig {
            api_url: api_url.to_string(),
            ..BackendConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = client("http://127.0.0.1:8000/");
        assert_eq!(client.api_url(), "http://127.0.0.1:8000");
        assert_eq!(
            client.url("/api/products/"),
            "http://127.0.0.1:8000/api/products/"
        );
    }

    #[test]
    fn test_truncate() {
        let long = "x".repeat(MAX_LOGGED_BODY + 10);
        assert_eq!(truncate(&long).len(), MAX_LOGGED_BODY);
        assert_eq!(truncate("short"), "short");
    }

    #[tokio::test]
    async fn test_transport_error_passes_through() {
        // Nothing listens on port 9.
        let client = client("http://127.0.0.1:9");
        let mut tokens = TokenPair {
            access: "a".to_string(),
            refresh: None,
        };
        let result = client.get_me(&mut tokens).await;
        assert!(matches!(result, Err(BackendError::Http(_))));
    }
}
