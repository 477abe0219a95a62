//! End-to-end tests against a running storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the backend API and the storefront, then:
//! STOREFRONT_TEST_URL=http://127.0.0.1:3000 cargo test -p nexgen-integration-tests -- --ignored
//! ```
//!
//! Tests that sign in also need `TEST_USER_EMAIL` and `TEST_USER_PASSWORD`
//! for an existing backend account; they skip themselves otherwise.

use reqwest::{Client, Response, redirect};

/// Storefront URL used when `STOREFRONT_TEST_URL` is unset.
pub const DEFAULT_STOREFRONT_URL: &str = "http://127.0.0.1:3000";

/// A browser-like client against one storefront.
///
/// Keeps cookies between requests and never follows redirects, so tests can
/// assert on `Location`.
pub struct TestContext {
    pub client: Client,
    pub storefront_url: String,
}

/// Credentials for an existing backend account.
pub struct TestUser {
    pub email: String,
    pub password: String,
}

impl TestContext {
    /// Build a context from the environment.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let storefront_url = std::env::var("STOREFRONT_TEST_URL")
            .unwrap_or_else(|_| DEFAULT_STOREFRONT_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            storefront_url,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }

    /// GET a storefront path.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the storefront is unreachable.
    pub async fn get(&self, path: &str) -> reqwest::Result<Response> {
        self.client.get(self.url(path)).send().await
    }

    /// POST a form to a storefront path.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the storefront is unreachable.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Result<Response> {
        self.client.post(self.url(path)).form(form).send().await
    }
}

impl TestUser {
    /// Test account from `TEST_USER_EMAIL` / `TEST_USER_PASSWORD`, if set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        dotenvy::dotenv().ok();
        Some(Self {
            email: std::env::var("TEST_USER_EMAIL").ok()?,
            password: std::env::var("TEST_USER_PASSWORD").ok()?,
        })
    }
}

/// The `Location` header of a redirect, if any.
#[must_use]
pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(reqwest::header::LOCATION)?
        .to_str()
        .ok()
}
