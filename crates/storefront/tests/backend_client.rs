//! Backend client tests against an in-process fake API.

#![allow(clippy::unwrap_used)]

mod common;

use common::{FRESH_ACCESS, FakeBackend, LOGIN_ACCESS, LOGIN_REFRESH, PASSWORD, ROTATED_REFRESH};
use nexgen_core::ProductId;
use nexgen_storefront::backend::{BackendClient, BackendError, TokenPair};
use nexgen_storefront::config::BackendConfig;
use tokio::task::JoinSet;

fn client(backend: &FakeBackend) -> BackendClient {
    BackendClient::new(&BackendConfig {
        api_url: backend.url.clone(),
        ..BackendConfig::default()
    })
    .unwrap()
}

fn stale_tokens() -> TokenPair {
    TokenPair::new("expired-access", LOGIN_REFRESH)
}

#[tokio::test]
async fn test_login_returns_token_pair() {
    let backend = FakeBackend::start().await;
    let client = client(&backend);

    let tokens = client
        .obtain_token("meera@example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(tokens.access, LOGIN_ACCESS);
    assert_eq!(tokens.refresh.as_deref(), Some(LOGIN_REFRESH));

    let wrong = client.obtain_token("meera@example.com", "nope").await;
    assert!(matches!(wrong, Err(BackendError::Unauthorized)));
}

#[tokio::test]
async fn test_valid_token_does_not_refresh() {
    let backend = FakeBackend::start().await;
    let client = client(&backend);

    let mut tokens = TokenPair::new(LOGIN_ACCESS, LOGIN_REFRESH);
    let profile = client.get_me(&mut tokens).await.unwrap();

    assert_eq!(profile.email, "meera@example.com");
    assert_eq!(tokens.access, LOGIN_ACCESS);
    assert_eq!(backend.recorded.refreshes(), 0);
}

#[tokio::test]
async fn test_rejected_access_token_is_refreshed_and_rotated() {
    let backend = FakeBackend::start().await;
    let client = client(&backend);

    let mut tokens = stale_tokens();
    let profile = client.get_me(&mut tokens).await.unwrap();

    assert_eq!(profile.full_name(), "Meera Iyer");
    assert_eq!(tokens.access, FRESH_ACCESS);
    assert_eq!(tokens.refresh.as_deref(), Some(ROTATED_REFRESH));
    assert_eq!(backend.recorded.refreshes(), 1);
}

#[tokio::test]
async fn test_concurrent_refreshes_share_one_request() {
    let backend = FakeBackend::start().await;
    let client = client(&backend);

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let client = client.clone();
        tasks.spawn(async move {
            let mut tokens = stale_tokens();
            let result = client.get_me(&mut tokens).await;
            (tokens, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (tokens, result) = joined.unwrap();
        assert!(result.is_ok());
        assert_eq!(tokens.access, FRESH_ACCESS);
        assert_eq!(tokens.refresh.as_deref(), Some(ROTATED_REFRESH));
    }
    assert_eq!(backend.recorded.refreshes(), 1);
}

#[tokio::test]
async fn test_rejected_refresh_expires_session() {
    let backend = FakeBackend::start().await;
    let client = client(&backend);

    let mut tokens = TokenPair::new("expired-access", "revoked-refresh");
    let result = client.get_me(&mut tokens).await;

    assert!(matches!(result, Err(BackendError::SessionExpired)));
    assert_eq!(tokens.access, "expired-access");
}

#[tokio::test]
async fn test_missing_refresh_token_expires_session() {
    let backend = FakeBackend::start().await;
    let client = client(&backend);

    let mut tokens = TokenPair {
        access: "expired-access".to_string(),
        refresh: None,
    };
    let result = client.my_addresses(&mut tokens).await;

    assert!(matches!(result, Err(BackendError::SessionExpired)));
    assert_eq!(backend.recorded.refreshes(), 0);
}

#[tokio::test]
async fn test_product_list_is_cached() {
    let backend = FakeBackend::start().await;
    let client = client(&backend);

    let first = client.list_products().await.unwrap();
    let second = client.list_products().await.unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    assert_eq!(backend.recorded.product_lists(), 1);

    client.invalidate_catalogue();
    client.list_products().await.unwrap();
    assert_eq!(backend.recorded.product_lists(), 2);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let backend = FakeBackend::start().await;
    let client = client(&backend);

    let product = client.get_product(ProductId::new(2)).await.unwrap();
    assert!(product.is_quote());
    assert_eq!(product.price_label(), "Price on request");

    let missing = client.get_product(ProductId::new(99)).await;
    assert!(matches!(missing, Err(BackendError::NotFound(_))));
}
