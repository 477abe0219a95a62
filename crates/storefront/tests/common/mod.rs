//! In-process fake of the catalogue/order API for storefront tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};

/// Password the fake accepts for any account.
pub const PASSWORD: &str = "correct-horse";
/// Access token issued at login.
pub const LOGIN_ACCESS: &str = "login-access";
/// Refresh token issued at login.
pub const LOGIN_REFRESH: &str = "login-refresh";
/// Access token issued by a refresh.
pub const FRESH_ACCESS: &str = "fresh-access";
/// Refresh token the fake rotates to.
pub const ROTATED_REFRESH: &str = "rotated-refresh";
/// Gateway order id returned for every initiated order.
pub const GATEWAY_ORDER_ID: &str = "order_RZP42";
/// Signature `/api/order/verify` accepts.
pub const GOOD_SIGNATURE: &str = "good-signature";

/// Calls observed by the fake backend.
#[derive(Default)]
pub struct Recorded {
    pub product_list_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub quote_requests: Mutex<Vec<Value>>,
    pub orders: Mutex<Vec<Value>>,
    pub verifications: AtomicUsize,
    /// Quote requests accepted before the rest are rejected.
    pub quote_limit: Mutex<Option<usize>>,
    /// Message `/api/order/initiate` rejects every order with.
    pub order_rejection: Mutex<Option<String>>,
    /// Every issued token is rejected, as after a server-side logout.
    pub tokens_revoked: AtomicBool,
}

impl Recorded {
    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn product_lists(&self) -> usize {
        self.product_list_calls.load(Ordering::SeqCst)
    }

    pub fn quote_count(&self) -> usize {
        self.quote_requests.lock().unwrap().len()
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    pub fn verification_count(&self) -> usize {
        self.verifications.load(Ordering::SeqCst)
    }

    pub fn limit_quotes(&self, limit: Option<usize>) {
        *self.quote_limit.lock().unwrap() = limit;
    }

    pub fn reject_orders(&self, message: &str) {
        *self.order_rejection.lock().unwrap() = Some(message.to_string());
    }

    pub fn revoke_tokens(&self) {
        self.tokens_revoked.store(true, Ordering::SeqCst);
    }
}

/// A fake backend listening on an ephemeral local port.
pub struct FakeBackend {
    pub url: String,
    pub recorded: Arc<Recorded>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let recorded = Arc::new(Recorded::default());
        let app = Router::new()
            .route("/api/products/", get(list_products))
            .route("/api/products/{id}", get(get_product))
            .route("/api/token/pair", post(token_pair))
            .route("/api/token/refresh", post(token_refresh))
            .route("/api/auth/register", post(register))
            .route("/api/auth/me", get(me))
            .route("/api/quotes/request", post(quote_request))
            .route("/api/order/initiate", post(initiate_order))
            .route("/api/order/my-addresses", get(my_addresses))
            .route("/api/order/verify", post(verify_payment))
            .with_state(Arc::clone(&recorded));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            recorded,
        }
    }
}

pub fn products() -> Value {
    json!([
        {
            "id": 1,
            "name": "Unity Pro",
            "slug": "unity-pro",
            "category": "Software",
            "description": "Real-time 3D development platform.",
            "price": "1999.00",
            "price_type": "fixed",
            "images": ["/media/unity.png"],
            "features": ["Annual licence"],
            "specs": {"Seats": 1},
            "rating": 4.8,
            "reviews": 120
        },
        {
            "id": 2,
            "name": "Fleet Tracker X",
            "slug": "fleet-tracker-x",
            "category": "Hardware",
            "price": null,
            "price_type": "quote",
            "images": []
        },
        {
            "id": 3,
            "name": "BlackBox 4K",
            "slug": "blackbox-4k",
            "category": "Hardware",
            "price": "249.75",
            "price_type": "fixed",
            "images": []
        }
    ])
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn authorized(recorded: &Recorded, headers: &HeaderMap) -> bool {
    !recorded.tokens_revoked.load(Ordering::SeqCst)
        && matches!(bearer(headers), Some(LOGIN_ACCESS | FRESH_ACCESS))
}

fn rejected(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"message": message}))).into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Given token not valid for any token type"})),
    )
        .into_response()
}

fn profile() -> Value {
    json!({
        "id": 7,
        "email": "meera@example.com",
        "first_name": "Meera",
        "last_name": "Iyer",
        "company_name": "Iyer Logistics"
    })
}

async fn list_products(State(recorded): State<Arc<Recorded>>) -> Json<Value> {
    recorded.product_list_calls.fetch_add(1, Ordering::SeqCst);
    Json(products())
}

async fn get_product(Path(id): Path<u64>) -> Response {
    let products = products();
    let found = products
        .as_array()
        .and_then(|all| all.iter().find(|p| p["id"] == json!(id)).cloned());
    match found {
        Some(product) => Json(product).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not Found"}))).into_response(),
    }
}

async fn token_pair(Json(body): Json<Value>) -> Response {
    if body["password"] == PASSWORD {
        Json(json!({"access": LOGIN_ACCESS, "refresh": LOGIN_REFRESH})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "No active account found with the given credentials"})),
        )
            .into_response()
    }
}

async fn token_refresh(State(recorded): State<Arc<Recorded>>, Json(body): Json<Value>) -> Response {
    recorded.refresh_calls.fetch_add(1, Ordering::SeqCst);
    // Long enough for concurrent callers to pile up behind one refresh.
    tokio::time::sleep(Duration::from_millis(100)).await;
    if body["refresh"] == LOGIN_REFRESH && !recorded.tokens_revoked.load(Ordering::SeqCst) {
        Json(json!({"access": FRESH_ACCESS, "refresh": ROTATED_REFRESH})).into_response()
    } else {
        unauthorized()
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@example.com" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Email already registered"})),
        )
            .into_response();
    }
    Json(json!({
        "access": LOGIN_ACCESS,
        "refresh": LOGIN_REFRESH,
        "user": {
            "id": 8,
            "email": body["email"],
            "first_name": body["first_name"],
            "last_name": body["last_name"],
            "company_name": body["company_name"]
        }
    }))
    .into_response()
}

async fn me(State(recorded): State<Arc<Recorded>>, headers: HeaderMap) -> Response {
    if !authorized(&recorded, &headers) {
        return unauthorized();
    }
    Json(profile()).into_response()
}

async fn quote_request(
    State(recorded): State<Arc<Recorded>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&recorded, &headers) {
        return unauthorized();
    }
    let limit = *recorded.quote_limit.lock().unwrap();
    let mut requests = recorded.quote_requests.lock().unwrap();
    if limit.is_some_and(|limit| requests.len() >= limit) {
        return rejected("Quote service unavailable");
    }
    requests.push(body);
    Json(json!({"id": requests.len(), "message": "Quote request received"})).into_response()
}

async fn initiate_order(
    State(recorded): State<Arc<Recorded>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&recorded, &headers) {
        return unauthorized();
    }
    if let Some(message) = recorded.order_rejection.lock().unwrap().clone() {
        return rejected(&message);
    }
    recorded.orders.lock().unwrap().push(body);
    Json(json!({
        "order_id": 42,
        "razorpay_order_id": GATEWAY_ORDER_ID,
        "amount": "1999.00",
        "currency": "INR",
        "key_id": "rzp_test_key"
    }))
    .into_response()
}

async fn my_addresses(State(recorded): State<Arc<Recorded>>, headers: HeaderMap) -> Response {
    if !authorized(&recorded, &headers) {
        return unauthorized();
    }
    Json(json!([])).into_response()
}

async fn verify_payment(
    State(recorded): State<Arc<Recorded>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&recorded, &headers) {
        return unauthorized();
    }
    recorded.verifications.fetch_add(1, Ordering::SeqCst);
    if body["razorpay_signature"] == GOOD_SIGNATURE {
        Json(json!({"status": "success"})).into_response()
    } else {
        rejected("Signature mismatch")
    }
}
