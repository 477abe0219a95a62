//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (?category=Software|Hardware)
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (session database)
//!
//! # Products
//! GET  /product/{key}          - Product detail ("<id>" or "<id>-<slug>")
//!
//! # Cart
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add product
//! POST /cart/update            - Change quantity by +/- delta
//! POST /cart/set               - Set quantity
//! POST /cart/remove            - Remove line
//! POST /cart/clear             - Empty cart
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout               - Proceed from the cart
//! GET  /checkout/decision      - Combined vs split choice
//! POST /checkout/decision
//! GET  /checkout/details       - Details form (login required)
//! POST /checkout/details       - Submit quotes and/or create the order
//! GET  /checkout/payment       - Payment dialog
//! POST /checkout/verify        - Verify gateway payment
//! POST /checkout/back          - Previous step
//! GET  /checkout/success       - Confirmation
//!
//! # Quotes (login required)
//! GET  /quote/{product_id}     - Request-a-quote form
//! POST /quote/{product_id}     - Submit quote request
//!
//! # Auth
//! GET  /auth                   - Redirect to login
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! POST /auth/logout            - Logout action
//!
//! # Account (requires auth)
//! GET  /account                - Profile and saved addresses
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod products;
pub mod quotes;

use axum::{
    Router,
    handler::Handler,
    routing::{get, post},
};

use crate::middleware::{auth_rate_limiter, checkout_rate_limiter, form_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(auth::index))
        .route(
            "/login",
            get(auth::login_page).post(auth::login.layer(auth_rate_limiter())),
        )
        .route(
            "/register",
            get(auth::register_page).post(auth::register.layer(auth_rate_limiter())),
        )
        .route("/logout", post(auth::logout))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/set", post(cart::set_quantity))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::start))
        .route(
            "/decision",
            get(checkout::decision_page).post(checkout::decide),
        )
        .route(
            "/details",
            get(checkout::details_page)
                .post(checkout::submit_details.layer(checkout_rate_limiter())),
        )
        .route("/payment", get(checkout::payment_page))
        .route(
            "/verify",
            post(checkout::verify.layer(checkout_rate_limiter())),
        )
        .route("/back", post(checkout::back))
        .route("/success", get(checkout::success))
}

/// Create the quote routes router.
pub fn quote_routes() -> Router<AppState> {
    Router::new().route(
        "/{product_id}",
        get(quotes::show).post(quotes::submit.layer(form_rate_limiter())),
    )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Product detail
        .route("/product/{key}", get(products::show))
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout wizard
        .nest("/checkout", checkout_routes())
        // Quote requests
        .nest("/quote", quote_routes())
        // Account routes
        .route("/account", get(account::index))
        // Auth routes
        .nest("/auth", auth_routes())
}
