//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Start locked down and loosen only where a feature needs it. The checkout
//! payment dialog needs Razorpay's script, frames and API, and product images
//! are served from the backend origin.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use super::csp::CspNonce;
use crate::state::AppState;

/// Payment dialog script.
pub const RAZORPAY_CHECKOUT_ORIGIN: &str = "https://checkout.razorpay.com";
/// Payment dialog API and frames.
pub const RAZORPAY_API_ORIGIN: &str = "https://api.razorpay.com";

/// Build the `Content-Security-Policy` value.
///
/// `backend_origin` is where product media is served from.
#[must_use]
pub fn content_security_policy(nonce: Option<&str>, backend_origin: &str) -> String {
    let script_nonce = nonce
        .filter(|n| !n.is_empty())
        .map(|n| format!(" 'nonce-{n}'"))
        .unwrap_or_default();

    format!(
        "default-src 'none'; \
         script-src 'self'{script_nonce} {RAZORPAY_CHECKOUT_ORIGIN}; \
         style-src 'self'; \
         font-src 'self'; \
         img-src 'self' data: {backend_origin}; \
         connect-src 'self' {RAZORPAY_API_ORIGIN}; \
         frame-src {RAZORPAY_CHECKOUT_ORIGIN} {RAZORPAY_API_ORIGIN}; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'"
    )
}

/// Scheme, host and port of a URL, for use as a CSP source.
fn origin_of(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_default()
}

/// Add security headers to all responses.
///
/// - `X-Frame-Options: DENY`
/// - `X-Content-Type-Options: nosniff`
/// - `Referrer-Policy: strict-origin-when-cross-origin` (the gateway checks the referrer)
/// - `Content-Security-Policy` from [`content_security_policy`]
/// - `Permissions-Policy` denying sensitive features except `payment`
/// - `Cache-Control: no-store` on pages (session-specific content)
/// - `Cross-Origin-Opener-Policy: same-origin-allow-popups` for the payment popup
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let request_nonce = request.extensions().get::<CspNonce>().cloned();
    let is_static = request.uri().path().starts_with("/static/");

    let mut response = next.run(request).await;

    let nonce = request_nonce.or_else(|| response.extensions().get::<CspNonce>().cloned());
    let csp = content_security_policy(
        nonce.as_ref().map(CspNonce::value),
        &origin_of(&state.config().backend.api_url),
    );

    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    match HeaderValue::from_str(&csp) {
        Ok(value) => {
            headers.insert(CONTENT_SECURITY_POLICY, value);
        }
        Err(e) => tracing::error!(error = %e, "Invalid CSP header value"),
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             microphone=(), \
             payment=(self \"https://checkout.razorpay.com\" \"https://api.razorpay.com\"), \
             usb=()",
        ),
    );

    if !is_static {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin-allow-popups"),
    );

    headers.insert(
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );

    response
}
