use crate::http::handlers::{ops, records, webhooks};
use crate::http::middleware::{ip_allowlist, signature};
use crate::AppState;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

pub fn build_router(state: AppState) -> Router {
    // route layers run last-added first: source gate, then body + signature
    let gocardless = Router::new()
        .route("/api/gocardless/webhook", post(webhooks::gocardless_webhook))
        .route("/webhook", post(webhooks::gocardless_webhook))
        .route_layer(from_fn_with_state(
            state.gocardless_auth.clone(),
            signature::require_signature,
        ))
        .route_layer(from_fn_with_state(
            state.ip_allowlist.clone(),
            ip_allowlist::enforce,
        ));

    let yousign = Router::new()
        .route("/api/yousign/webhook", post(webhooks::yousign_webhook))
        .route_layer(from_fn_with_state(
            state.yousign_auth.clone(),
            signature::require_signature,
        ));

    Router::new()
        .route("/health", get(ops::health))
        .route("/ops/liveness", get(ops::liveness))
        .route("/ops/readiness", get(ops::readiness))
        .route("/records/:collection/:id", get(records::get_record))
        .merge(gocardless)
        .merge(yousign)
        .with_state(state)
}
