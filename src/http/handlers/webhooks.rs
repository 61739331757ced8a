use crate::domain::event::parse_body;
use crate::domain::signature_request::YousignWebhook;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

pub async fn gocardless_webhook(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let events = match parse_body(&body) {
        Ok(events) => events,
        Err(err) => {
            tracing::warn!(code = err.code(), "rejecting gocardless webhook: {}", err);
            return err.into_response();
        }
    };

    tracing::info!(count = events.len(), "gocardless webhook received");
    match state.receiver.process_batch(&events).await {
        Ok(ack) => (axum::http::StatusCode::OK, Json(ack)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn yousign_webhook(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let hook = match YousignWebhook::parse(&body) {
        Ok(hook) => hook,
        Err(err) => {
            tracing::warn!(code = err.code(), "rejecting yousign webhook: {}", err);
            return err.into_response();
        }
    };

    tracing::info!(event = hook.event_name(), "yousign webhook received");
    match state.signature_tracker.apply(&hook).await {
        Ok(result) => (
            axum::http::StatusCode::OK,
            Json(serde_json::json!({"received": true, "result": result})),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
