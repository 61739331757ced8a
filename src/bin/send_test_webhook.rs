use anyhow::Result;
use payments_relay::config::AppConfig;
use payments_relay::http::middleware::signature::{sign_hex, GOCARDLESS_SIGNATURE_HEADER};
use tracing_subscriber::EnvFilter;

/// usage: send_test_webhook [base_url] [resource_type] [action] [resource_id]
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let mut args = std::env::args().skip(1);
    let base_url = args.next().unwrap_or_else(|| "http://localhost:3002".to_string());
    let resource_type = args.next().unwrap_or_else(|| "payments".to_string());
    let action = args.next().unwrap_or_else(|| "confirmed".to_string());
    let resource_id = args.next().unwrap_or_else(|| "PM_TEST_0001".to_string());

    let link_key = match resource_type.as_str() {
        "mandates" => "mandate",
        "subscriptions" => "subscription",
        _ => "payment",
    };
    let event_id = format!("EV{}", uuid::Uuid::new_v4().simple());
    let body = serde_json::to_vec(&serde_json::json!({
        "events": [{
            "id": event_id,
            "created_at": chrono::Utc::now().to_rfc3339(),
            "resource_type": resource_type,
            "action": action,
            "links": { link_key: resource_id },
            "details": {
                "origin": "api",
                "cause": format!("{resource_type}_{action}"),
                "description": "test event sent by send_test_webhook"
            }
        }]
    }))?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let health = client.get(format!("{base_url}/health")).send().await?;
    tracing::info!(status = health.status().as_u16(), "health check");

    let mut request = client
        .post(format!("{base_url}/api/gocardless/webhook"))
        .header("Content-Type", "application/json");
    if cfg.gocardless_webhook_secret.is_empty() {
        tracing::warn!("GOCARDLESS_WEBHOOK_SECRET not set; sending unsigned webhook");
    } else {
        request = request.header(
            GOCARDLESS_SIGNATURE_HEADER,
            sign_hex(&cfg.gocardless_webhook_secret, &body)?,
        );
    }

    let resp = request.body(body).send().await?;
    let status = resp.status();
    let text = resp.text().await?;
    if status.is_success() {
        tracing::info!(status = status.as_u16(), event_id = %event_id, "webhook accepted: {}", text);
    } else {
        tracing::error!(status = status.as_u16(), event_id = %event_id, "webhook rejected: {}", text);
    }
    Ok(())
}
