use payments_relay::config::{AppConfig, StoreBackend};
use payments_relay::http::routes::build_router;
use payments_relay::providers::gocardless::GoCardlessClient;
use payments_relay::providers::MetadataProvider;
use payments_relay::repo::{DocumentStore, InMemoryDocumentStore, PgDocumentStore, RedisDocumentStore};
use payments_relay::service::frontend_notifier::FrontendNotifier;
use payments_relay::AppState;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    cfg.validate()?;

    let store: Arc<dyn DocumentStore> = match cfg.store_backend {
        StoreBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&cfg.database_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            Arc::new(PgDocumentStore { pool })
        }
        StoreBackend::Redis => Arc::new(RedisDocumentStore::new(redis::Client::open(cfg.redis_url.clone())?)),
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; records are lost on restart");
            Arc::new(InMemoryDocumentStore::new())
        }
    };

    let client = reqwest::Client::new();
    let notifier = Arc::new(FrontendNotifier {
        base_url: cfg.frontend_url.clone(),
        client: client.clone(),
    });
    let metadata = cfg.gocardless_access_token.clone().map(|token| {
        Arc::new(GoCardlessClient::new(token, cfg.notify_timeout_ms, client.clone())) as Arc<dyn MetadataProvider>
    });

    let state = AppState::from_config(&cfg, store, notifier, metadata);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(
        env = %cfg.app_env,
        store = ?cfg.store_backend,
        collection = %cfg.events_collection,
        "listening on {}",
        cfg.bind_addr
    );
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
