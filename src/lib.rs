pub mod config;
pub mod domain;
pub mod error;
pub mod http {
    pub mod handlers {
        pub mod ops;
        pub mod records;
        pub mod webhooks;
    }
    pub mod middleware {
        pub mod ip_allowlist;
        pub mod signature;
    }
    pub mod routes;
}
pub mod lifecycle;
pub mod providers;
pub mod repo;
pub mod service {
    pub mod frontend_notifier;
    pub mod record_writer;
    pub mod signature_tracker;
    pub mod webhook_receiver;
}

use config::AppConfig;
use http::middleware::ip_allowlist::IpAllowList;
use http::middleware::signature::WebhookAuth;
use providers::MetadataProvider;
use repo::DocumentStore;
use service::frontend_notifier::StatusNotifier;
use service::signature_tracker::SignatureTracker;
use service::webhook_receiver::WebhookReceiver;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub receiver: WebhookReceiver,
    pub signature_tracker: SignatureTracker,
    pub store: Arc<dyn DocumentStore>,
    pub gocardless_auth: WebhookAuth,
    pub yousign_auth: WebhookAuth,
    pub ip_allowlist: IpAllowList,
    pub app_env: String,
}

impl AppState {
    pub fn from_config(
        cfg: &AppConfig,
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn StatusNotifier>,
        metadata: Option<Arc<dyn MetadataProvider>>,
    ) -> Self {
        let permissive = cfg.permissive();
        if permissive {
            tracing::warn!("webhook signature and source checks are disabled");
        }
        let notify_timeout = Duration::from_millis(cfg.notify_timeout_ms);

        Self {
            receiver: WebhookReceiver {
                store: store.clone(),
                notifier: notifier.clone(),
                metadata,
                collection: cfg.events_collection.clone(),
                notify_timeout,
            },
            signature_tracker: SignatureTracker {
                store: store.clone(),
                notifier,
                notify_timeout,
            },
            store,
            gocardless_auth: WebhookAuth::gocardless(&cfg.gocardless_webhook_secret, permissive),
            yousign_auth: WebhookAuth::yousign(cfg.yousign_webhook_secret.as_deref(), permissive),
            ip_allowlist: IpAllowList::new(cfg.allowed_ips.clone(), permissive, cfg.trust_forwarded_for),
            app_env: cfg.app_env.clone(),
        }
    }
}
