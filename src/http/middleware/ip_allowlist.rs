use crate::error::WebhookError;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct IpAllowList {
    pub allowed: Arc<Vec<IpAddr>>,
    pub enabled: bool,
    pub trust_forwarded_for: bool,
}

impl IpAllowList {
    /// An empty list, or permissive mode, lets everything through.
    pub fn new(allowed: Vec<IpAddr>, permissive: bool, trust_forwarded_for: bool) -> Self {
        Self {
            enabled: !allowed.is_empty() && !permissive,
            allowed: Arc::new(allowed),
            trust_forwarded_for,
        }
    }

    pub fn permits(&self, ip: Option<IpAddr>) -> bool {
        if !self.enabled {
            return true;
        }
        ip.is_some_and(|ip| self.allowed.contains(&ip))
    }

    pub fn client_ip<B>(&self, request: &Request<B>) -> Option<IpAddr> {
        if self.trust_forwarded_for {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse::<IpAddr>().ok());
            if forwarded.is_some() {
                return forwarded;
            }
        }
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    }
}

pub async fn enforce(
    State(allow_list): State<IpAllowList>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !allow_list.enabled {
        return next.run(request).await;
    }

    let ip = allow_list.client_ip(&request);
    if !allow_list.permits(ip) {
        let source = ip.map(|ip| ip.to_string()).unwrap_or_else(|| "unknown".to_string());
        tracing::warn!(source = %source, path = %request.uri().path(), "webhook source not in allow list");
        return WebhookError::ForbiddenSource(source).into_response();
    }

    next.run(request).await
}
