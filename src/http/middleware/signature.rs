use crate::domain::event::is_blank;
use crate::error::WebhookError;
use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const GOCARDLESS_SIGNATURE_HEADER: &str = "webhook-signature";
pub const YOUSIGN_SIGNATURE_HEADER: &str = "x-yousign-signature-256";
pub const YOUSIGN_SIGNATURE_PREFIX: &str = "sha256=";
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Hex-encoded HMAC-SHA256 of `body` under `secret`.
pub fn sign_hex(secret: &str, body: &[u8]) -> anyhow::Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid hmac key: {e}"))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
    prefix: Option<String>,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            prefix: None,
        }
    }

    pub fn with_prefix(secret: impl Into<Vec<u8>>, prefix: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            prefix: Some(prefix.into()),
        }
    }

    pub fn verify(&self, payload: &[u8], signature: &str) -> bool {
        let signature = signature.trim();
        let signature = match &self.prefix {
            Some(prefix) => signature.strip_prefix(prefix.as_str()).unwrap_or(signature),
            None => signature,
        };
        let Ok(provided) = hex::decode(signature) else {
            return false;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        expected.as_slice().ct_eq(&provided).into()
    }
}

#[derive(Debug, Clone)]
pub enum AuthMode {
    Verify(SignatureVerifier),
    /// No secret configured and no explicit bypass: every request is refused.
    Unconfigured,
    Bypass,
}

#[derive(Debug, Clone)]
pub struct WebhookAuth {
    pub header_name: &'static str,
    pub mode: AuthMode,
}

impl WebhookAuth {
    pub fn new(
        header_name: &'static str,
        secret: Option<&str>,
        prefix: Option<&str>,
        permissive: bool,
    ) -> Self {
        let mode = match secret.filter(|s| !s.is_empty()) {
            _ if permissive => AuthMode::Bypass,
            Some(secret) => match prefix {
                Some(prefix) => AuthMode::Verify(SignatureVerifier::with_prefix(secret, prefix)),
                None => AuthMode::Verify(SignatureVerifier::new(secret)),
            },
            None => AuthMode::Unconfigured,
        };
        Self { header_name, mode }
    }

    pub fn gocardless(secret: &str, permissive: bool) -> Self {
        Self::new(GOCARDLESS_SIGNATURE_HEADER, Some(secret), None, permissive)
    }

    pub fn yousign(secret: Option<&str>, permissive: bool) -> Self {
        Self::new(
            YOUSIGN_SIGNATURE_HEADER,
            secret,
            Some(YOUSIGN_SIGNATURE_PREFIX),
            permissive,
        )
    }

    pub fn check(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), WebhookError> {
        let verifier = match &self.mode {
            AuthMode::Bypass => return Ok(()),
            AuthMode::Unconfigured => return Err(WebhookError::SecretNotConfigured),
            AuthMode::Verify(verifier) => verifier,
        };

        let signature = headers
            .get(self.header_name)
            .and_then(|h| h.to_str().ok())
            .filter(|s| !s.trim().is_empty())
            .ok_or(WebhookError::MissingSignature)?;

        if verifier.verify(body, signature) {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }
}

/// Buffers the raw body, rejects blank bodies and bad signatures, then hands
/// the untouched bytes on to the handler.
pub async fn require_signature(
    State(auth): State<WebhookAuth>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return WebhookError::MalformedBody(format!("unreadable body: {err}")).into_response();
        }
    };

    if is_blank(&bytes) {
        return WebhookError::EmptyBody.into_response();
    }

    if let Err(err) = auth.check(&parts.headers, &bytes) {
        tracing::warn!(
            path = %parts.uri.path(),
            header = auth.header_name,
            code = err.code(),
            "webhook signature rejected"
        );
        return err.into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
