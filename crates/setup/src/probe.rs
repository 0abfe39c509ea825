//! Provider-specific credential probes.
//!
//! A probe answers one question: does this candidate credential (or local
//! daemon) actually work? Committing a validated credential is the
//! validator's job; probes are side-effect free.

use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, info},
};

use concord_catalog::remote::shared_http_client;
use concord_common::providers;

use crate::error::ValidationError;

/// One probe attempt gets this long before it counts as unreachable.
const PROBE_TIMEOUT_SECS: u64 = 10;

/// What a probe needs to know about the candidate.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub provider_id: String,
    pub secret: Option<Secret<String>>,
    /// Endpoint override; the known-provider default is used when unset.
    pub base_url: Option<String>,
}

/// Provider-specific credential check, behind a trait so tests can inject
/// deterministic outcomes.
#[async_trait]
pub trait ProviderProbe: Send + Sync {
    async fn probe(&self, request: &ProbeRequest) -> Result<(), ValidationError>;
}

/// Live probe: local-daemon providers get a status check against the local
/// service, keyed providers a placeholder round trip authorized with the
/// candidate secret.
#[derive(Debug, Default)]
pub struct HttpProbe;

#[async_trait]
impl ProviderProbe for HttpProbe {
    async fn probe(&self, request: &ProbeRequest) -> Result<(), ValidationError> {
        let started = std::time::Instant::now();
        let outcome = tokio::time::timeout(
            Duration::from_secs(PROBE_TIMEOUT_SECS),
            self.dispatch(request),
        )
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(ValidationError::NetworkUnreachable(format!(
                "probe timed out after {PROBE_TIMEOUT_SECS} seconds"
            ))),
        };

        info!(
            provider = %request.provider_id,
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis(),
            "credential probe finished"
        );
        result
    }
}

impl HttpProbe {
    async fn dispatch(&self, request: &ProbeRequest) -> Result<(), ValidationError> {
        if providers::is_keyless(&request.provider_id) {
            self.daemon_status(request).await
        } else {
            self.trial_call(request).await
        }
    }

    /// `GET {base}/api/status`, expects `{"detected": true}`.
    async fn daemon_status(&self, request: &ProbeRequest) -> Result<(), ValidationError> {
        let base = probe_base_url(request).ok_or(ValidationError::LocalServiceNotDetected)?;
        let url = format!("{base}/api/status");
        debug!(provider = %request.provider_id, url = %url, "probing local service status");

        let response = shared_http_client()
            .get(&url)
            .send()
            .await
            .map_err(|_| ValidationError::LocalServiceNotDetected)?;

        if !response.status().is_success() {
            return Err(ValidationError::LocalServiceNotDetected);
        }

        #[derive(serde::Deserialize)]
        struct StatusPayload {
            #[serde(default)]
            detected: bool,
        }

        let payload: StatusPayload = response
            .json()
            .await
            .map_err(|_| ValidationError::LocalServiceNotDetected)?;

        if payload.detected {
            Ok(())
        } else {
            Err(ValidationError::LocalServiceNotDetected)
        }
    }

    /// Placeholder round trip authorized with the candidate secret.
    async fn trial_call(&self, request: &ProbeRequest) -> Result<(), ValidationError> {
        let Some(secret) = &request.secret else {
            return Err(ValidationError::MissingSecret);
        };
        let base = probe_base_url(request).ok_or_else(|| {
            ValidationError::NetworkUnreachable(format!(
                "no endpoint configured for provider '{}'",
                request.provider_id
            ))
        })?;
        let url = format!("{base}/v1/models");
        debug!(provider = %request.provider_id, url = %url, "probing provider credential");

        let response = shared_http_client()
            .get(&url)
            .bearer_auth(secret.expose_secret())
            .send()
            .await
            .map_err(|e| ValidationError::NetworkUnreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ValidationError::ProviderRejected(format!("HTTP {status}")));
        }
        Err(ValidationError::NetworkUnreachable(format!(
            "HTTP {status} from provider endpoint"
        )))
    }
}

/// The endpoint to probe: the request override, else the known-provider
/// default, normalized without a trailing slash.
fn probe_base_url(request: &ProbeRequest) -> Option<String> {
    let raw = request
        .base_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .or_else(|| {
            providers::find_known(&request.provider_id)
                .and_then(|p| p.default_base_url)
                .map(str::to_string)
        })?;
    Some(normalize_base_url(&raw))
}

/// Normalize a base URL for probing: lowercase scheme/host, keep an explicit
/// port, drop the trailing slash.
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(parsed) = url::Url::parse(trimmed) {
        let scheme = parsed.scheme().to_ascii_lowercase();
        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
        let mut normalized = format!("{scheme}://{host}");
        if let Some(port) = parsed.port() {
            normalized.push(':');
            normalized.push_str(&port.to_string());
        }
        normalized.push_str(parsed.path().trim_end_matches('/'));
        return normalized;
    }
    trimmed.trim_end_matches('/').to_string()
}
