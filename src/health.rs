//! Backend liveness probe against `GET /healthz`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ClientError, Result};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub app: Option<String>,
}

impl HealthReport {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Map a WebSocket host to the HTTP origin serving the same backend.
pub fn http_base(host: &str) -> Result<String> {
    let host = host.trim();
    let host = host.strip_suffix('/').unwrap_or(host);
    if let Some(rest) = host.strip_prefix("ws://") {
        Ok(format!("http://{}", rest))
    } else if let Some(rest) = host.strip_prefix("wss://") {
        Ok(format!("https://{}", rest))
    } else if host.starts_with("http://") || host.starts_with("https://") {
        Ok(host.to_string())
    } else {
        Err(ClientError::Config(format!(
            "cannot derive an HTTP address from host {:?}",
            host
        )))
    }
}

pub fn health_url(host: &str) -> Result<String> {
    Ok(format!("{}/healthz", http_base(host)?))
}

/// Fetch and decode the backend's health report.
pub async fn probe(host: &str) -> Result<HealthReport> {
    let url = health_url(host)?;
    let client = Client::builder().timeout(PROBE_TIMEOUT).build()?;
    let report = client
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .json::<HealthReport>()
        .await?;
    Ok(report)
}
