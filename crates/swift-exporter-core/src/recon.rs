use std::time::Duration;

use serde_json::{Map, Value};
use swift_exporter_common::error::{ExporterError, Result};
use url::Url;

/// HTTP client for the Swift recon diagnostic endpoint.
pub struct ReconClient {
    base_addr: String,
    client: reqwest::Client,
}

impl ReconClient {
    pub fn new(addr: &str, timeout: Option<Duration>) -> Result<Self> {
        let trimmed = addr.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ExporterError::InvalidSourceAddress(
                "address must not be empty".to_string(),
            ));
        }
        Url::parse(trimmed)
            .map_err(|err| ExporterError::InvalidSourceAddress(format!("{trimmed}: {err}")))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|err| {
            ExporterError::InternalError(format!("failed to build http client: {err}"))
        })?;

        Ok(Self {
            base_addr: trimmed.to_string(),
            client,
        })
    }

    /// Startup reachability check. Trivially succeeds today; extension
    /// point for a real probe against the recon endpoint.
    pub async fn ping(&self) -> Result<()> {
        Ok(())
    }

    pub fn base_addr(&self) -> &str {
        &self.base_addr
    }

    /// Fetch one recon resource and decode it as a JSON object. Response
    /// status is not inspected; a non-JSON error body surfaces as a
    /// decode failure.
    pub async fn get(&self, resource: &str) -> Result<Map<String, Value>> {
        let url = format!("{}/recon/{resource}", self.base_addr);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| ExporterError::Fetch {
                resource: resource.to_string(),
                source: err,
            })?;

        response
            .json::<Map<String, Value>>()
            .await
            .map_err(|err| ExporterError::Decode {
                resource: resource.to_string(),
                source: err,
            })
    }
}
