use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::{DietError, Result};

/// The one path every upstream call takes.
///
/// Implementations make a single attempt bounded by a timeout and return the
/// response body of a 2xx reply. Anything else is `UpstreamUnavailable`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, service: &str, url: &str, query: &[(String, String)]) -> Result<String>;

    async fn post_json(
        &self,
        service: &str,
        url: &str,
        bearer: Option<&str>,
        body: &Value,
    ) -> Result<String>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dietcraft/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DietError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    fn send_error(&self, service: &str, err: reqwest::Error) -> DietError {
        if err.is_timeout() {
            DietError::upstream(service, format!("timed out after {:?}", self.timeout))
        } else {
            DietError::upstream(service, format!("request failed: {err}"))
        }
    }

    async fn read_body(&self, service: &str, resp: reqwest::Response) -> Result<String> {
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DietError::upstream(service, format!("{status} - {body}")));
        }
        resp.text().await.map_err(|e| self.send_error(service, e))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, service: &str, url: &str, query: &[(String, String)]) -> Result<String> {
        debug!(service, url, params = query.len(), "GET");
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.send_error(service, e))?;
        self.read_body(service, resp).await
    }

    async fn post_json(
        &self,
        service: &str,
        url: &str,
        bearer: Option<&str>,
        body: &Value,
    ) -> Result<String> {
        debug!(service, url, "POST");
        let mut req = self.client.post(url).json(body);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.map_err(|e| self.send_error(service, e))?;
        self.read_body(service, resp).await
    }
}
