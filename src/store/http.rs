use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

use super::{DocumentStore, SearchBody, StoreResponse};
use crate::config::StoreConfig;
use crate::error::{CoreError, Result};

/// HTTP client for the document store
#[derive(Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpDocumentStore {
    /// Create a client from store configuration
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                CoreError::Configuration(format!("Failed to create store client: {}", e))
            })?;

        let password = config
            .password_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok());

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password,
        })
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn search(&self, index: &str, body: &SearchBody) -> Result<StoreResponse> {
        let url = format!("{}/{}/_search", self.base_url, index);

        let mut request = self.client.post(&url).json(body);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CoreError::Store(format!("Store request timed out: {}", e))
            } else {
                CoreError::Store(format!("Store request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            error!(
                status = status.as_u16(),
                index = index,
                "Store returned error"
            );
            return Err(CoreError::Store(format!(
                "Store returned status {}: {}",
                status,
                if body_text.is_empty() {
                    "no response body"
                } else {
                    &body_text
                }
            )));
        }

        let parsed: StoreResponse = response.json().await?;
        debug!(
            index = index,
            total = parsed.total(),
            took_ms = ?parsed.took,
            "Search executed"
        );
        Ok(parsed)
    }
}
