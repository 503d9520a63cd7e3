//! Canopy Connect API client.
//!
//! Every call is a single request with `Authorization: Bearer <client id>`.
//! Responses are handed back as status plus raw body; deciding what a
//! non-2xx means is left to the route handlers.

use async_trait::async_trait;
use claim_flow::{ClaimRecord, IDEMPOTENCY_KEY_HEADER};
use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::config::{Credentials, ProviderConfig};

pub const SERVICINGS_PATH: &str = "/servicings";
pub const PULLS_PATH: &str = "/pulls";
pub const CARRIERS_PATH: &str = "/auth/carriers";
pub const CONSENT_AND_CONNECT_PATH: &str = "/auth/consentAndConnect";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Provider returned a body that is not JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Status and body of a provider response, unparsed
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
    pub status: u16,
    pub raw: String,
}

impl ProviderReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<Value, ProviderError> {
        Ok(serde_json::from_str(&self.raw)?)
    }
}

/// Operations the gateway needs from the provider
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Submit a claim as a servicing request
    async fn submit_servicing(
        &self,
        credentials: &Credentials,
        record: &ClaimRecord,
        idempotency_key: Option<&str>,
    ) -> Result<ProviderReply, ProviderError>;

    async fn list_servicings(&self, credentials: &Credentials) -> Result<ProviderReply, ProviderError>;

    /// Policy data pulled from connected carriers
    async fn list_pulls(&self, credentials: &Credentials) -> Result<ProviderReply, ProviderError>;

    async fn list_carriers(&self, credentials: &Credentials) -> Result<ProviderReply, ProviderError>;

    async fn consent_and_connect(&self, credentials: &Credentials) -> Result<ProviderReply, ProviderError>;
}

pub struct CanopyClient {
    base_url: String,
    client: Client,
}

impl CanopyClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<ProviderReply, ProviderError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let raw = response.text().await?;
        debug!(status, bytes = raw.len(), "provider replied");
        Ok(ProviderReply { status, raw })
    }
}

#[async_trait]
impl ProviderApi for CanopyClient {
    async fn submit_servicing(
        &self,
        credentials: &Credentials,
        record: &ClaimRecord,
        idempotency_key: Option<&str>,
    ) -> Result<ProviderReply, ProviderError> {
        let url = self.url(SERVICINGS_PATH);
        debug!("POST {}", url);

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(&credentials.client_id)
            .json(record);
        if let Some(key) = idempotency_key {
            request = request.header(IDEMPOTENCY_KEY_HEADER, key);
        }

        self.send(request).await
    }

    async fn list_servicings(&self, credentials: &Credentials) -> Result<ProviderReply, ProviderError> {
        let url = self.url(SERVICINGS_PATH);
        debug!("GET {}", url);
        self.send(self.client.get(&url).bearer_auth(&credentials.client_id))
            .await
    }

    async fn list_pulls(&self, credentials: &Credentials) -> Result<ProviderReply, ProviderError> {
        let url = self.url(PULLS_PATH);
        debug!("GET {}", url);
        self.send(self.client.get(&url).bearer_auth(&credentials.client_id))
            .await
    }

    async fn list_carriers(&self, credentials: &Credentials) -> Result<ProviderReply, ProviderError> {
        let url = self.url(CARRIERS_PATH);
        debug!("GET {}", url);
        self.send(self.client.get(&url).bearer_auth(&credentials.client_id))
            .await
    }

    async fn consent_and_connect(&self, credentials: &Credentials) -> Result<ProviderReply, ProviderError> {
        let url = self.url(CONSENT_AND_CONNECT_PATH);
        debug!("POST {}", url);

        let request = self
            .client
            .post(&url)
            .bearer_auth(&credentials.client_id)
            .json(&json!({
                "client_id": credentials.client_id,
                "client_secret": credentials.client_secret,
            }));

        self.send(request).await
    }
}
