use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    draft::ClaimDraft,
    error::{ClaimFlowError, Result},
};

/// Header carrying the client-generated key that identifies one logical submission
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Path of the claims route on the gateway service
pub const CLAIMS_PATH: &str = "/api/claims";

/// One submission attempt: a snapshot of the draft plus the key that ties
/// retries of the same draft together
#[derive(Debug, Clone)]
pub struct ClaimSubmission {
    pub idempotency_key: Uuid,
    pub draft: ClaimDraft,
}

/// What the gateway client keeps from a successful response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayReceipt {
    pub status: u16,
}

/// Anything that can carry a claim to the backend.
///
/// Implementations make at most one attempt per call. Retrying is the caller's
/// business.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn post_claim(&self, submission: &ClaimSubmission) -> Result<GatewayReceipt>;
}

/// Where the gateway service lives. Built once by the host and handed to the client.
#[derive(Debug, Clone)]
pub struct GatewayClientConfig {
    pub base_url: String,
    /// No timeout unless the host asks for one
    pub timeout: Option<Duration>,
}

impl GatewayClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn claims_endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), CLAIMS_PATH)
    }
}

/// `SubmissionGateway` over HTTP: one unauthenticated JSON POST per submission.
/// Also reads back the claim listing from the same route.
pub struct HttpSubmissionGateway {
    client: Client,
    endpoint: String,
}

impl HttpSubmissionGateway {
    pub fn new(config: &GatewayClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.claims_endpoint(),
        })
    }

    /// Claims already filed, as `GET /api/claims` on the gateway lists them
    pub async fn list_claims(&self) -> Result<Value> {
        debug!(endpoint = %self.endpoint, "GET claims");

        let response = self.client.get(&self.endpoint).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = %status, "gateway refused claim listing");
            return Err(ClaimFlowError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let mut envelope: Value = serde_json::from_str(&body)?;
        Ok(envelope.get_mut("claims").map(Value::take).unwrap_or_default())
    }
}

#[async_trait]
impl SubmissionGateway for HttpSubmissionGateway {
    async fn post_claim(&self, submission: &ClaimSubmission) -> Result<GatewayReceipt> {
        debug!(
            endpoint = %self.endpoint,
            idempotency_key = %submission.idempotency_key,
            documents = submission.draft.documents.len(),
            "POST claim"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(IDEMPOTENCY_KEY_HEADER, submission.idempotency_key.to_string())
            .json(&submission.draft)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "gateway rejected claim");
            return Err(ClaimFlowError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(GatewayReceipt {
            status: status.as_u16(),
        })
    }
}
