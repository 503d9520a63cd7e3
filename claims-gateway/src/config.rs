//! Process configuration, read once at startup and passed down by reference.
//! Handlers never look at the environment themselves.

use claim_flow::AmountRule;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::idempotency::{DEFAULT_CAPACITY, DEFAULT_TTL};

pub const DEFAULT_PROVIDER_BASE: &str = "https://api.usecanopy.com/v1";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Credentials presented to the provider. The secret never shows up in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub timeout: Option<Duration>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: None,
            client_secret: None,
            timeout: None,
        }
    }

    pub fn with_credentials(mut self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Enough to read from the provider: the client id alone
    pub fn listing_credentials(&self) -> Option<Credentials> {
        let client_id = self.client_id.clone()?;
        Some(Credentials {
            client_id,
            client_secret: self.client_secret.clone(),
        })
    }

    /// Needed to submit or connect: client id and secret
    pub fn submission_credentials(&self) -> Option<Credentials> {
        let client_id = self.client_id.clone()?;
        let client_secret = self.client_secret.clone()?;
        Some(Credentials {
            client_id,
            client_secret: Some(client_secret),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.client_id.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub amount_rule: AmountRule,
    pub provider: ProviderConfig,
    pub idempotency: IdempotencyLimits,
}

/// Bounds on the idempotency replay store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdempotencyLimits {
    pub ttl: Duration,
    pub capacity: usize,
}

impl Default for IdempotencyLimits {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => parse_number::<u16>("PORT", &raw)?,
            None => DEFAULT_PORT,
        };

        let amount_rule = match get("CLAIMS_AMOUNT_RULE") {
            Some(raw) => raw
                .parse::<AmountRule>()
                .map_err(|reason| ConfigError::Invalid {
                    key: "CLAIMS_AMOUNT_RULE",
                    reason,
                })?,
            None => AmountRule::default(),
        };

        let timeout = match get("CANOPY_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(parse_number("CANOPY_TIMEOUT_SECS", &raw)?)),
            None => None,
        };

        let mut idempotency = IdempotencyLimits::default();
        if let Some(raw) = get("IDEMPOTENCY_TTL_SECS") {
            idempotency.ttl = Duration::from_secs(parse_number("IDEMPOTENCY_TTL_SECS", &raw)?);
        }
        if let Some(raw) = get("IDEMPOTENCY_CAPACITY") {
            idempotency.capacity = parse_number("IDEMPOTENCY_CAPACITY", &raw)?;
        }

        let log_format = match get("LOG_FORMAT").as_deref() {
            Some("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            port,
            log_format,
            amount_rule,
            provider: ProviderConfig {
                base_url: get("CANOPY_API_BASE").unwrap_or_else(|| DEFAULT_PROVIDER_BASE.to_string()),
                client_id: get("CANOPY_CLIENT_ID"),
                client_secret: get("CANOPY_CLIENT_SECRET"),
                timeout,
            },
            idempotency,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}
