pub mod config;
pub mod idempotency;
pub mod provider;
pub mod service;

pub use config::{
    ConfigError, Credentials, GatewayConfig, IdempotencyLimits, LogFormat, ProviderConfig,
};
pub use idempotency::{IdempotencyStore, InMemoryIdempotencyStore, Reservation};
pub use provider::{CanopyClient, ProviderApi, ProviderError};
pub use service::{AppState, create_app};
