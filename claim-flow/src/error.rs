use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum ClaimFlowError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gateway answered {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown claim field: {0}")]
    UnknownField(String),

    #[error("Unknown claim type: {0}")]
    UnknownClaimType(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, ClaimFlowError>;
