pub mod attachments;
pub mod draft;
pub mod error;
pub mod form;
pub mod gateway;
pub mod record;
pub mod validation;

// Re-export commonly used types
pub use attachments::{ACCEPTED_EXTENSIONS, Attachment, AttachmentStager};
pub use draft::{ClaimDraft, ClaimField, ClaimType};
pub use error::{ClaimFlowError, Result};
pub use form::{AbandonHandle, ClaimForm, SubmissionResult, SubmitOutcome};
pub use gateway::{
    CLAIMS_PATH, ClaimSubmission, GatewayClientConfig, GatewayReceipt, HttpSubmissionGateway,
    IDEMPOTENCY_KEY_HEADER, SubmissionGateway,
};
pub use record::ClaimRecord;
pub use validation::{AmountRule, ValidationError};
