//! Claim form state: the draft, the single in-flight flag and the callbacks
//! through which the host learns what happened.
//!
//! A form moves between two states, idle and submitting. `submit()` refuses
//! to start while another submission on the same form is awaiting the
//! gateway, and the flag is released on every exit path by a drop guard.
//!
//! Hosts that go away while a submission is in flight call
//! [`AbandonHandle::abandon`]. The pending `submit()` stops waiting and the
//! completion callback is not invoked. The HTTP request may still reach the
//! gateway.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    attachments::Attachment,
    draft::{ClaimDraft, ClaimField},
    error::Result,
    gateway::{ClaimSubmission, SubmissionGateway},
    validation::{AmountRule, ValidationError, check_draft},
};

pub const SUBMITTED_MESSAGE: &str = "Claim submitted successfully!";
pub const FAILED_MESSAGE: &str = "Error submitting claim";

/// Outcome handed to the completion callback
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResult {
    Submitted { message: String },
    Failed { message: String, detail: String },
}

impl SubmissionResult {
    pub fn message(&self) -> &str {
        match self {
            SubmissionResult::Submitted { message } | SubmissionResult::Failed { message, .. } => {
                message
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionResult::Submitted { .. })
    }
}

/// What a call to [`ClaimForm::submit`] did
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The gateway was called and the callback was invoked with this result
    Completed(SubmissionResult),
    /// Another submission is in flight; nothing was sent
    AlreadySubmitting,
    /// The draft failed the local checks; nothing was sent
    Incomplete(ValidationError),
    /// The host tore the form down; the result, if any, was dropped
    Abandoned,
}

pub type SubmitCallback = Box<dyn Fn(SubmissionResult) + Send + Sync>;
pub type CancelCallback = Box<dyn Fn() + Send + Sync>;

/// Cancellation token for a form. Cloneable so a host can keep one after
/// handing the form to a task.
#[derive(Clone)]
pub struct AbandonHandle {
    torn_down: Arc<watch::Sender<bool>>,
}

impl AbandonHandle {
    pub fn abandon(&self) {
        self.torn_down.send_replace(true);
    }

    pub fn is_abandoned(&self) -> bool {
        *self.torn_down.borrow()
    }
}

struct FormState {
    draft: ClaimDraft,
    idempotency_key: Uuid,
}

/// Clears the in-flight flag when dropped
struct SubmittingGuard<'a>(&'a AtomicBool);

impl<'a> SubmittingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmittingGuard(flag))
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ClaimForm {
    gateway: Arc<dyn SubmissionGateway>,
    state: Mutex<FormState>,
    submitting: AtomicBool,
    amount_rule: AmountRule,
    on_submit: SubmitCallback,
    on_cancel: CancelCallback,
    abandon: AbandonHandle,
}

impl ClaimForm {
    pub fn new(gateway: Arc<dyn SubmissionGateway>) -> Self {
        let (torn_down, _) = watch::channel(false);
        Self {
            gateway,
            state: Mutex::new(FormState {
                draft: ClaimDraft::new(),
                idempotency_key: Uuid::new_v4(),
            }),
            submitting: AtomicBool::new(false),
            amount_rule: AmountRule::default(),
            on_submit: Box::new(|_| {}),
            on_cancel: Box::new(|| {}),
            abandon: AbandonHandle {
                torn_down: Arc::new(torn_down),
            },
        }
    }

    pub fn on_submit(mut self, callback: impl Fn(SubmissionResult) + Send + Sync + 'static) -> Self {
        self.on_submit = Box::new(callback);
        self
    }

    pub fn on_cancel(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_cancel = Box::new(callback);
        self
    }

    pub fn with_amount_rule(mut self, rule: AmountRule) -> Self {
        self.amount_rule = rule;
        self
    }

    fn state(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite one field. No validation happens on write.
    pub fn set_field(&self, field: ClaimField, value: impl Into<String>) {
        self.state().draft.set(field, value);
    }

    /// Same as [`set_field`](Self::set_field), addressed by wire name (`"claimType"`, ...)
    pub fn set_field_by_name(&self, name: &str, value: impl Into<String>) -> Result<()> {
        let field = name.parse::<ClaimField>()?;
        self.set_field(field, value);
        Ok(())
    }

    pub fn add_files(&self, selected: impl IntoIterator<Item = Attachment>) {
        let mut state = self.state();
        state.draft.documents.add_files(selected);
        debug!(staged = state.draft.documents.len(), "attachments staged");
    }

    pub fn attachment_names(&self) -> Vec<String> {
        self.state()
            .draft
            .documents
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn draft(&self) -> ClaimDraft {
        self.state().draft.clone()
    }

    pub fn idempotency_key(&self) -> Uuid {
        self.state().idempotency_key
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    pub fn abandon_handle(&self) -> AbandonHandle {
        self.abandon.clone()
    }

    /// Tear the form down. Equivalent to `abandon_handle().abandon()`.
    pub fn abandon(&self) {
        self.abandon.abandon();
    }

    /// Hand control back to the host. The draft is left untouched.
    pub fn cancel(&self) {
        debug!("claim form cancelled");
        (self.on_cancel)();
    }

    /// Submit the current draft through the gateway.
    ///
    /// The completion callback runs at most once per call, only for
    /// [`SubmitOutcome::Completed`], and after the in-flight flag has been
    /// cleared. A successful submission empties the draft and rolls the
    /// idempotency key; a failed one keeps both so a retry is recognisable.
    pub async fn submit(&self) -> SubmitOutcome {
        let Some(guard) = SubmittingGuard::acquire(&self.submitting) else {
            debug!("submit ignored, a submission is already in flight");
            return SubmitOutcome::AlreadySubmitting;
        };

        let mut torn_down = self.abandon.torn_down.subscribe();
        let already_gone = *torn_down.borrow_and_update();
        if already_gone {
            return SubmitOutcome::Abandoned;
        }

        let submission = {
            let state = self.state();
            if let Err(e) = check_draft(&state.draft, self.amount_rule) {
                debug!(reason = %e, "draft incomplete, nothing sent");
                return SubmitOutcome::Incomplete(e);
            }
            ClaimSubmission {
                idempotency_key: state.idempotency_key,
                draft: state.draft.clone(),
            }
        };

        info!(
            idempotency_key = %submission.idempotency_key,
            claim_type = %submission.draft.claim_type,
            "submitting claim"
        );

        let response = tokio::select! {
            response = self.gateway.post_claim(&submission) => response,
            Ok(_) = torn_down.wait_for(|gone| *gone) => {
                info!(
                    idempotency_key = %submission.idempotency_key,
                    "form abandoned while submitting, result will be dropped"
                );
                return SubmitOutcome::Abandoned;
            }
        };

        let result = match response {
            Ok(receipt) => {
                info!(status = receipt.status, "claim accepted by gateway");
                let mut state = self.state();
                state.draft = ClaimDraft::new();
                state.idempotency_key = Uuid::new_v4();
                SubmissionResult::Submitted {
                    message: SUBMITTED_MESSAGE.to_string(),
                }
            }
            Err(e) => {
                warn!(error = %e, "claim submission failed");
                SubmissionResult::Failed {
                    message: FAILED_MESSAGE.to_string(),
                    detail: e.to_string(),
                }
            }
        };

        drop(guard);
        (self.on_submit)(result.clone());
        SubmitOutcome::Completed(result)
    }
}
