use std::sync::Arc;
use std::time::Duration;

use num_bigint::BigUint;
use tracing::{debug, info, warn};

use crate::amount::to_base_units;
use crate::capability::{NotificationKind, Notifier, ReceiptWaiter, TransferWriter};
use crate::erc20::ContractCall;
use crate::error::{ConfirmationError, FieldErrors, SubmitError, ValidationError};
use crate::types::address::{Address, TxHash};
use crate::types::log::Receipt;

/// Transfer form contents, exactly as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferRequest {
    pub recipient: String,
    pub amount: String,
}

impl TransferRequest {
    pub fn new(recipient: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            amount: amount.into(),
        }
    }
}

/// A request that passed validation, ready to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTransfer {
    pub recipient: Address,
    pub amount: BigUint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Validating,
    Submitting,
    Pending(TxHash),
    Confirmed(TxHash),
    Failed(String),
}

impl TransferState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TransferState::Submitting | TransferState::Pending(_))
    }
}

/// Drives one transfer at a time through validate → submit → confirm.
pub struct TransferOrchestrator {
    writer: Arc<dyn TransferWriter>,
    receipts: Arc<dyn ReceiptWaiter>,
    notifier: Arc<dyn Notifier>,
    confirmation_timeout: Option<Duration>,
    state: TransferState,
    form: TransferRequest,
    field_errors: FieldErrors,
}

impl TransferOrchestrator {
    pub fn new(
        writer: Arc<dyn TransferWriter>,
        receipts: Arc<dyn ReceiptWaiter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            writer,
            receipts,
            notifier,
            confirmation_timeout: None,
            state: TransferState::Idle,
            form: TransferRequest::default(),
            field_errors: FieldErrors::default(),
        }
    }

    /// Give up waiting for a receipt after `timeout`. Without one the wait
    /// is unbounded.
    pub fn with_confirmation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    pub fn form(&self) -> &TransferRequest {
        &self.form
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    /// Edit the recipient field, clearing its error.
    pub fn set_recipient(&mut self, recipient: impl Into<String>) {
        self.form.recipient = recipient.into();
        self.field_errors.recipient = None;
    }

    /// Edit the amount field, clearing its error.
    pub fn set_amount(&mut self, amount: impl Into<String>) {
        self.form.amount = amount.into();
        self.field_errors.amount = None;
    }

    /// Check a request against the loaded token precision.
    ///
    /// Without decimals nothing can be encoded, so that check wins over
    /// any field error.
    pub fn validate(request: &TransferRequest, decimals: Option<u8>) -> Result<ValidTransfer, ValidationError> {
        let Some(decimals) = decimals else {
            return Err(ValidationError::DecimalsUnavailable);
        };

        let recipient = Address::parse(&request.recipient);
        let amount = to_base_units(&request.amount, decimals);

        match (recipient, amount) {
            (Ok(recipient), Ok(amount)) => Ok(ValidTransfer { recipient, amount }),
            (recipient, amount) => Err(ValidationError::Fields(FieldErrors {
                recipient: recipient.err(),
                amount: amount.err(),
            })),
        }
    }

    /// Validate and submit the current form.
    pub async fn submit_form(&mut self, token: Address, decimals: Option<u8>) -> Result<TxHash, SubmitError> {
        let request = self.form.clone();
        self.submit(token, request, decimals).await
    }

    /// Validate `request` and hand a `transfer` call to the writer.
    ///
    /// On rejection the state becomes `Failed` and the form keeps the
    /// request for correction.
    pub async fn submit(
        &mut self,
        token: Address,
        request: TransferRequest,
        decimals: Option<u8>,
    ) -> Result<TxHash, SubmitError> {
        if self.state.is_in_flight() {
            return Err(SubmitError::InFlight);
        }

        self.form = request;
        let previous = std::mem::replace(&mut self.state, TransferState::Idle);
        self.transition(TransferState::Validating);

        let valid = match Self::validate(&self.form, decimals) {
            Ok(valid) => valid,
            Err(e) => {
                let message = match &e {
                    ValidationError::Fields(fields) => {
                        self.field_errors = fields.clone();
                        "Please fix the validation errors"
                    }
                    _ => "Token decimals not loaded",
                };
                self.transition(previous);
                self.notifier.notify(NotificationKind::Error, message);
                return Err(e.into());
            }
        };
        self.field_errors = FieldErrors::default();

        self.transition(TransferState::Submitting);
        let call = match ContractCall::transfer(token, valid.recipient, valid.amount) {
            Ok(call) => call,
            Err(e) => {
                self.fail(e.to_string());
                return Err(e.into());
            }
        };

        match self.writer.submit(call).await {
            Ok(hash) => {
                info!(%hash, %token, "transfer accepted");
                self.transition(TransferState::Pending(hash));
                self.notifier
                    .notify(NotificationKind::Pending, "Transaction submitted...");
                Ok(hash)
            }
            Err(e) => {
                warn!(%token, error = %e, "transfer rejected");
                self.fail(e.0.clone());
                Err(SubmitError::Rejected(e.0))
            }
        }
    }

    /// Wait for the pending transaction to be mined.
    ///
    /// A timeout leaves the state `Pending` so the caller can keep waiting
    /// or [`abandon`](Self::abandon) it.
    pub async fn await_confirmation(&mut self) -> Result<Receipt, ConfirmationError> {
        let TransferState::Pending(hash) = self.state else {
            return Err(ConfirmationError::NothingPending);
        };

        let receipts = Arc::clone(&self.receipts);
        let wait = receipts.wait_for_receipt(hash);
        let result = match self.confirmation_timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(%hash, ?limit, "transaction still pending after timeout");
                    return Err(ConfirmationError::TimedOut { hash });
                }
            },
            None => wait.await,
        };

        match result {
            Ok(receipt) if receipt.success => {
                info!(%hash, block = receipt.block_number, "transfer confirmed");
                self.transition(TransferState::Confirmed(hash));
                self.form = TransferRequest::default();
                self.notifier
                    .notify(NotificationKind::Success, "Transfer successful!");
                self.transition(TransferState::Idle);
                Ok(receipt)
            }
            Ok(_) => {
                self.fail("transaction reverted".to_string());
                Err(ConfirmationError::Reverted { hash })
            }
            Err(e) => {
                self.fail(e.0.clone());
                Err(ConfirmationError::Failed { hash, reason: e.0 })
            }
        }
    }

    /// Give up on the in-flight transfer, keeping the form for a retry.
    ///
    /// Covers a `Pending` hash that never confirms and a `Submitting`
    /// state left behind when the submit future was dropped. Returns
    /// whether anything was abandoned.
    pub fn abandon(&mut self) -> bool {
        if !self.state.is_in_flight() {
            return false;
        }
        self.transition(TransferState::Failed("abandoned".to_string()));
        true
    }

    /// Back to `Idle` with an empty form.
    pub fn reset(&mut self) {
        self.transition(TransferState::Idle);
        self.form = TransferRequest::default();
        self.field_errors = FieldErrors::default();
    }

    fn fail(&mut self, reason: String) {
        self.notifier.notify(NotificationKind::Error, &reason);
        self.transition(TransferState::Failed(reason));
    }

    fn transition(&mut self, next: TransferState) {
        debug!(from = ?self.state, to = ?next, "transfer state");
        self.state = next;
    }
}
