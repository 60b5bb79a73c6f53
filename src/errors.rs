use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{PaymentConceptId, PaymentId, PaymentStatus, QuotaId, QuotaStatus};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("no exchange rate available: {from} -> {to} as of {as_of}")]
    NoRateAvailable {
        from: String,
        to: String,
        as_of: NaiveDate,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount { amount: Money },

    #[error("payment {payment_id} not allocatable: status is {status:?}")]
    PaymentNotCompleted {
        payment_id: PaymentId,
        status: PaymentStatus,
    },

    #[error("payment {payment_id} exceeds outstanding balance by {surplus}")]
    Overpayment { payment_id: PaymentId, surplus: Money },

    #[error("allocation already recorded for payment {payment_id}")]
    DuplicateAllocation { payment_id: PaymentId },

    #[error("allocation conflict for payment {payment_id}: {message}")]
    AllocationConflict {
        payment_id: PaymentId,
        message: String,
    },

    #[error("conservation violation: {message}")]
    ConservationViolation { message: String },

    #[error("overlapping interest configuration windows for concept {payment_concept_id}")]
    OverlappingInterestConfig { payment_concept_id: PaymentConceptId },

    #[error("payment not found: {payment_id}")]
    PaymentNotFound { payment_id: PaymentId },

    #[error("quota not found: {quota_id}")]
    QuotaNotFound { quota_id: QuotaId },

    #[error("pending credit not found: {credit_id}")]
    CreditNotFound { credit_id: uuid::Uuid },

    #[error("pending credit {credit_id} already resolved")]
    CreditAlreadyResolved { credit_id: uuid::Uuid },

    #[error("quota {quota_id} in status {status:?} does not allow this operation")]
    InvalidQuotaStatus {
        quota_id: QuotaId,
        status: QuotaStatus,
    },

    #[error("adjustment below paid principal: paid {paid}, requested {requested}")]
    AdjustmentBelowPaid { paid: Money, requested: Money },

    #[error("storage error: {message}")]
    Storage { message: String },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
