pub mod memory;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::Result;
use crate::exchange::RateSource;
use crate::types::{
    InterestConfiguration, Payment, PaymentApplication, PaymentId, PaymentStatus, PendingCredit,
    Quota, QuotaAdjustment, QuotaId, QuotaStatus, UnitId,
};

pub use memory::MemoryStore;

/// read side of the persistence boundary
///
/// Every method is a snapshot read; none of them takes locks the caller
/// can observe. The allocation engine is written against this trait, so
/// any relational adapter with the same lookups can back it.
pub trait LedgerRead: RateSource {
    fn payment(&self, id: PaymentId) -> Option<Payment>;

    fn quota(&self, id: QuotaId) -> Option<Quota>;

    /// all quotas for a unit, unordered
    fn quotas_for_unit(&self, unit_id: UnitId) -> Vec<Quota>;

    /// adjustment history for a quota, oldest first
    fn adjustments(&self, quota_id: QuotaId) -> Vec<QuotaAdjustment>;

    fn applications_for_payment(&self, payment_id: PaymentId) -> Vec<PaymentApplication>;

    fn applications_for_quota(&self, quota_id: QuotaId) -> Vec<PaymentApplication>;

    /// every configuration window for a payment concept
    fn interest_configurations(&self, concept_id: Uuid) -> Vec<InterestConfiguration>;

    /// pending quotas whose due date is strictly before `as_of`, the
    /// candidates for the scheduled overdue transition
    fn pending_quotas_due_before(&self, as_of: NaiveDate) -> Vec<Quota>;

    fn pending_credit(&self, credit_id: Uuid) -> Option<PendingCredit>;

    fn pending_credits_for_unit(&self, unit_id: UnitId) -> Vec<PendingCredit>;
}

/// write side, only reachable inside a transaction
pub trait LedgerWrite {
    /// insert all application rows of one allocation pass
    ///
    /// Fails with `DuplicateAllocation` when rows for the payment already
    /// exist — the uniqueness constraint the recorder's idempotency check
    /// leans on.
    fn insert_applications(&mut self, rows: Vec<PaymentApplication>) -> Result<()>;

    fn update_quota_status(&mut self, quota_id: QuotaId, status: QuotaStatus) -> Result<()>;

    fn update_payment_status(&mut self, payment_id: PaymentId, status: PaymentStatus) -> Result<()>;

    fn insert_pending_credit(&mut self, credit: PendingCredit) -> Result<()>;

    fn update_pending_credit(&mut self, credit: PendingCredit) -> Result<()>;

    fn insert_adjustment(&mut self, adjustment: QuotaAdjustment) -> Result<()>;
}

/// a store that can execute all writes of one commit atomically
pub trait LedgerStore: LedgerRead {
    /// run `f` against the write side; every mutation is kept on Ok and
    /// rolled back in full on Err
    fn within_transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn LedgerWrite) -> Result<()>,
    ) -> Result<()>;
}
