use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{info, warn};
use uuid::Uuid;

use crate::allocation::{AllocationEngine, AllocationRecorder, CommitReceipt, UnitLockMap};
use crate::config::AllocationConfig;
use crate::decimal::{Currency, Money};
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::{QuotaBalance, QuotaLedgerView};
use crate::store::LedgerStore;
use crate::types::{
    AdjustmentType, CreditStatus, PaymentId, PendingCredit, QuotaAdjustment, QuotaId, QuotaStatus,
    UnitId, UserId,
};

/// how often a conflicted commit is replanned before giving up
const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// the crate's inbound surface
///
/// The HTTP layer and the payment-intake collaborators call these
/// operations; everything else in the crate is reachable through them.
pub struct AllocationService<'a, S: LedgerStore> {
    store: &'a S,
    config: AllocationConfig,
    engine: AllocationEngine<'a, S>,
    recorder: AllocationRecorder<'a, S>,
}

impl<'a, S: LedgerStore> AllocationService<'a, S> {
    pub fn new(store: &'a S, config: AllocationConfig) -> Self {
        Self {
            store,
            config: config.clone(),
            engine: AllocationEngine::new(store, config.clone()),
            recorder: AllocationRecorder::new(store, config),
        }
    }

    /// share a lock map with other services on the same store
    pub fn with_locks(
        store: &'a S,
        config: AllocationConfig,
        locks: std::sync::Arc<UnitLockMap>,
    ) -> Self {
        Self {
            store,
            config: config.clone(),
            engine: AllocationEngine::new(store, config.clone()),
            recorder: AllocationRecorder::with_locks(store, config, locks),
        }
    }

    /// allocate a payment that has transitioned to `Completed`
    ///
    /// Invoked once per completed payment by the webhook handler or the
    /// manual-verification controller. Safe to call again on retry: the
    /// recorder replays the prior result. A commit that conflicts with a
    /// concurrently allocated payment is replanned against fresh
    /// balances, bounded by `MAX_COMMIT_ATTEMPTS`.
    pub fn register_completed_payment(
        &self,
        payment_id: PaymentId,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<CommitReceipt> {
        let payment = self
            .store
            .payment(payment_id)
            .ok_or(LedgerError::PaymentNotFound { payment_id })?;

        let mut attempts = 0;
        loop {
            let plan = self.engine.allocate(&payment)?;
            match self.recorder.commit(&payment, &plan, time_provider, events) {
                Ok(receipt) => return Ok(receipt),
                Err(LedgerError::AllocationConflict { .. }) if attempts + 1 < MAX_COMMIT_ATTEMPTS => {
                    attempts += 1;
                    warn!(payment_id = %payment_id, attempts, "allocation conflicted, replanning");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// append an immutable correction to a quota's amount
    ///
    /// The correction never rewrites history: the previous amount stays
    /// in the adjustment row and the effective principal is recomputed on
    /// read. Rejected when the quota is settled or cancelled, or when the
    /// new amount falls below principal already collected.
    pub fn adjust_quota(
        &self,
        quota_id: QuotaId,
        new_amount: Money,
        adjustment_type: AdjustmentType,
        reason: impl Into<String>,
        created_by: UserId,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<QuotaAdjustment> {
        let quota = self
            .store
            .quota(quota_id)
            .ok_or(LedgerError::QuotaNotFound { quota_id })?;
        if quota.status.is_terminal() {
            return Err(LedgerError::InvalidQuotaStatus {
                quota_id,
                status: quota.status,
            });
        }

        let now = time_provider.now();
        let view = QuotaLedgerView::new(self.store, self.config.base_currency.clone());
        let balance = view.quota_balance(&quota, now.date_naive());

        if new_amount < balance.principal_paid {
            return Err(LedgerError::AdjustmentBelowPaid {
                paid: balance.principal_paid,
                requested: new_amount,
            });
        }

        let adjustment = QuotaAdjustment {
            id: Uuid::new_v4(),
            quota_id,
            previous_amount: balance.effective_principal,
            new_amount,
            adjustment_type,
            reason: reason.into(),
            created_by,
            created_at: now,
        };

        // a waiver down to the paid amount settles the quota in the same
        // transaction
        let settles = new_amount == balance.principal_paid && balance.accrued_interest.is_zero();

        self.store.within_transaction(&mut |tx| {
            tx.insert_adjustment(adjustment.clone())?;
            if settles {
                tx.update_quota_status(quota_id, QuotaStatus::Paid)?;
            }
            Ok(())
        })?;

        events.emit(Event::QuotaAdjusted {
            quota_id,
            previous_amount: adjustment.previous_amount,
            new_amount,
            adjustment_type,
            timestamp: now,
        });
        if settles {
            events.emit(Event::QuotaSettled {
                quota_id,
                timestamp: now,
            });
        }

        info!(quota_id = %quota_id, %new_amount, "quota adjusted");
        Ok(adjustment)
    }

    /// the scheduled job's transition: pending quotas past their due date
    /// become overdue
    pub fn mark_overdue(
        &self,
        as_of: NaiveDate,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Vec<QuotaId>> {
        let candidates = self.store.pending_quotas_due_before(as_of);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let now = time_provider.now();
        let ids: Vec<QuotaId> = candidates.iter().map(|q| q.id).collect();

        self.store.within_transaction(&mut |tx| {
            for id in &ids {
                tx.update_quota_status(*id, QuotaStatus::Overdue)?;
            }
            Ok(())
        })?;

        for quota in &candidates {
            events.emit(Event::QuotaOverdue {
                quota_id: quota.id,
                due_date: quota.due_date,
                timestamp: now,
            });
        }

        info!(count = ids.len(), %as_of, "quotas marked overdue");
        Ok(ids)
    }

    /// administrative cancellation; allowed from any non-settled state
    pub fn cancel_quota(
        &self,
        quota_id: QuotaId,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        let quota = self
            .store
            .quota(quota_id)
            .ok_or(LedgerError::QuotaNotFound { quota_id })?;
        if quota.status.is_terminal() {
            return Err(LedgerError::InvalidQuotaStatus {
                quota_id,
                status: quota.status,
            });
        }

        self.store
            .within_transaction(&mut |tx| tx.update_quota_status(quota_id, QuotaStatus::Cancelled))?;

        events.emit(Event::QuotaCancelled {
            quota_id,
            timestamp: time_provider.now(),
        });
        Ok(())
    }

    /// resolve a held surplus: allocate it elsewhere or refund it
    pub fn resolve_credit(
        &self,
        credit_id: Uuid,
        resolution: CreditStatus,
        notes: impl Into<String>,
    ) -> Result<PendingCredit> {
        let mut credit = self
            .store
            .pending_credit(credit_id)
            .ok_or(LedgerError::CreditNotFound { credit_id })?;
        if credit.status != CreditStatus::Pending {
            return Err(LedgerError::CreditAlreadyResolved { credit_id });
        }

        credit.status = resolution;
        credit.resolution_notes = Some(notes.into());

        let updated = credit.clone();
        self.store
            .within_transaction(&mut |tx| tx.update_pending_credit(updated.clone()))?;

        Ok(credit)
    }

    /// read-only view of a unit's outstanding position
    pub fn outstanding_quotas(&self, unit_id: UnitId, as_of: NaiveDate) -> Vec<QuotaBalance> {
        QuotaLedgerView::new(self.store, self.config.base_currency.clone())
            .outstanding_quotas(unit_id, as_of)
    }

    pub fn base_currency(&self) -> &Currency {
        &self.config.base_currency
    }
}
