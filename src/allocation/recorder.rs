use std::collections::HashMap;
use std::sync::Arc;

use hourglass_rs::SafeTimeProvider;
use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AllocationConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::QuotaLedgerView;
use crate::store::LedgerStore;
use crate::types::{
    CreditStatus, Payment, PaymentApplication, PaymentId, PaymentStatus, PendingCredit,
    QuotaStatus, UnitId,
};

use super::AllocationPlan;

/// per-unit mutual exclusion for the commit critical section
///
/// A mutex per unit id rather than one global lock: unrelated units
/// commit in parallel, two payments for the same unit serialize.
#[derive(Debug, Default)]
pub struct UnitLockMap {
    locks: Mutex<HashMap<UnitId, Arc<Mutex<()>>>>,
}

impl UnitLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex_for(&self, unit_id: UnitId) -> Arc<Mutex<()>> {
        self.locks.lock().entry(unit_id).or_default().clone()
    }

    /// run `f` while holding the unit's lock
    pub fn with_unit_locked<R>(&self, unit_id: UnitId, f: impl FnOnce() -> R) -> R {
        let mutex = self.mutex_for(unit_id);
        let _guard = mutex.lock();
        f()
    }
}

/// outcome of a commit
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReceipt {
    pub payment_id: PaymentId,
    pub applications: Vec<PaymentApplication>,
    pub credit: Option<PendingCredit>,
    /// true when the payment was already allocated and the prior result
    /// is being returned
    pub replayed: bool,
}

/// persists an allocation plan atomically and idempotently
pub struct AllocationRecorder<'a, S: LedgerStore> {
    store: &'a S,
    config: AllocationConfig,
    locks: Arc<UnitLockMap>,
}

impl<'a, S: LedgerStore> AllocationRecorder<'a, S> {
    pub fn new(store: &'a S, config: AllocationConfig) -> Self {
        Self::with_locks(store, config, Arc::new(UnitLockMap::new()))
    }

    /// share one lock map across recorders serving the same store
    pub fn with_locks(store: &'a S, config: AllocationConfig, locks: Arc<UnitLockMap>) -> Self {
        Self {
            store,
            config,
            locks,
        }
    }

    pub fn locks(&self) -> Arc<UnitLockMap> {
        Arc::clone(&self.locks)
    }

    /// commit an allocation plan
    ///
    /// Under the unit's lock: if the payment already has application rows
    /// the prior result is returned untouched; otherwise the plan is
    /// verified against a fresh balance read (a concurrent payment may
    /// have consumed part of the balance since planning — that surfaces
    /// as a retryable `AllocationConflict`) and every row, status
    /// transition and surplus credit is written in one transaction.
    pub fn commit(
        &self,
        payment: &Payment,
        plan: &AllocationPlan,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<CommitReceipt> {
        self.locks
            .with_unit_locked(payment.unit_id, || self.commit_locked(payment, plan, time_provider, events))
    }

    fn commit_locked(
        &self,
        payment: &Payment,
        plan: &AllocationPlan,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<CommitReceipt> {
        let now = time_provider.now();

        // idempotency: duplicate webhook deliveries and retries land here;
        // a payment held entirely as credit has no application rows, so
        // its credit row marks it as allocated
        let existing = self.store.applications_for_payment(payment.id);
        let existing_credit = self
            .store
            .pending_credits_for_unit(payment.unit_id)
            .into_iter()
            .find(|c| c.payment_id == payment.id);
        if !existing.is_empty() || existing_credit.is_some() {
            debug!(payment_id = %payment.id, "allocation already recorded, replaying");
            events.emit(Event::AllocationReplayed {
                payment_id: payment.id,
                timestamp: now,
            });
            return Ok(CommitReceipt {
                payment_id: payment.id,
                applications: existing,
                credit: existing_credit,
                replayed: true,
            });
        }

        self.verify_plan(payment, plan)?;
        let outstanding_after = self.verify_against_current_balances(payment, plan)?;

        let applications: Vec<PaymentApplication> = plan
            .applications
            .iter()
            .map(|draft| PaymentApplication {
                id: Uuid::new_v4(),
                payment_id: payment.id,
                quota_id: draft.quota_id,
                applied_amount: draft.applied_amount,
                applied_to_principal: draft.applied_to_principal,
                applied_to_interest: draft.applied_to_interest,
                rate_used: plan.conversion.rate_used,
                created_at: now,
            })
            .collect();

        let credit = if plan.surplus.is_positive() {
            Some(PendingCredit {
                id: Uuid::new_v4(),
                payment_id: payment.id,
                unit_id: payment.unit_id,
                amount: plan.surplus,
                currency: self.config.base_currency.clone(),
                status: CreditStatus::Pending,
                resolution_notes: None,
                created_at: now,
            })
        } else {
            None
        };

        self.store.within_transaction(&mut |tx| {
            tx.insert_applications(applications.clone())?;
            for draft in &plan.applications {
                let status = if draft.settles_quota {
                    QuotaStatus::Paid
                } else {
                    QuotaStatus::PartiallyPaid
                };
                tx.update_quota_status(draft.quota_id, status)?;
            }
            tx.update_payment_status(payment.id, PaymentStatus::Completed)?;
            if let Some(credit) = &credit {
                tx.insert_pending_credit(credit.clone())?;
            }
            Ok(())
        })?;

        for (draft, outstanding) in plan.applications.iter().zip(&outstanding_after) {
            if draft.settles_quota {
                events.emit(Event::QuotaSettled {
                    quota_id: draft.quota_id,
                    timestamp: now,
                });
            } else {
                events.emit(Event::QuotaPartiallyPaid {
                    quota_id: draft.quota_id,
                    outstanding: *outstanding,
                    timestamp: now,
                });
            }
        }
        events.emit(Event::PaymentAllocated {
            payment_id: payment.id,
            unit_id: payment.unit_id,
            converted_amount: plan.converted_amount(),
            total_applied: plan.total_applied,
            surplus: plan.surplus,
            timestamp: now,
        });
        if let Some(credit) = &credit {
            events.emit(Event::SurplusHeld {
                payment_id: payment.id,
                unit_id: payment.unit_id,
                amount: credit.amount,
                timestamp: now,
            });
        }

        info!(
            payment_id = %payment.id,
            unit_id = %payment.unit_id,
            total_applied = %plan.total_applied,
            surplus = %plan.surplus,
            "payment allocated"
        );

        Ok(CommitReceipt {
            payment_id: payment.id,
            applications,
            credit,
            replayed: false,
        })
    }

    /// internal plan consistency; a failure here is a programming error,
    /// asserted fatal rather than clamped
    fn verify_plan(&self, payment: &Payment, plan: &AllocationPlan) -> Result<()> {
        if plan.payment_id != payment.id {
            return Err(LedgerError::ConservationViolation {
                message: format!(
                    "plan for payment {} committed against payment {}",
                    plan.payment_id, payment.id
                ),
            });
        }

        let mut applied_sum = Money::ZERO;
        for draft in &plan.applications {
            if draft.applied_to_interest.is_negative() || draft.applied_to_principal.is_negative() {
                return Err(LedgerError::ConservationViolation {
                    message: format!("negative application for quota {}", draft.quota_id),
                });
            }
            if draft.applied_amount != draft.applied_to_interest + draft.applied_to_principal {
                return Err(LedgerError::ConservationViolation {
                    message: format!("application split mismatch for quota {}", draft.quota_id),
                });
            }
            applied_sum += draft.applied_amount;
        }

        if applied_sum != plan.total_applied
            || plan.total_applied + plan.surplus != plan.converted_amount()
        {
            return Err(LedgerError::ConservationViolation {
                message: format!(
                    "applied {} + surplus {} != converted {}",
                    applied_sum,
                    plan.surplus,
                    plan.converted_amount()
                ),
            });
        }

        Ok(())
    }

    /// re-read balances under the lock; a plan computed before a
    /// concurrent payment landed must not over-apply
    ///
    /// Returns each quota's total due after the draft is applied, in plan
    /// order, for event reporting.
    fn verify_against_current_balances(
        &self,
        payment: &Payment,
        plan: &AllocationPlan,
    ) -> Result<Vec<Money>> {
        let view = QuotaLedgerView::new(self.store, self.config.base_currency.clone());
        let mut outstanding_after = Vec::with_capacity(plan.applications.len());

        for draft in &plan.applications {
            let quota =
                self.store
                    .quota(draft.quota_id)
                    .ok_or(LedgerError::QuotaNotFound {
                        quota_id: draft.quota_id,
                    })?;
            let balance = view.quota_balance(&quota, payment.payment_date);

            if draft.applied_to_interest > balance.accrued_interest
                || draft.applied_to_principal > balance.outstanding_principal
            {
                return Err(LedgerError::AllocationConflict {
                    payment_id: payment.id,
                    message: format!(
                        "quota {} balance changed since planning",
                        draft.quota_id
                    ),
                });
            }

            outstanding_after.push(balance.total_due() - draft.applied_amount);
        }

        Ok(outstanding_after)
    }
}
