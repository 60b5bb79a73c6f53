use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Currency, Money};
use crate::interest::{AccrualCalculator, AccruedInterest};
use crate::store::LedgerRead;
use crate::types::{Quota, UnitId};

/// a quota's settleable position as of a date
///
/// Always a projection over the adjustment and application history, never
/// a stored running total, so the ledger and its balances cannot drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaBalance {
    pub quota: Quota,
    /// original amount folded with adjustments dated up to as_of
    pub effective_principal: Money,
    pub principal_paid: Money,
    pub interest_paid: Money,
    pub outstanding_principal: Money,
    /// accrued interest net of interest already settled
    pub accrued_interest: Money,
    /// gross accrual with its per-window breakdown
    pub accrual: AccruedInterest,
}

impl QuotaBalance {
    pub fn total_due(&self) -> Money {
        self.outstanding_principal + self.accrued_interest
    }

    pub fn is_settled(&self) -> bool {
        self.outstanding_principal.is_zero() && self.accrued_interest.is_zero()
    }
}

/// read-only aggregation of quota balances for a unit
pub struct QuotaLedgerView<'a, S: LedgerRead> {
    store: &'a S,
    calculator: AccrualCalculator,
}

impl<'a, S: LedgerRead> QuotaLedgerView<'a, S> {
    pub fn new(store: &'a S, base_currency: Currency) -> Self {
        Self {
            store,
            calculator: AccrualCalculator::new(base_currency),
        }
    }

    /// compute one quota's balance as of a date
    pub fn quota_balance(&self, quota: &Quota, as_of: NaiveDate) -> QuotaBalance {
        let mut effective_principal = quota.amount;
        for adjustment in self.store.adjustments(quota.id) {
            if adjustment.created_at.date_naive() <= as_of {
                effective_principal += adjustment.delta();
            }
        }

        let mut principal_paid = Money::ZERO;
        let mut interest_paid = Money::ZERO;
        for application in self.store.applications_for_quota(quota.id) {
            principal_paid += application.applied_to_principal;
            interest_paid += application.applied_to_interest;
        }

        let outstanding_principal = (effective_principal - principal_paid).max(Money::ZERO);

        let configs = self
            .store
            .interest_configurations(quota.payment_concept_id);
        let accrual =
            self.calculator
                .accrued(outstanding_principal, quota.due_date, &configs, as_of);
        let accrued_interest = (accrual.total - interest_paid).max(Money::ZERO);

        QuotaBalance {
            quota: quota.clone(),
            effective_principal,
            principal_paid,
            interest_paid,
            outstanding_principal,
            accrued_interest,
            accrual,
        }
    }

    /// outstanding quotas for a unit, oldest due date first, quota id as
    /// the deterministic tie-break
    pub fn outstanding_quotas(&self, unit_id: UnitId, as_of: NaiveDate) -> Vec<QuotaBalance> {
        let mut quotas: Vec<Quota> = self
            .store
            .quotas_for_unit(unit_id)
            .into_iter()
            .filter(|q| q.status.is_outstanding())
            .collect();
        quotas.sort_by_key(|q| (q.due_date, q.id));

        quotas
            .iter()
            .map(|q| self.quota_balance(q, as_of))
            .collect()
    }
}
