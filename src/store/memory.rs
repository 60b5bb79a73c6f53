use chrono::NaiveDate;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::errors::{LedgerError, Result};
use crate::exchange::RateSource;
use crate::types::{
    ExchangeRate, InterestConfiguration, Payment, PaymentApplication, PaymentId, PaymentStatus,
    PendingCredit, Quota, QuotaAdjustment, QuotaId, QuotaStatus, UnitId,
};

use super::{LedgerRead, LedgerStore, LedgerWrite};

/// everything the store holds; cloned wholesale for transaction rollback
#[derive(Debug, Clone, Default)]
struct Inner {
    quotas: Vec<Quota>,
    adjustments: Vec<QuotaAdjustment>,
    payments: Vec<Payment>,
    applications: Vec<PaymentApplication>,
    interest_configurations: Vec<InterestConfiguration>,
    exchange_rates: Vec<ExchangeRate>,
    pending_credits: Vec<PendingCredit>,
}

/// in-memory adapter for tests and demos
///
/// Transactions are copy-on-write: the transaction closure runs against a
/// clone of the state, which replaces the original only when the closure
/// succeeds. Failure mid-commit therefore leaves no partial state, the
/// same guarantee a relational adapter gets from its database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── seeding (the CRUD layer's job in the full system) ────────────────

    pub fn insert_quota(&self, quota: Quota) {
        self.inner.write().quotas.push(quota);
    }

    pub fn insert_payment(&self, payment: Payment) {
        self.inner.write().payments.push(payment);
    }

    pub fn insert_exchange_rate(&self, rate: ExchangeRate) {
        self.inner.write().exchange_rates.push(rate);
    }

    /// insert a configuration window, rejecting overlap with an existing
    /// window for the same payment concept
    pub fn insert_interest_configuration(&self, config: InterestConfiguration) -> Result<()> {
        let mut inner = self.inner.write();

        let overlapping = inner
            .interest_configurations
            .iter()
            .filter(|c| c.payment_concept_id == config.payment_concept_id)
            .any(|c| c.overlaps(&config));
        if overlapping {
            return Err(LedgerError::OverlappingInterestConfig {
                payment_concept_id: config.payment_concept_id,
            });
        }

        inner.interest_configurations.push(config);
        Ok(())
    }
}

impl RateSource for MemoryStore {
    fn latest_rate(&self, from: &str, to: &str, as_of: NaiveDate) -> Option<ExchangeRate> {
        self.inner
            .read()
            .exchange_rates
            .iter()
            .filter(|r| r.from_currency == from && r.to_currency == to && r.effective_date <= as_of)
            .max_by_key(|r| r.effective_date)
            .cloned()
    }
}

impl LedgerRead for MemoryStore {
    fn payment(&self, id: PaymentId) -> Option<Payment> {
        self.inner.read().payments.iter().find(|p| p.id == id).cloned()
    }

    fn quota(&self, id: QuotaId) -> Option<Quota> {
        self.inner.read().quotas.iter().find(|q| q.id == id).cloned()
    }

    fn quotas_for_unit(&self, unit_id: UnitId) -> Vec<Quota> {
        self.inner
            .read()
            .quotas
            .iter()
            .filter(|q| q.unit_id == unit_id)
            .cloned()
            .collect()
    }

    fn adjustments(&self, quota_id: QuotaId) -> Vec<QuotaAdjustment> {
        let mut rows: Vec<QuotaAdjustment> = self
            .inner
            .read()
            .adjustments
            .iter()
            .filter(|a| a.quota_id == quota_id)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.created_at);
        rows
    }

    fn applications_for_payment(&self, payment_id: PaymentId) -> Vec<PaymentApplication> {
        self.inner
            .read()
            .applications
            .iter()
            .filter(|a| a.payment_id == payment_id)
            .cloned()
            .collect()
    }

    fn applications_for_quota(&self, quota_id: QuotaId) -> Vec<PaymentApplication> {
        self.inner
            .read()
            .applications
            .iter()
            .filter(|a| a.quota_id == quota_id)
            .cloned()
            .collect()
    }

    fn interest_configurations(&self, concept_id: Uuid) -> Vec<InterestConfiguration> {
        self.inner
            .read()
            .interest_configurations
            .iter()
            .filter(|c| c.payment_concept_id == concept_id)
            .cloned()
            .collect()
    }

    fn pending_quotas_due_before(&self, as_of: NaiveDate) -> Vec<Quota> {
        self.inner
            .read()
            .quotas
            .iter()
            .filter(|q| q.status == QuotaStatus::Pending && q.due_date < as_of)
            .cloned()
            .collect()
    }

    fn pending_credit(&self, credit_id: Uuid) -> Option<PendingCredit> {
        self.inner
            .read()
            .pending_credits
            .iter()
            .find(|c| c.id == credit_id)
            .cloned()
    }

    fn pending_credits_for_unit(&self, unit_id: UnitId) -> Vec<PendingCredit> {
        self.inner
            .read()
            .pending_credits
            .iter()
            .filter(|c| c.unit_id == unit_id)
            .cloned()
            .collect()
    }
}

/// write handle bound to one in-flight transaction
struct TxWriter<'a> {
    inner: &'a mut Inner,
}

impl LedgerWrite for TxWriter<'_> {
    fn insert_applications(&mut self, rows: Vec<PaymentApplication>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let payment_id = rows[0].payment_id;
        if self.inner.applications.iter().any(|a| a.payment_id == payment_id) {
            return Err(LedgerError::DuplicateAllocation { payment_id });
        }

        self.inner.applications.extend(rows);
        Ok(())
    }

    fn update_quota_status(&mut self, quota_id: QuotaId, status: QuotaStatus) -> Result<()> {
        let quota = self
            .inner
            .quotas
            .iter_mut()
            .find(|q| q.id == quota_id)
            .ok_or(LedgerError::QuotaNotFound { quota_id })?;
        quota.status = status;
        Ok(())
    }

    fn update_payment_status(&mut self, payment_id: PaymentId, status: PaymentStatus) -> Result<()> {
        let payment = self
            .inner
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or(LedgerError::PaymentNotFound { payment_id })?;
        payment.status = status;
        Ok(())
    }

    fn insert_pending_credit(&mut self, credit: PendingCredit) -> Result<()> {
        self.inner.pending_credits.push(credit);
        Ok(())
    }

    fn update_pending_credit(&mut self, credit: PendingCredit) -> Result<()> {
        let slot = self
            .inner
            .pending_credits
            .iter_mut()
            .find(|c| c.id == credit.id)
            .ok_or(LedgerError::CreditNotFound { credit_id: credit.id })?;
        *slot = credit;
        Ok(())
    }

    fn insert_adjustment(&mut self, adjustment: QuotaAdjustment) -> Result<()> {
        self.inner.adjustments.push(adjustment);
        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    fn within_transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn LedgerWrite) -> Result<()>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let mut staged = inner.clone();

        let mut writer = TxWriter { inner: &mut staged };
        f(&mut writer)?;

        *inner = staged;
        Ok(())
    }
}
