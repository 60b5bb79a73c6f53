use serde::{Deserialize, Serialize};

use crate::config::AllocationConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::exchange::{Conversion, ExchangeConverter};
use crate::ledger::{QuotaBalance, QuotaLedgerView};
use crate::store::LedgerRead;
use crate::types::{OverpaymentPolicy, Payment, PaymentId, PaymentStatus, QuotaId, UnitId};

/// one planned application of payment money to a quota
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub quota_id: QuotaId,
    pub applied_amount: Money,
    pub applied_to_principal: Money,
    pub applied_to_interest: Money,
    /// true when the draft settles the quota completely
    pub settles_quota: bool,
}

/// complete, side-effect-free allocation result
///
/// Conservation holds by construction:
/// `total_applied + surplus == conversion.amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub payment_id: PaymentId,
    pub unit_id: UnitId,
    pub conversion: Conversion,
    /// in quota due-date order
    pub applications: Vec<ApplicationDraft>,
    pub total_applied: Money,
    /// amount left after every outstanding quota is settled
    pub surplus: Money,
}

impl AllocationPlan {
    pub fn converted_amount(&self) -> Money {
        self.conversion.amount
    }

    pub fn has_surplus(&self) -> bool {
        self.surplus.is_positive()
    }
}

/// split a normalized payment across ordered quota balances
///
/// Pure: no clocks, no stores, no ids generated. Safe to recompute on
/// retry; the recorder is the only place side effects happen.
///
/// Within a quota interest settles before principal; across quotas the
/// oldest due date settles first and no quota is skipped while it still
/// carries a balance.
pub fn plan_allocation(
    payment: &Payment,
    conversion: &Conversion,
    balances: &[QuotaBalance],
    policy: OverpaymentPolicy,
) -> Result<AllocationPlan> {
    if !payment.amount.is_positive() {
        return Err(LedgerError::InvalidPaymentAmount {
            amount: payment.amount,
        });
    }

    let mut remaining = conversion.amount;
    let mut applications = Vec::new();
    let mut total_applied = Money::ZERO;

    for balance in balances {
        if remaining.is_zero() {
            break;
        }

        let interest_portion = remaining.min(balance.accrued_interest);
        remaining -= interest_portion;

        let principal_portion = remaining.min(balance.outstanding_principal);
        remaining -= principal_portion;

        let applied = interest_portion + principal_portion;
        if applied.is_zero() {
            continue;
        }

        let settles_quota = principal_portion == balance.outstanding_principal
            && interest_portion == balance.accrued_interest;

        total_applied += applied;
        applications.push(ApplicationDraft {
            quota_id: balance.quota.id,
            applied_amount: applied,
            applied_to_principal: principal_portion,
            applied_to_interest: interest_portion,
            settles_quota,
        });
    }

    if remaining.is_positive() && policy == OverpaymentPolicy::Reject {
        return Err(LedgerError::Overpayment {
            payment_id: payment.id,
            surplus: remaining,
        });
    }

    Ok(AllocationPlan {
        payment_id: payment.id,
        unit_id: payment.unit_id,
        conversion: conversion.clone(),
        applications,
        total_applied,
        surplus: remaining,
    })
}

/// the orchestrator: normalizes a payment, reads the unit's outstanding
/// balances, and produces an allocation plan
pub struct AllocationEngine<'a, S: LedgerRead> {
    store: &'a S,
    config: AllocationConfig,
}

impl<'a, S: LedgerRead> AllocationEngine<'a, S> {
    pub fn new(store: &'a S, config: AllocationConfig) -> Self {
        Self { store, config }
    }

    /// plan the allocation of one completed payment
    ///
    /// Read-only: a `NoRateAvailable` abort here leaves nothing to undo,
    /// and the caller may retry once rates are backfilled.
    pub fn allocate(&self, payment: &Payment) -> Result<AllocationPlan> {
        if payment.status != PaymentStatus::Completed {
            return Err(LedgerError::PaymentNotCompleted {
                payment_id: payment.id,
                status: payment.status,
            });
        }

        let converter = ExchangeConverter::new(self.store);
        let conversion = converter.convert(
            payment.amount,
            &payment.currency,
            &self.config.base_currency,
            payment.payment_date,
        )?;

        let view = QuotaLedgerView::new(self.store, self.config.base_currency.clone());
        let balances = view.outstanding_quotas(payment.unit_id, payment.payment_date);

        plan_allocation(payment, &conversion, &balances, self.config.overpayment_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Currency, Rate};
    use crate::store::MemoryStore;
    use crate::types::{
        ExchangeRate, InterestConfiguration, InterestType, PaymentMethod, Quota, QuotaStatus,
        RatePeriod,
    };
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn quota(unit_id: Uuid, due: NaiveDate, amount: i64) -> Quota {
        Quota {
            id: Uuid::new_v4(),
            unit_id,
            payment_concept_id: Uuid::new_v4(),
            period_year: 2024,
            period_month: 1,
            due_date: due,
            amount: Money::from_major(amount),
            currency: Currency::usd(),
            status: QuotaStatus::Pending,
            created_at: Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap(),
        }
    }

    fn payment(unit_id: Uuid, amount: Money, date: NaiveDate) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            unit_id,
            amount,
            currency: Currency::usd(),
            method: PaymentMethod::Transfer,
            payment_date: date,
            status: PaymentStatus::Completed,
            reference: "TX-1001".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
        }
    }

    fn engine_config() -> AllocationConfig {
        AllocationConfig::new(Currency::usd())
    }

    #[test]
    fn test_oldest_first() {
        let store = MemoryStore::new();
        let unit_id = Uuid::new_v4();
        let jan = quota(unit_id, day(2024, 1, 1), 50);
        let feb = quota(unit_id, day(2024, 2, 1), 50);
        store.insert_quota(feb.clone());
        store.insert_quota(jan.clone());

        let p = payment(unit_id, Money::from_major(50), day(2024, 2, 10));
        store.insert_payment(p.clone());

        let plan = AllocationEngine::new(&store, engine_config())
            .allocate(&p)
            .unwrap();

        // payment covers only the january quota; february gets nothing
        assert_eq!(plan.applications.len(), 1);
        assert_eq!(plan.applications[0].quota_id, jan.id);
        assert_eq!(plan.applications[0].applied_amount, Money::from_major(50));
        assert!(plan.applications[0].settles_quota);
        assert_eq!(plan.surplus, Money::ZERO);
    }

    #[test]
    fn test_interest_before_principal() {
        let store = MemoryStore::new();
        let unit_id = Uuid::new_v4();
        // $100 principal quota, one month overdue at 10%/month
        let q = quota(unit_id, day(2024, 1, 1), 100);
        store
            .insert_interest_configuration(InterestConfiguration {
                id: Uuid::new_v4(),
                payment_concept_id: q.payment_concept_id,
                name: "arrears".to_string(),
                interest_type: InterestType::Simple,
                rate: Rate::from_percentage(10),
                fixed_amount: None,
                rate_period: RatePeriod::Monthly,
                grace_period_days: 0,
                effective_from: day(2023, 1, 1),
                effective_to: None,
                created_at: Utc::now(),
            })
            .unwrap();
        store.insert_quota(q.clone());

        // 30 accrual days (jan 2 .. jan 31): interest = 100 * 0.10 = 10
        let p = payment(unit_id, Money::from_major(15), day(2024, 1, 31));
        store.insert_payment(p.clone());

        let plan = AllocationEngine::new(&store, engine_config())
            .allocate(&p)
            .unwrap();

        assert_eq!(plan.applications.len(), 1);
        let draft = &plan.applications[0];
        assert_eq!(draft.applied_to_interest, Money::from_major(10));
        assert_eq!(draft.applied_to_principal, Money::from_major(5));
        assert_eq!(draft.applied_amount, Money::from_major(15));
        assert!(!draft.settles_quota);
    }

    #[test]
    fn test_partial_then_settling_payment_scenario() {
        let store = MemoryStore::new();
        let unit_id = Uuid::new_v4();
        let q = quota(unit_id, day(2024, 1, 1), 50);
        store.insert_quota(q.clone());

        let first = payment(unit_id, Money::from_major(30), day(2024, 1, 10));
        store.insert_payment(first.clone());

        let plan = AllocationEngine::new(&store, engine_config())
            .allocate(&first)
            .unwrap();
        assert_eq!(plan.applications.len(), 1);
        assert_eq!(plan.applications[0].applied_to_principal, Money::from_major(30));
        assert_eq!(plan.applications[0].applied_to_interest, Money::ZERO);
        assert!(!plan.applications[0].settles_quota);
    }

    #[test]
    fn test_conservation_across_many_quotas() {
        let store = MemoryStore::new();
        let unit_id = Uuid::new_v4();
        for month in 1..=4 {
            store.insert_quota(quota(unit_id, day(2024, month, 1), 50));
        }

        let p = payment(unit_id, Money::from_str_exact("130.25").unwrap(), day(2024, 5, 1));
        store.insert_payment(p.clone());

        let plan = AllocationEngine::new(&store, engine_config())
            .allocate(&p)
            .unwrap();

        let applied_sum: Money = plan
            .applications
            .iter()
            .fold(Money::ZERO, |acc, a| acc + a.applied_amount);
        assert_eq!(applied_sum, plan.total_applied);
        assert_eq!(plan.total_applied + plan.surplus, plan.converted_amount());
        assert_eq!(plan.surplus, Money::ZERO);

        // two settled, one partial, one untouched
        assert_eq!(plan.applications.len(), 3);
        assert!(plan.applications[0].settles_quota);
        assert!(plan.applications[1].settles_quota);
        assert_eq!(
            plan.applications[2].applied_amount,
            Money::from_str_exact("30.25").unwrap()
        );
    }

    #[test]
    fn test_surplus_held_by_default() {
        let store = MemoryStore::new();
        let unit_id = Uuid::new_v4();
        store.insert_quota(quota(unit_id, day(2024, 1, 1), 50));

        let p = payment(unit_id, Money::from_major(80), day(2024, 1, 10));
        store.insert_payment(p.clone());

        let plan = AllocationEngine::new(&store, engine_config())
            .allocate(&p)
            .unwrap();

        assert_eq!(plan.total_applied, Money::from_major(50));
        assert_eq!(plan.surplus, Money::from_major(30));
    }

    #[test]
    fn test_surplus_rejected_under_strict_policy() {
        let store = MemoryStore::new();
        let unit_id = Uuid::new_v4();
        store.insert_quota(quota(unit_id, day(2024, 1, 1), 50));

        let p = payment(unit_id, Money::from_major(80), day(2024, 1, 10));
        store.insert_payment(p.clone());

        let result =
            AllocationEngine::new(&store, AllocationConfig::strict(Currency::usd())).allocate(&p);

        assert!(matches!(
            result,
            Err(LedgerError::Overpayment { surplus, .. }) if surplus == Money::from_major(30)
        ));
    }

    #[test]
    fn test_no_outstanding_quotas_is_not_an_error() {
        let store = MemoryStore::new();
        let unit_id = Uuid::new_v4();

        let p = payment(unit_id, Money::from_major(80), day(2024, 1, 10));
        store.insert_payment(p.clone());

        let plan = AllocationEngine::new(&store, engine_config())
            .allocate(&p)
            .unwrap();

        assert!(plan.applications.is_empty());
        assert_eq!(plan.surplus, Money::from_major(80));
    }

    #[test]
    fn test_missing_rate_aborts_allocation() {
        let store = MemoryStore::new();
        let unit_id = Uuid::new_v4();
        store.insert_quota(quota(unit_id, day(2024, 1, 1), 50));

        let mut p = payment(unit_id, Money::from_major(80), day(2024, 1, 10));
        p.currency = Currency::eur();
        store.insert_payment(p.clone());

        let result = AllocationEngine::new(&store, engine_config()).allocate(&p);
        assert!(matches!(result, Err(LedgerError::NoRateAvailable { .. })));
    }

    #[test]
    fn test_converted_payment_allocates_in_base_currency() {
        let store = MemoryStore::new();
        let unit_id = Uuid::new_v4();
        store.insert_quota(quota(unit_id, day(2024, 1, 1), 50));
        store.insert_exchange_rate(ExchangeRate {
            id: Uuid::new_v4(),
            from_currency: "EUR".to_string(),
            to_currency: "USD".to_string(),
            rate: dec!(1.10),
            effective_date: day(2024, 1, 1),
            source: "ECB".to_string(),
        });

        let mut p = payment(unit_id, Money::from_major(40), day(2024, 1, 10));
        p.currency = Currency::eur();
        store.insert_payment(p.clone());

        let plan = AllocationEngine::new(&store, engine_config())
            .allocate(&p)
            .unwrap();

        // 40 EUR * 1.10 = 44 USD, all applied to principal
        assert_eq!(plan.converted_amount(), Money::from_major(44));
        assert_eq!(plan.conversion.rate_used, Some(dec!(1.10)));
        assert_eq!(plan.applications[0].applied_to_principal, Money::from_major(44));
    }

    #[test]
    fn test_non_completed_payment_refused() {
        let store = MemoryStore::new();
        let mut p = payment(Uuid::new_v4(), Money::from_major(10), day(2024, 1, 10));
        p.status = PaymentStatus::PendingVerification;

        let result = AllocationEngine::new(&store, engine_config()).allocate(&p);
        assert!(matches!(
            result,
            Err(LedgerError::PaymentNotCompleted { .. })
        ));
    }
}
