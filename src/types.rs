use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Currency, Money, Rate};

/// unique identifier for a quota
pub type QuotaId = Uuid;
/// unique identifier for a payment
pub type PaymentId = Uuid;
/// unique identifier for a unit (apartment, office, parking space)
pub type UnitId = Uuid;
/// unique identifier for a payment concept (the recurring fee type)
pub type PaymentConceptId = Uuid;
/// unique identifier for a user
pub type UserId = Uuid;

/// quota status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaStatus {
    /// issued, nothing applied yet
    Pending,
    /// at least one allocation, balance remains
    PartiallyPaid,
    /// principal and interest fully settled (terminal)
    Paid,
    /// past due date, flagged by the scheduled job
    Overdue,
    /// administratively voided (terminal)
    Cancelled,
}

impl QuotaStatus {
    /// statuses a payment can still be applied against
    pub fn is_outstanding(&self) -> bool {
        matches!(
            self,
            QuotaStatus::Pending | QuotaStatus::PartiallyPaid | QuotaStatus::Overdue
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QuotaStatus::Paid | QuotaStatus::Cancelled)
    }
}

/// payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    PendingVerification,
    /// verified; triggers allocation exactly once
    Completed,
    Rejected,
    Refunded,
}

/// payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Transfer,
    Cash,
    Card,
    Gateway,
}

/// manual correction type for a quota's amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Discount,
    Increase,
    Correction,
    Waiver,
}

/// how interest is charged once a quota is past its grace period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestType {
    /// principal * rate * elapsed periods, no compounding
    Simple,
    /// one-time flat charge
    FixedAmount,
}

/// unit of the configured interest rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatePeriod {
    Daily,
    Monthly,
    Annual,
}

/// what to do with a payment surplus once every quota is settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverpaymentPolicy {
    /// hold the surplus as unit credit awaiting administrative resolution
    HoldAsCredit,
    /// fail the allocation, nothing is committed
    Reject,
}

/// resolution state of a held surplus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditStatus {
    Pending,
    Allocated,
    Refunded,
}

/// one billing obligation for a unit in a given period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    pub id: QuotaId,
    pub unit_id: UnitId,
    pub payment_concept_id: PaymentConceptId,
    pub period_year: i32,
    pub period_month: u32,
    pub due_date: NaiveDate,
    /// original principal; corrections live in QuotaAdjustment history
    pub amount: Money,
    pub currency: Currency,
    pub status: QuotaStatus,
    pub created_at: DateTime<Utc>,
}

/// immutable correction to a quota's amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaAdjustment {
    pub id: Uuid,
    pub quota_id: QuotaId,
    pub previous_amount: Money,
    pub new_amount: Money,
    pub adjustment_type: AdjustmentType,
    pub reason: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl QuotaAdjustment {
    /// signed change this adjustment applies to the effective principal
    pub fn delta(&self) -> Money {
        self.new_amount - self.previous_amount
    }
}

/// named interest policy scoped to a payment concept, with a validity window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestConfiguration {
    pub id: Uuid,
    pub payment_concept_id: PaymentConceptId,
    pub name: String,
    pub interest_type: InterestType,
    pub rate: Rate,
    /// flat charge for `InterestType::FixedAmount`
    pub fixed_amount: Option<Money>,
    pub rate_period: RatePeriod,
    pub grace_period_days: u32,
    pub effective_from: NaiveDate,
    /// exclusive upper bound; open-ended when absent
    pub effective_to: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl InterestConfiguration {
    /// active iff effective_from <= date < effective_to
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.effective_from <= date && self.effective_to.map_or(true, |to| date < to)
    }

    /// whether two validity windows share at least one day
    pub fn overlaps(&self, other: &InterestConfiguration) -> bool {
        let self_end = self.effective_to.unwrap_or(NaiveDate::MAX);
        let other_end = other.effective_to.unwrap_or(NaiveDate::MAX);
        self.effective_from < other_end && other.effective_from < self_end
    }
}

/// a single money movement from a user for a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub unit_id: UnitId,
    pub amount: Money,
    pub currency: Currency,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub status: PaymentStatus,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

/// conversion factor between two currencies at an effective date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub id: Uuid,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    pub effective_date: NaiveDate,
    pub source: String,
}

/// atomic join record between a payment and a quota; append-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentApplication {
    pub id: Uuid,
    pub payment_id: PaymentId,
    pub quota_id: QuotaId,
    /// base-currency total applied to this quota
    pub applied_amount: Money,
    pub applied_to_principal: Money,
    pub applied_to_interest: Money,
    /// exchange rate actually used to normalize the payment, if any
    pub rate_used: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// payment surplus held for administrative resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCredit {
    pub id: Uuid,
    pub payment_id: PaymentId,
    pub unit_id: UnitId,
    pub amount: Money,
    pub currency: Currency,
    pub status: CreditStatus,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config_window(from: (i32, u32, u32), to: Option<(i32, u32, u32)>) -> InterestConfiguration {
        InterestConfiguration {
            id: Uuid::new_v4(),
            payment_concept_id: Uuid::new_v4(),
            name: "test".to_string(),
            interest_type: InterestType::Simple,
            rate: Rate::from_percentage(1),
            fixed_amount: None,
            rate_period: RatePeriod::Monthly,
            grace_period_days: 0,
            effective_from: NaiveDate::from_ymd_opt(from.0, from.1, from.2).unwrap(),
            effective_to: to.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap()),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_active_window_half_open() {
        let config = config_window((2024, 1, 1), Some((2024, 7, 1)));

        assert!(config.is_active_on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(config.is_active_on(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()));
        // exclusive upper bound
        assert!(!config.is_active_on(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()));
        assert!(!config.is_active_on(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()));
    }

    #[test]
    fn test_open_ended_window() {
        let config = config_window((2024, 1, 1), None);
        assert!(config.is_active_on(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()));
    }

    #[test]
    fn test_window_overlap() {
        let jan_jun = config_window((2024, 1, 1), Some((2024, 7, 1)));
        let jul_on = config_window((2024, 7, 1), None);
        let mar_on = config_window((2024, 3, 1), None);

        // adjacent half-open windows do not overlap
        assert!(!jan_jun.overlaps(&jul_on));
        assert!(jan_jun.overlaps(&mar_on));
        assert!(jul_on.overlaps(&mar_on));
    }

    #[test]
    fn test_adjustment_delta() {
        let adjustment = QuotaAdjustment {
            id: Uuid::new_v4(),
            quota_id: Uuid::new_v4(),
            previous_amount: Money::from_major(100),
            new_amount: Money::from_major(80),
            adjustment_type: AdjustmentType::Discount,
            reason: "loyalty discount".to_string(),
            created_by: Uuid::new_v4(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };

        assert_eq!(adjustment.delta(), Money::from_major(-20));
    }

    #[test]
    fn test_outstanding_statuses() {
        assert!(QuotaStatus::Pending.is_outstanding());
        assert!(QuotaStatus::PartiallyPaid.is_outstanding());
        assert!(QuotaStatus::Overdue.is_outstanding());
        assert!(!QuotaStatus::Paid.is_outstanding());
        assert!(!QuotaStatus::Cancelled.is_outstanding());
    }
}
