use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Currency, Money};
use crate::types::{InterestConfiguration, InterestType, RatePeriod};

/// days a configured rate covers
fn period_days(period: RatePeriod) -> u32 {
    match period {
        RatePeriod::Daily => 1,
        RatePeriod::Monthly => 30,
        RatePeriod::Annual => 365,
    }
}

/// one configuration window's contribution to accrued interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualSegment {
    pub configuration_id: uuid::Uuid,
    pub interest_type: InterestType,
    /// first day that accrued in this window
    pub from: NaiveDate,
    /// last day that accrued in this window
    pub to: NaiveDate,
    pub days: u32,
    pub amount: Money,
}

/// accrued-interest result with its per-window breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AccruedInterest {
    pub total: Money,
    pub segments: Vec<AccrualSegment>,
}

impl AccruedInterest {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// computes interest accrued on an overdue quota
///
/// Interest is simple (never compounds) and accrues on the current
/// outstanding principal. A day `d` accrues under a configuration iff the
/// configuration is active on `d` and `d` is past that configuration's
/// grace period counted from the due date. When configurations change
/// mid-interval the result is piecewise, one segment per window.
pub struct AccrualCalculator {
    base_currency: Currency,
}

impl AccrualCalculator {
    pub fn new(base_currency: Currency) -> Self {
        Self { base_currency }
    }

    pub fn accrued(
        &self,
        outstanding_principal: Money,
        due_date: NaiveDate,
        configs: &[InterestConfiguration],
        as_of: NaiveDate,
    ) -> AccruedInterest {
        // no principal or no configuration: a defined zero, not an error
        if !outstanding_principal.is_positive() || configs.is_empty() {
            return AccruedInterest::zero();
        }

        let mut ordered: Vec<&InterestConfiguration> = configs.iter().collect();
        ordered.sort_by_key(|c| c.effective_from);

        let mut segments = Vec::new();
        let mut total = Money::ZERO;

        for config in ordered {
            if let Some(segment) =
                self.window_segment(outstanding_principal, due_date, config, as_of)
            {
                total += segment.amount;
                segments.push(segment);
            }
        }

        AccruedInterest { total, segments }
    }

    /// the accruing slice of one configuration window, if any
    fn window_segment(
        &self,
        principal: Money,
        due_date: NaiveDate,
        config: &InterestConfiguration,
        as_of: NaiveDate,
    ) -> Option<AccrualSegment> {
        let grace_end = due_date + Duration::days(config.grace_period_days as i64);
        let accrual_start = grace_end + Duration::days(1);

        let from = accrual_start.max(config.effective_from);
        let to = match config.effective_to {
            // effective_to is exclusive
            Some(end) => as_of.min(end - Duration::days(1)),
            None => as_of,
        };

        if from > to {
            return None;
        }

        let days = (to - from).num_days() as u32 + 1;

        let amount = match config.interest_type {
            InterestType::Simple => {
                let per_day = config.rate.as_decimal() / Decimal::from(period_days(config.rate_period));
                (principal * per_day * Decimal::from(days)).round_to_currency(&self.base_currency)
            }
            InterestType::FixedAmount => config
                .fixed_amount
                .unwrap_or(Money::ZERO)
                .round_to_currency(&self.base_currency),
        };

        Some(AccrualSegment {
            configuration_id: config.id,
            interest_type: config.interest_type,
            from,
            to,
            days,
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use chrono::Utc;
    use uuid::Uuid;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly_config(
        rate_pct: u32,
        grace_days: u32,
        from: NaiveDate,
        to: Option<NaiveDate>,
    ) -> InterestConfiguration {
        InterestConfiguration {
            id: Uuid::new_v4(),
            payment_concept_id: Uuid::new_v4(),
            name: "arrears interest".to_string(),
            interest_type: InterestType::Simple,
            rate: Rate::from_percentage(rate_pct),
            fixed_amount: None,
            rate_period: RatePeriod::Monthly,
            grace_period_days: grace_days,
            effective_from: from,
            effective_to: to,
            created_at: Utc::now(),
        }
    }

    fn calculator() -> AccrualCalculator {
        AccrualCalculator::new(Currency::usd())
    }

    #[test]
    fn test_no_configuration_means_zero() {
        let accrued = calculator().accrued(
            Money::from_major(100),
            day(2024, 1, 1),
            &[],
            day(2024, 6, 1),
        );

        assert_eq!(accrued.total, Money::ZERO);
        assert!(accrued.segments.is_empty());
    }

    #[test]
    fn test_zero_principal_never_accrues() {
        let config = monthly_config(1, 0, day(2023, 1, 1), None);
        let accrued =
            calculator().accrued(Money::ZERO, day(2024, 1, 1), &[config], day(2024, 6, 1));

        assert_eq!(accrued.total, Money::ZERO);
    }

    #[test]
    fn test_grace_period_boundary() {
        // due 2024-01-01, 5-day grace, 1% monthly
        let config = monthly_config(1, 5, day(2023, 1, 1), None);
        let principal = Money::from_major(100);

        // within grace: zero
        let in_grace =
            calculator().accrued(principal, day(2024, 1, 1), &[config.clone()], day(2024, 1, 5));
        assert_eq!(in_grace.total, Money::ZERO);

        // last grace day is due + 5: still zero
        let at_edge =
            calculator().accrued(principal, day(2024, 1, 1), &[config.clone()], day(2024, 1, 6));
        assert_eq!(at_edge.total, Money::ZERO);

        // past grace: positive, 4 accrual days (jan 7 .. jan 10)
        let past = calculator().accrued(principal, day(2024, 1, 1), &[config], day(2024, 1, 10));
        assert!(past.total.is_positive());
        assert_eq!(past.segments.len(), 1);
        assert_eq!(past.segments[0].days, 4);
        // 100 * (0.01 / 30) * 4 = 0.1333.. -> 0.13
        assert_eq!(past.total, Money::from_str_exact("0.13").unwrap());
    }

    #[test]
    fn test_full_month_accrues_full_monthly_rate() {
        let config = monthly_config(1, 0, day(2023, 1, 1), None);

        // due jan 1, zero grace: accrual days jan 2 .. jan 31 = 30 days
        let accrued = calculator().accrued(
            Money::from_major(100),
            day(2024, 1, 1),
            &[config],
            day(2024, 1, 31),
        );

        assert_eq!(accrued.segments[0].days, 30);
        assert_eq!(accrued.total, Money::from_str_exact("1.00").unwrap());
    }

    #[test]
    fn test_piecewise_across_configuration_change() {
        // 1% monthly through january, 2% monthly from february on
        let first = monthly_config(1, 0, day(2023, 1, 1), Some(day(2024, 2, 1)));
        let second = monthly_config(2, 0, day(2024, 2, 1), None);

        let accrued = calculator().accrued(
            Money::from_major(100),
            day(2024, 1, 1),
            &[second.clone(), first.clone()],
            day(2024, 3, 1),
        );

        assert_eq!(accrued.segments.len(), 2);

        // first window: jan 2 .. jan 31 (effective_to 2024-02-01 is exclusive)
        assert_eq!(accrued.segments[0].configuration_id, first.id);
        assert_eq!(accrued.segments[0].to, day(2024, 1, 31));
        assert_eq!(accrued.segments[0].days, 30);
        assert_eq!(accrued.segments[0].amount, Money::from_str_exact("1.00").unwrap());

        // second window: feb 1 .. mar 1 = 30 days (leap february)
        assert_eq!(accrued.segments[1].configuration_id, second.id);
        assert_eq!(accrued.segments[1].days, 30);
        assert_eq!(accrued.segments[1].amount, Money::from_str_exact("2.00").unwrap());

        assert_eq!(accrued.total, Money::from_str_exact("3.00").unwrap());
    }

    #[test]
    fn test_annual_rate_proration() {
        let config = InterestConfiguration {
            rate_period: RatePeriod::Annual,
            rate: Rate::from_percentage(12),
            ..monthly_config(12, 0, day(2023, 1, 1), None)
        };

        // 73 accrual days: 1000 * 0.12 / 365 * 73 = 24.00
        let accrued = calculator().accrued(
            Money::from_major(1000),
            day(2024, 1, 1),
            &[config],
            day(2024, 3, 14),
        );

        assert_eq!(accrued.segments[0].days, 73);
        assert_eq!(accrued.total, Money::from_str_exact("24.00").unwrap());
    }

    #[test]
    fn test_fixed_amount_charged_once() {
        let config = InterestConfiguration {
            interest_type: InterestType::FixedAmount,
            fixed_amount: Some(Money::from_major(15)),
            ..monthly_config(0, 3, day(2023, 1, 1), None)
        };

        let accrued = calculator().accrued(
            Money::from_major(100),
            day(2024, 1, 1),
            &[config.clone()],
            day(2024, 4, 1),
        );
        assert_eq!(accrued.total, Money::from_major(15));

        // still inside grace: nothing charged
        let in_grace = calculator().accrued(
            Money::from_major(100),
            day(2024, 1, 1),
            &[config],
            day(2024, 1, 3),
        );
        assert_eq!(in_grace.total, Money::ZERO);
    }
}
