use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Currency, Money};
use crate::errors::{LedgerError, Result};
use crate::types::ExchangeRate;

/// source of exchange rates, ordered by effective date
pub trait RateSource {
    /// the rate with the greatest effective_date <= as_of for the pair
    fn latest_rate(&self, from: &str, to: &str, as_of: NaiveDate) -> Option<ExchangeRate>;
}

/// result of normalizing an amount into another currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub original_amount: Money,
    pub from: Currency,
    pub to: Currency,
    /// converted amount, rounded half-even to the target currency's decimals
    pub amount: Money,
    /// rate actually applied; None for a same-currency identity conversion
    pub rate_used: Option<Decimal>,
    pub as_of: NaiveDate,
}

/// converts monetary amounts between currencies using dated rates
pub struct ExchangeConverter<'a, S: RateSource> {
    source: &'a S,
}

impl<'a, S: RateSource> ExchangeConverter<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// convert `amount` from one currency to another as of a date
    ///
    /// Same-currency conversion is an identity: no rate lookup happens and
    /// `rate_used` stays None. Fails with `NoRateAvailable` when no rate
    /// with `effective_date <= as_of` exists for the pair.
    pub fn convert(
        &self,
        amount: Money,
        from: &Currency,
        to: &Currency,
        as_of: NaiveDate,
    ) -> Result<Conversion> {
        if from.code == to.code {
            return Ok(Conversion {
                original_amount: amount,
                from: from.clone(),
                to: to.clone(),
                amount,
                rate_used: None,
                as_of,
            });
        }

        let rate = self
            .source
            .latest_rate(&from.code, &to.code, as_of)
            .ok_or_else(|| LedgerError::NoRateAvailable {
                from: from.code.clone(),
                to: to.code.clone(),
                as_of,
            })?;

        let converted = (amount * rate.rate).round_to_currency(to);

        Ok(Conversion {
            original_amount: amount,
            from: from.clone(),
            to: to.clone(),
            amount: converted,
            rate_used: Some(rate.rate),
            as_of,
        })
    }
}
