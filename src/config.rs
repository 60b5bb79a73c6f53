use serde::{Deserialize, Serialize};

use crate::decimal::Currency;
use crate::types::OverpaymentPolicy;

/// allocation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// the condominium's accounting currency; every allocation is
    /// computed in it
    pub base_currency: Currency,
    pub overpayment_policy: OverpaymentPolicy,
}

impl AllocationConfig {
    /// default policy: surplus is held as unit credit for administrative
    /// resolution
    pub fn new(base_currency: Currency) -> Self {
        Self {
            base_currency,
            overpayment_policy: OverpaymentPolicy::HoldAsCredit,
        }
    }

    /// reject any payment that exceeds the unit's outstanding balance
    pub fn strict(base_currency: Currency) -> Self {
        Self {
            base_currency,
            overpayment_policy: OverpaymentPolicy::Reject,
        }
    }

    /// bolivar-based condominium, the reference deployment
    pub fn ves_condominium() -> Self {
        Self::new(Currency::ves())
    }
}
