pub mod accrual;

use chrono::NaiveDate;

use crate::types::InterestConfiguration;

pub use accrual::{AccrualCalculator, AccrualSegment, AccruedInterest};

/// the configuration active for a date, if any
///
/// Windows for one payment concept never overlap (the store enforces it),
/// so at most one configuration matches.
pub fn active_configuration(
    configs: &[InterestConfiguration],
    date: NaiveDate,
) -> Option<&InterestConfiguration> {
    configs.iter().find(|c| c.is_active_on(date))
}
