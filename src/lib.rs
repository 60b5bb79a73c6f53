pub mod allocation;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod exchange;
pub mod interest;
pub mod ledger;
pub mod service;
pub mod store;
pub mod types;

// re-export key types
pub use allocation::{
    plan_allocation, AllocationEngine, AllocationPlan, AllocationRecorder, ApplicationDraft,
    CommitReceipt, UnitLockMap,
};
pub use config::AllocationConfig;
pub use decimal::{Currency, Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use exchange::{Conversion, ExchangeConverter, RateSource};
pub use interest::{AccrualCalculator, AccrualSegment, AccruedInterest};
pub use ledger::{QuotaBalance, QuotaLedgerView};
pub use service::AllocationService;
pub use store::{LedgerRead, LedgerStore, LedgerWrite, MemoryStore};
pub use types::{
    AdjustmentType, CreditStatus, ExchangeRate, InterestConfiguration, InterestType,
    OverpaymentPolicy, Payment, PaymentApplication, PaymentConceptId, PaymentId, PaymentMethod,
    PaymentStatus, PendingCredit, Quota, QuotaAdjustment, QuotaId, QuotaStatus, RatePeriod, UnitId,
    UserId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
