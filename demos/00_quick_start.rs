/// quick start - allocate one payment against an outstanding quota
use chrono::{NaiveDate, TimeZone, Utc};
use quota_ledger_rs::{
    AllocationConfig, AllocationService, Currency, EventStore, MemoryStore, Money, Payment,
    PaymentMethod, PaymentStatus, Quota, QuotaStatus, SafeTimeProvider, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = MemoryStore::new();
    let unit_id = Uuid::new_v4();

    // a $50 maintenance quota due january 1st
    let quota = Quota {
        id: Uuid::new_v4(),
        unit_id,
        payment_concept_id: Uuid::new_v4(),
        period_year: 2024,
        period_month: 1,
        due_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        amount: Money::from_major(50),
        currency: Currency::usd(),
        status: QuotaStatus::Pending,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    };
    store.insert_quota(quota);

    // a $30 transfer, already verified
    let payment = Payment {
        id: Uuid::new_v4(),
        unit_id,
        amount: Money::from_major(30),
        currency: Currency::usd(),
        method: PaymentMethod::Transfer,
        payment_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        status: PaymentStatus::Completed,
        reference: "TX-0001".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
    };
    store.insert_payment(payment.clone());

    let service = AllocationService::new(&store, AllocationConfig::new(Currency::usd()));
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap(),
    ));
    let mut events = EventStore::new();

    let receipt = service.register_completed_payment(payment.id, &time, &mut events)?;

    for application in &receipt.applications {
        println!(
            "applied {} (principal {}, interest {}) to quota {}",
            application.applied_amount,
            application.applied_to_principal,
            application.applied_to_interest,
            application.quota_id
        );
    }

    // the quota is now partially paid with $20 outstanding
    for balance in service.outstanding_quotas(unit_id, NaiveDate::from_ymd_opt(2024, 1, 11).unwrap())
    {
        println!(
            "quota {} still due: {}",
            balance.quota.id,
            balance.total_due()
        );
    }

    Ok(())
}
