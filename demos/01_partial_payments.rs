/// partial payments with arrears interest: oldest quota first, interest
/// settled before principal
use chrono::{NaiveDate, TimeZone, Utc};
use quota_ledger_rs::{
    AllocationConfig, AllocationService, Currency, EventStore, InterestConfiguration,
    InterestType, MemoryStore, Money, Payment, PaymentMethod, PaymentStatus, Quota, QuotaStatus,
    Rate, RatePeriod, SafeTimeProvider, TimeSource, Uuid,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = MemoryStore::new();
    let unit_id = Uuid::new_v4();
    let concept_id = Uuid::new_v4();

    // 10% monthly arrears interest after a 5-day grace period
    store.insert_interest_configuration(InterestConfiguration {
        id: Uuid::new_v4(),
        payment_concept_id: concept_id,
        name: "maintenance arrears".to_string(),
        interest_type: InterestType::Simple,
        rate: Rate::from_percentage(10),
        fixed_amount: None,
        rate_period: RatePeriod::Monthly,
        grace_period_days: 5,
        effective_from: day(2023, 1, 1),
        effective_to: None,
        created_at: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
    })?;

    // two months of quotas, january and february
    for (month, due) in [(1u32, day(2024, 1, 1)), (2u32, day(2024, 2, 1))] {
        store.insert_quota(Quota {
            id: Uuid::new_v4(),
            unit_id,
            payment_concept_id: concept_id,
            period_year: 2024,
            period_month: month,
            due_date: due,
            amount: Money::from_major(100),
            currency: Currency::usd(),
            status: QuotaStatus::Pending,
            created_at: Utc.with_ymd_and_hms(2023, 12, 15, 0, 0, 0).unwrap(),
        });
    }

    let service = AllocationService::new(&store, AllocationConfig::new(Currency::usd()));
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    ));
    let mut events = EventStore::new();

    // the unit's position on march 1st: both quotas overdue with interest
    println!("position before payment:");
    for balance in service.outstanding_quotas(unit_id, day(2024, 3, 1)) {
        println!(
            "  quota due {}: principal {}, interest {}, total {}",
            balance.quota.due_date,
            balance.outstanding_principal,
            balance.accrued_interest,
            balance.total_due()
        );
    }

    // $150 covers january's interest and principal, then starts on february
    let payment = Payment {
        id: Uuid::new_v4(),
        unit_id,
        amount: Money::from_major(150),
        currency: Currency::usd(),
        method: PaymentMethod::Cash,
        payment_date: day(2024, 3, 1),
        status: PaymentStatus::Completed,
        reference: "CASH-0042".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
    };
    store.insert_payment(payment.clone());

    let receipt = service.register_completed_payment(payment.id, &time, &mut events)?;

    println!("\nallocations:");
    for application in &receipt.applications {
        println!(
            "  quota {}: applied {} = {} interest + {} principal",
            application.quota_id,
            application.applied_amount,
            application.applied_to_interest,
            application.applied_to_principal
        );
    }

    println!("\nemitted events:");
    for event in events.events() {
        println!("  {event:?}");
    }

    Ok(())
}
