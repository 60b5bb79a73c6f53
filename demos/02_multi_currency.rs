/// multi-currency: a USD payment allocated against VES quotas using the
/// rate effective on the payment date
use chrono::{NaiveDate, TimeZone, Utc};
use quota_ledger_rs::{
    AllocationConfig, AllocationService, Currency, EventStore, ExchangeRate, MemoryStore, Money,
    Payment, PaymentMethod, PaymentStatus, Quota, QuotaStatus, SafeTimeProvider, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = MemoryStore::new();
    let unit_id = Uuid::new_v4();

    // BCV rates; the one effective on the payment date wins
    for (rate, date) in [(dec!(36.00), day(2024, 1, 1)), (dec!(36.50), day(2024, 1, 8))] {
        store.insert_exchange_rate(ExchangeRate {
            id: Uuid::new_v4(),
            from_currency: "USD".to_string(),
            to_currency: "VES".to_string(),
            rate,
            effective_date: date,
            source: "BCV".to_string(),
        });
    }

    // a 1,000 Bs. quota
    store.insert_quota(Quota {
        id: Uuid::new_v4(),
        unit_id,
        payment_concept_id: Uuid::new_v4(),
        period_year: 2024,
        period_month: 1,
        due_date: day(2024, 1, 1),
        amount: Money::from_major(1000),
        currency: Currency::ves(),
        status: QuotaStatus::Pending,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    });

    // a $30 card payment on january 10th -> 30 * 36.50 = 1,095 Bs.
    let payment = Payment {
        id: Uuid::new_v4(),
        unit_id,
        amount: Money::from_major(30),
        currency: Currency::usd(),
        method: PaymentMethod::Card,
        payment_date: day(2024, 1, 10),
        status: PaymentStatus::Completed,
        reference: "CARD-7777".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
    };
    store.insert_payment(payment.clone());

    let service = AllocationService::new(&store, AllocationConfig::ves_condominium());
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap(),
    ));
    let mut events = EventStore::new();

    let receipt = service.register_completed_payment(payment.id, &time, &mut events)?;

    for application in &receipt.applications {
        println!(
            "applied {} Bs. at rate {:?} (quota {})",
            application.applied_amount, application.rate_used, application.quota_id
        );
    }

    // the quota only needed 1,000 Bs.; the 95 Bs. surplus is held as credit
    if let Some(credit) = &receipt.credit {
        println!(
            "surplus of {} {} held as pending credit {}",
            credit.amount, credit.currency, credit.id
        );
    }

    // the persisted rows serialize money as exact decimal strings
    println!(
        "\nfirst application row: {}",
        serde_json::to_string_pretty(&receipt.applications[0])?
    );

    Ok(())
}
