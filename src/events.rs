use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{AdjustmentType, PaymentId, QuotaId, UnitId};

/// all events that can be emitted while operating on the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // allocation events
    PaymentAllocated {
        payment_id: PaymentId,
        unit_id: UnitId,
        converted_amount: Money,
        total_applied: Money,
        surplus: Money,
        timestamp: DateTime<Utc>,
    },
    AllocationReplayed {
        payment_id: PaymentId,
        timestamp: DateTime<Utc>,
    },
    SurplusHeld {
        payment_id: PaymentId,
        unit_id: UnitId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // quota lifecycle events
    QuotaSettled {
        quota_id: QuotaId,
        timestamp: DateTime<Utc>,
    },
    QuotaPartiallyPaid {
        quota_id: QuotaId,
        outstanding: Money,
        timestamp: DateTime<Utc>,
    },
    QuotaOverdue {
        quota_id: QuotaId,
        due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    QuotaCancelled {
        quota_id: QuotaId,
        timestamp: DateTime<Utc>,
    },
    QuotaAdjusted {
        quota_id: QuotaId,
        previous_amount: Money,
        new_amount: Money,
        adjustment_type: AdjustmentType,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
