use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::currency::Money;
use crate::types::{ChargeKind, LoanId, LoanStatus};

/// schedule-changed notifications emitted while folding transactions
///
/// collected for an external business-event publisher; transport is out of
/// scope here
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleEvent {
    DisbursementProcessed {
        loan_id: LoanId,
        amount: Money,
        down_payment_due: Money,
        date: NaiveDate,
    },
    PaymentApplied {
        loan_id: LoanId,
        amount: Money,
        excess: Money,
        date: NaiveDate,
    },
    ChargeApplied {
        loan_id: LoanId,
        kind: ChargeKind,
        amount: Money,
        period: u32,
    },
    InterestWaived {
        loan_id: LoanId,
        amount: Money,
        date: NaiveDate,
    },
    ReAmortized {
        loan_id: LoanId,
        effective_date: NaiveDate,
        collapsed_principal: Money,
    },
    WrittenOff {
        loan_id: LoanId,
        principal: Money,
        date: NaiveDate,
    },
    StatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
    },
    ScheduleRebuilt {
        loan_id: LoanId,
        transactions_replayed: usize,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<ScheduleEvent>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: ScheduleEvent) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<ScheduleEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[ScheduleEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
