pub mod allocator;
pub mod builder;
pub mod calendar;
pub mod config;
pub mod currency;
pub mod errors;
pub mod events;
pub mod processor;
pub mod reamortize;
pub mod replay;
pub mod schedule;
pub mod transactions;
pub mod types;

// re-export key types
pub use builder::ScheduleBuilder;
pub use calendar::{EveryDay, HolidayCalendar, WorkingWeek};
pub use config::LoanTerms;
pub use currency::{Currency, Money, Rate, Rounding};
pub use errors::{Result, ScheduleError};
pub use events::{EventStore, ScheduleEvent};
pub use processor::TransactionProcessor;
pub use replay::{ReplayEngine, ReplayOutcome};
pub use schedule::{Installment, ScheduleState};
pub use transactions::{
    Allocation, InstallmentAllocation, Transaction, TransactionId, TransactionKind,
    TransactionLog,
};
pub use types::{
    AmortizationType, ChargeKind, InterestMethod, LoanId, LoanStatus, RepaymentFrequency,
    TranchePlacement,
};

// re-export external dependencies that users will need
pub use chrono;
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
