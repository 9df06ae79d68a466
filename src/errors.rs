use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::currency::Money;
use crate::types::LoanStatus;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("transaction dated {date} precedes first disbursement {first_disbursement}")]
    PaymentBeforeDisbursement {
        date: NaiveDate,
        first_disbursement: NaiveDate,
    },

    #[error("no disbursement has been processed yet")]
    NothingDisbursed,

    #[error("loan not mutable: current status is {status:?}")]
    LoanNotMutable {
        status: LoanStatus,
    },

    #[error("disbursement not allowed: {message}")]
    DisbursementNotAllowed {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("no installment due on {due_date}")]
    UnknownInstallment {
        due_date: NaiveDate,
    },

    #[error("transaction not found: {id}")]
    MissingTransaction {
        id: Uuid,
    },

    #[error("principal conservation violated: due {due} + written off {written_off} != disbursed {disbursed}")]
    ConservationViolation {
        due: Money,
        written_off: Money,
        disbursed: Money,
    },

    #[error("negative due component on period {period}: {amount}")]
    NegativeDue {
        period: u32,
        amount: Money,
    },
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
