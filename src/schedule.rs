use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::currency::{Currency, Money};
use crate::errors::{Result, ScheduleError};
use crate::types::{LoanId, LoanStatus};

/// one scheduled due-date entry in the repayment schedule
///
/// `*_due` components are what the schedule demands; paid, waived and
/// written-off amounts record how the obligation was met. write-off moves an
/// outstanding remainder out of `*_due` into `*_written_off`, so
/// `sum(principal_due) + sum(principal_written_off)` always reproduces the
/// disbursed total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub period: u32,
    pub from_date: NaiveDate,
    pub due_date: NaiveDate,
    /// same-day, zero-interest, principal-only period created at disbursement
    pub down_payment: bool,

    pub principal_due: Money,
    pub principal_paid: Money,
    pub principal_written_off: Money,

    pub interest_due: Money,
    pub interest_paid: Money,
    pub interest_waived: Money,
    pub interest_written_off: Money,

    pub fee_due: Money,
    pub fee_paid: Money,
    pub fee_written_off: Money,

    pub penalty_due: Money,
    pub penalty_paid: Money,
    pub penalty_written_off: Money,

    /// derived: every due component fully paid, waived or written off
    pub completed: bool,
    pub obligation_met_on: Option<NaiveDate>,
}

impl Installment {
    pub fn period(due_date: NaiveDate, principal: Money, interest: Money) -> Self {
        Self::blank(due_date, false, principal, interest)
    }

    pub fn down_payment(due_date: NaiveDate, principal: Money) -> Self {
        Self::blank(due_date, true, principal, Money::ZERO)
    }

    fn blank(due_date: NaiveDate, down_payment: bool, principal: Money, interest: Money) -> Self {
        Self {
            period: 0,
            from_date: due_date,
            due_date,
            down_payment,
            principal_due: principal,
            principal_paid: Money::ZERO,
            principal_written_off: Money::ZERO,
            interest_due: interest,
            interest_paid: Money::ZERO,
            interest_waived: Money::ZERO,
            interest_written_off: Money::ZERO,
            fee_due: Money::ZERO,
            fee_paid: Money::ZERO,
            fee_written_off: Money::ZERO,
            penalty_due: Money::ZERO,
            penalty_paid: Money::ZERO,
            penalty_written_off: Money::ZERO,
            completed: false,
            obligation_met_on: None,
        }
    }

    pub fn principal_outstanding(&self) -> Money {
        self.principal_due - self.principal_paid
    }

    pub fn interest_outstanding(&self) -> Money {
        self.interest_due - self.interest_paid - self.interest_waived
    }

    pub fn fee_outstanding(&self) -> Money {
        self.fee_due - self.fee_paid
    }

    pub fn penalty_outstanding(&self) -> Money {
        self.penalty_due - self.penalty_paid
    }

    pub fn total_outstanding(&self) -> Money {
        self.principal_outstanding()
            + self.interest_outstanding()
            + self.fee_outstanding()
            + self.penalty_outstanding()
    }

    pub fn total_due(&self) -> Money {
        self.principal_due + self.interest_due + self.fee_due + self.penalty_due
    }

    /// re-derive the completed flag; `as_of` stamps a newly met obligation
    pub fn refresh_completed(&mut self, as_of: NaiveDate) {
        let met = self.total_outstanding().is_zero();
        if met && !self.completed {
            self.obligation_met_on = Some(as_of);
        }
        if !met {
            self.obligation_met_on = None;
        }
        self.completed = met;
    }

    fn check_non_negative(&self) -> Result<()> {
        let components = [
            self.principal_due,
            self.interest_due,
            self.fee_due,
            self.penalty_due,
            self.principal_outstanding(),
            self.interest_outstanding(),
            self.fee_outstanding(),
            self.penalty_outstanding(),
        ];
        for amount in components {
            if amount.is_negative() {
                return Err(ScheduleError::NegativeDue {
                    period: self.period,
                    amount,
                });
            }
        }
        Ok(())
    }
}

/// the derived, ordered installment sequence for a loan
///
/// never hand-edited: always produced by folding the transaction log through
/// the replay engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleState {
    pub loan_id: LoanId,
    pub currency: Currency,
    pub installments: Vec<Installment>,
    pub total_disbursed: Money,
    pub first_disbursed_on: Option<NaiveDate>,
    /// payment excess beyond every obligation, held against the loan
    pub overpayment: Money,
    pub status: LoanStatus,
}

impl ScheduleState {
    pub fn new(loan_id: LoanId, currency: Currency) -> Self {
        Self {
            loan_id,
            currency,
            installments: Vec::new(),
            total_disbursed: Money::ZERO,
            first_disbursed_on: None,
            overpayment: Money::ZERO,
            status: LoanStatus::Active,
        }
    }

    pub fn outstanding_principal(&self) -> Money {
        self.installments.iter().map(|i| i.principal_outstanding()).sum()
    }

    pub fn total_outstanding(&self) -> Money {
        self.installments.iter().map(|i| i.total_outstanding()).sum()
    }

    /// sort by due date (down payments first on equal dates), renumber and
    /// re-chain the from dates
    pub fn normalize(&mut self) {
        self.installments
            .sort_by_key(|i| (i.due_date, !i.down_payment));
        let mut prev = self.first_disbursed_on;
        for (idx, inst) in self.installments.iter_mut().enumerate() {
            inst.period = idx as u32 + 1;
            inst.from_date = if inst.down_payment {
                inst.due_date
            } else {
                prev.unwrap_or(inst.due_date)
            };
            prev = Some(inst.due_date);
        }
    }

    /// re-derive completion flags and the loan status
    pub fn refresh_derived(&mut self, as_of: NaiveDate) {
        for inst in &mut self.installments {
            inst.refresh_completed(as_of);
        }
        if self.status == LoanStatus::WrittenOff {
            return;
        }
        let settled = self.first_disbursed_on.is_some()
            && self.installments.iter().all(|i| i.completed);
        self.status = if settled {
            if self.overpayment.is_positive() {
                LoanStatus::Overpaid
            } else {
                LoanStatus::ObligationsMet
            }
        } else {
            LoanStatus::Active
        };
    }

    /// monetary conservation: principal due plus written-off principal must
    /// reproduce the disbursed total exactly, and no component may go negative
    ///
    /// a violation is a defect in allocation or redistribution, never a
    /// recoverable condition
    pub fn check_conservation(&self) -> Result<()> {
        for inst in &self.installments {
            inst.check_non_negative()?;
        }
        let due: Money = self.installments.iter().map(|i| i.principal_due).sum();
        let written_off: Money = self.installments.iter().map(|i| i.principal_written_off).sum();
        if due + written_off != self.total_disbursed {
            return Err(ScheduleError::ConservationViolation {
                due,
                written_off,
                disbursed: self.total_disbursed,
            });
        }
        Ok(())
    }
}
