use chrono::NaiveDate;

use crate::allocator;
use crate::calendar::HolidayCalendar;
use crate::config::LoanTerms;
use crate::currency::Money;
use crate::errors::{Result, ScheduleError};
use crate::schedule::{Installment, ScheduleState};
use crate::types::TranchePlacement;

/// turns loan terms plus disbursement tranches into the installment sequence
///
/// the builder only ever appends or merges forward: past periods are never
/// touched by a new tranche
pub struct ScheduleBuilder<'a> {
    terms: &'a LoanTerms,
    calendar: &'a dyn HolidayCalendar,
}

impl<'a> ScheduleBuilder<'a> {
    pub fn new(terms: &'a LoanTerms, calendar: &'a dyn HolidayCalendar) -> Self {
        Self { terms, calendar }
    }

    /// empty state for the replay fold
    pub fn seed(&self) -> ScheduleState {
        ScheduleState::new(self.terms.loan_id, self.terms.currency.clone())
    }

    /// approval-time projection: the approved principal as a single expected
    /// tranche on the expected disbursement date
    ///
    /// the projection is replaced by the actual schedule at first
    /// disbursement; it never enters the replay fold
    pub fn projected(&self, expected_disbursement: NaiveDate) -> Result<ScheduleState> {
        self.terms.validate()?;
        let mut state = self.seed();
        self.apply_disbursement(&mut state, self.terms.approved_principal, expected_disbursement)?;
        Ok(state)
    }

    /// fold one disbursement tranche into the schedule
    pub fn apply_disbursement(
        &self,
        state: &mut ScheduleState,
        amount: Money,
        date: NaiveDate,
    ) -> Result<Money> {
        if !amount.is_positive() {
            return Err(ScheduleError::InvalidAmount { amount });
        }
        if state.first_disbursed_on.is_some() && !self.terms.multi_disbursement {
            return Err(ScheduleError::DisbursementNotAllowed {
                message: "loan is not configured for multiple disbursements".to_string(),
            });
        }

        let down_payment = self.terms.down_payment_amount(amount);
        if down_payment.is_positive() {
            state
                .installments
                .push(Installment::down_payment(date, down_payment));
        }
        let remaining = amount - down_payment;

        if remaining.is_positive() {
            let merge_targets = self.future_period_indices(state, date);
            if self.terms.placement == TranchePlacement::Vertical && !merge_targets.is_empty() {
                self.merge_tranche(state, remaining, &merge_targets);
            } else {
                self.append_group(state, remaining, date)?;
            }
        }

        state.total_disbursed += amount;
        state.first_disbursed_on = Some(match state.first_disbursed_on {
            Some(first) => first.min(date),
            None => date,
        });
        state.normalize();
        Ok(down_payment)
    }

    /// indices of regular installments still due after the tranche date
    fn future_period_indices(&self, state: &ScheduleState, date: NaiveDate) -> Vec<usize> {
        state
            .installments
            .iter()
            .enumerate()
            .filter(|(_, inst)| !inst.down_payment && inst.due_date > date)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// horizontal placement: a fresh group of periods anchored at the tranche
    fn append_group(&self, state: &mut ScheduleState, principal: Money, anchor: NaiveDate) -> Result<()> {
        let n = self.terms.number_of_installments;
        let amounts = allocator::allocate_group(self.terms, principal, n)?;
        for (k, due) in amounts.into_iter().enumerate() {
            let unadjusted = self.terms.due_date_of(anchor, k as u32 + 1);
            let due_date = self.calendar.adjusted(unadjusted);
            state
                .installments
                .push(Installment::period(due_date, due.principal, due.interest));
        }
        Ok(())
    }

    /// vertical placement: merge the tranche principal into the existing tail,
    /// residue to the last installment of the divided group
    fn merge_tranche(&self, state: &mut ScheduleState, principal: Money, targets: &[usize]) {
        let shares = self
            .terms
            .currency
            .split_evenly(principal, targets.len() as u32);
        for (&idx, share) in targets.iter().zip(shares) {
            state.installments[idx].principal_due += share;
        }
        rederive_declining_interest(self.terms, state);
    }
}

/// re-derive declining-balance interest for unpaid future installments after
/// their principal path changed
///
/// flat and zero-interest products are never touched; installments with any
/// interest already paid keep their figure
pub(crate) fn rederive_declining_interest(terms: &LoanTerms, state: &mut ScheduleState) {
    use crate::types::InterestMethod;

    let rate = terms.period_rate();
    if rate.is_zero() || terms.interest_method != InterestMethod::DecliningBalance {
        return;
    }
    let mut balance: Money = state
        .installments
        .iter()
        .filter(|i| !i.down_payment)
        .map(|i| i.principal_outstanding())
        .sum();
    for inst in state.installments.iter_mut().filter(|i| !i.down_payment) {
        // settled principal fixes the interest figure with it
        if inst.principal_outstanding().is_zero() || !inst.interest_paid.is_zero() {
            balance -= inst.principal_outstanding();
            continue;
        }
        inst.interest_due = terms.currency.round(balance * rate.as_decimal());
        balance -= inst.principal_outstanding();
    }
}
