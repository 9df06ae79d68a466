use crate::builder::ScheduleBuilder;
use crate::calendar::HolidayCalendar;
use crate::config::LoanTerms;
use crate::currency::Money;
use crate::errors::{Result, ScheduleError};
use crate::events::{EventStore, ScheduleEvent};
use crate::reamortize;
use crate::schedule::ScheduleState;
use crate::transactions::{Allocation, InstallmentAllocation, Transaction, TransactionKind};
use crate::types::ChargeKind;

/// applies one transaction against the current schedule
///
/// validation happens before any mutation; a rejected transaction leaves the
/// state untouched. the processor is only ever driven by the replay engine
pub struct TransactionProcessor<'a> {
    terms: &'a LoanTerms,
    calendar: &'a dyn HolidayCalendar,
}

impl<'a> TransactionProcessor<'a> {
    pub fn new(terms: &'a LoanTerms, calendar: &'a dyn HolidayCalendar) -> Self {
        Self { terms, calendar }
    }

    pub fn apply(
        &self,
        state: &mut ScheduleState,
        txn: &Transaction,
        events: &mut EventStore,
    ) -> Result<Allocation> {
        self.validate(state, txn)?;

        let old_status = state.status;
        let allocation = match &txn.kind {
            TransactionKind::Disbursement => self.apply_disbursement(state, txn, events)?,
            TransactionKind::Repayment => self.apply_repayment(state, txn, events)?,
            TransactionKind::Charge {
                kind,
                due_date,
                target,
            } => self.apply_charge(state, txn, *kind, *due_date, *target, events)?,
            TransactionKind::ReAmortize => {
                let allocation = reamortize::apply(self.terms, state, txn)?;
                events.emit(ScheduleEvent::ReAmortized {
                    loan_id: state.loan_id,
                    effective_date: txn.date,
                    collapsed_principal: allocation.total_allocated(),
                });
                allocation
            }
            TransactionKind::InterestWaiver => self.apply_waiver(state, txn, events)?,
            TransactionKind::WriteOff => self.apply_write_off(state, txn, events)?,
        };

        state.refresh_derived(txn.date);
        state.check_conservation()?;
        if state.status != old_status {
            events.emit(ScheduleEvent::StatusChanged {
                loan_id: state.loan_id,
                old_status,
                new_status: state.status,
            });
        }
        Ok(allocation)
    }

    fn validate(&self, state: &ScheduleState, txn: &Transaction) -> Result<()> {
        if !state.status.is_mutable() {
            return Err(ScheduleError::LoanNotMutable {
                status: state.status,
            });
        }
        match &txn.kind {
            TransactionKind::Disbursement | TransactionKind::Repayment | TransactionKind::Charge { .. } => {
                if !txn.amount.is_positive() {
                    return Err(ScheduleError::InvalidAmount { amount: txn.amount });
                }
            }
            TransactionKind::InterestWaiver => {
                if !txn.amount.is_positive() {
                    return Err(ScheduleError::InvalidAmount { amount: txn.amount });
                }
            }
            TransactionKind::ReAmortize | TransactionKind::WriteOff => {}
        }
        if !matches!(txn.kind, TransactionKind::Disbursement) {
            match state.first_disbursed_on {
                None => return Err(ScheduleError::NothingDisbursed),
                Some(first) if txn.date < first => {
                    return Err(ScheduleError::PaymentBeforeDisbursement {
                        date: txn.date,
                        first_disbursement: first,
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn apply_disbursement(
        &self,
        state: &mut ScheduleState,
        txn: &Transaction,
        events: &mut EventStore,
    ) -> Result<Allocation> {
        let builder = ScheduleBuilder::new(self.terms, self.calendar);
        let down_payment_due = builder.apply_disbursement(state, txn.amount, txn.date)?;
        events.emit(ScheduleEvent::DisbursementProcessed {
            loan_id: state.loan_id,
            amount: txn.amount,
            down_payment_due,
            date: txn.date,
        });
        Ok(Allocation::new(txn.id))
    }

    /// waterfall: oldest unmet installment first, penalties before fees
    /// before interest before principal, excess spilling forward
    fn apply_repayment(
        &self,
        state: &mut ScheduleState,
        txn: &Transaction,
        events: &mut EventStore,
    ) -> Result<Allocation> {
        let mut allocation = Allocation::new(txn.id);
        let mut remaining = txn.amount;

        for inst in state.installments.iter_mut() {
            if remaining.is_zero() {
                break;
            }
            if inst.completed {
                continue;
            }
            let mut entry = InstallmentAllocation {
                period: inst.period,
                ..Default::default()
            };

            let to_penalty = remaining.min(inst.penalty_outstanding());
            inst.penalty_paid += to_penalty;
            entry.to_penalty = to_penalty;
            remaining -= to_penalty;

            let to_fee = remaining.min(inst.fee_outstanding());
            inst.fee_paid += to_fee;
            entry.to_fee = to_fee;
            remaining -= to_fee;

            let to_interest = remaining.min(inst.interest_outstanding());
            inst.interest_paid += to_interest;
            entry.to_interest = to_interest;
            remaining -= to_interest;

            let to_principal = remaining.min(inst.principal_outstanding());
            inst.principal_paid += to_principal;
            entry.to_principal = to_principal;
            remaining -= to_principal;

            if !entry.is_empty() {
                allocation.entries.push(entry);
            }
        }

        if remaining.is_positive() {
            state.overpayment += remaining;
            allocation.excess = remaining;
        }
        events.emit(ScheduleEvent::PaymentApplied {
            loan_id: state.loan_id,
            amount: txn.amount,
            excess: allocation.excess,
            date: txn.date,
        });
        Ok(allocation)
    }

    /// attach a charge to the explicitly targeted installment, or the first
    /// installment due on or after the charge due date, or the last one
    ///
    /// explicit targets resolve by due date, which unlike the period number
    /// survives the renumbering a backdated tranche causes on rebuild
    fn apply_charge(
        &self,
        state: &mut ScheduleState,
        txn: &Transaction,
        kind: ChargeKind,
        due_date: chrono::NaiveDate,
        target: Option<chrono::NaiveDate>,
        events: &mut EventStore,
    ) -> Result<Allocation> {
        let idx = match target {
            Some(on) => state
                .installments
                .iter()
                .position(|i| !i.down_payment && i.due_date == on)
                .ok_or(ScheduleError::UnknownInstallment { due_date: on })?,
            None => state
                .installments
                .iter()
                .position(|i| !i.down_payment && i.due_date >= due_date)
                .or_else(|| {
                    state
                        .installments
                        .iter()
                        .rposition(|i| !i.down_payment)
                })
                .ok_or(ScheduleError::NothingDisbursed)?,
        };

        let inst = &mut state.installments[idx];
        match kind {
            ChargeKind::Fee => inst.fee_due += txn.amount,
            ChargeKind::Penalty => inst.penalty_due += txn.amount,
        }
        events.emit(ScheduleEvent::ChargeApplied {
            loan_id: state.loan_id,
            kind,
            amount: txn.amount,
            period: state.installments[idx].period,
        });
        Ok(Allocation::new(txn.id))
    }

    /// waive outstanding interest oldest-first up to the transaction amount
    fn apply_waiver(
        &self,
        state: &mut ScheduleState,
        txn: &Transaction,
        events: &mut EventStore,
    ) -> Result<Allocation> {
        let mut allocation = Allocation::new(txn.id);
        let mut remaining = txn.amount;
        for inst in state.installments.iter_mut() {
            if remaining.is_zero() {
                break;
            }
            let waived = remaining.min(inst.interest_outstanding());
            if waived.is_positive() {
                inst.interest_waived += waived;
                remaining -= waived;
                allocation.entries.push(InstallmentAllocation {
                    period: inst.period,
                    to_interest: waived,
                    ..Default::default()
                });
            }
        }
        allocation.excess = remaining;
        events.emit(ScheduleEvent::InterestWaived {
            loan_id: state.loan_id,
            amount: txn.amount - remaining,
            date: txn.date,
        });
        Ok(allocation)
    }

    /// move every outstanding component into its written-off bucket; the loan
    /// becomes immutable
    fn apply_write_off(
        &self,
        state: &mut ScheduleState,
        txn: &Transaction,
        events: &mut EventStore,
    ) -> Result<Allocation> {
        let mut allocation = Allocation::new(txn.id);
        let mut principal_written_off = Money::ZERO;
        for inst in state.installments.iter_mut() {
            let principal = inst.principal_outstanding();
            let interest = inst.interest_outstanding();
            let fee = inst.fee_outstanding();
            let penalty = inst.penalty_outstanding();
            if (principal + interest + fee + penalty).is_zero() {
                continue;
            }
            inst.principal_due -= principal;
            inst.principal_written_off += principal;
            inst.interest_due -= interest;
            inst.interest_written_off += interest;
            inst.fee_due -= fee;
            inst.fee_written_off += fee;
            inst.penalty_due -= penalty;
            inst.penalty_written_off += penalty;
            principal_written_off += principal;
            allocation.entries.push(InstallmentAllocation {
                period: inst.period,
                to_penalty: penalty,
                to_fee: fee,
                to_interest: interest,
                to_principal: principal,
            });
        }
        state.status = crate::types::LoanStatus::WrittenOff;
        events.emit(ScheduleEvent::WrittenOff {
            loan_id: state.loan_id,
            principal: principal_written_off,
            date: txn.date,
        });
        Ok(allocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::EveryDay;
    use crate::currency::{Currency, Rate};
    use crate::transactions::TransactionLog;
    use crate::types::{AmortizationType, InterestMethod, LoanStatus, RepaymentFrequency, TranchePlacement};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn terms() -> LoanTerms {
        LoanTerms {
            loan_id: Uuid::new_v4(),
            currency: Currency::usd(),
            approved_principal: Money::from_major(500),
            number_of_installments: 3,
            repayment_every: 15,
            repayment_frequency: RepaymentFrequency::Days,
            interest_rate: Rate::ZERO,
            amortization: AmortizationType::EqualPrincipal,
            interest_method: InterestMethod::DecliningBalance,
            down_payment: Some(Rate::from_percentage(25)),
            multi_disbursement: false,
            placement: TranchePlacement::Horizontal,
        }
    }

    fn txn(kind: TransactionKind, amount: Money, date: NaiveDate) -> Transaction {
        let mut log = TransactionLog::new();
        let id = log.append(kind, amount, date);
        log.get(id).unwrap().clone()
    }

    fn disbursed_state(terms: &LoanTerms) -> ScheduleState {
        let processor = TransactionProcessor::new(terms, &EveryDay);
        let mut state = ScheduleState::new(terms.loan_id, terms.currency.clone());
        let mut events = EventStore::new();
        processor
            .apply(
                &mut state,
                &txn(TransactionKind::Disbursement, Money::from_major(500), date(2024, 1, 1)),
                &mut events,
            )
            .unwrap();
        state
    }

    #[test]
    fn test_waterfall_order_within_installment() {
        let terms = terms();
        let processor = TransactionProcessor::new(&terms, &EveryDay);
        let mut state = disbursed_state(&terms);
        let mut events = EventStore::new();

        // load charges onto the down payment installment
        state.installments[0].fee_due = Money::from_major(10);
        state.installments[0].penalty_due = Money::from_major(5);

        let allocation = processor
            .apply(
                &mut state,
                &txn(TransactionKind::Repayment, Money::from_major(12), date(2024, 1, 2)),
                &mut events,
            )
            .unwrap();

        let entry = &allocation.entries[0];
        assert_eq!(entry.to_penalty, Money::from_major(5));
        assert_eq!(entry.to_fee, Money::from_major(7));
        assert_eq!(entry.to_interest, Money::ZERO);
        assert_eq!(entry.to_principal, Money::ZERO);
    }

    #[test]
    fn test_payment_spills_into_next_installment() {
        let terms = terms();
        let processor = TransactionProcessor::new(&terms, &EveryDay);
        let mut state = disbursed_state(&terms);
        let mut events = EventStore::new();

        // covers the down payment, the first installment and half the second
        let allocation = processor
            .apply(
                &mut state,
                &txn(TransactionKind::Repayment, Money::from_decimal(dec!(312.50)), date(2024, 1, 2)),
                &mut events,
            )
            .unwrap();

        assert_eq!(allocation.entries.len(), 3);
        assert_eq!(allocation.entries[0].to_principal, Money::from_major(125));
        assert_eq!(allocation.entries[1].to_principal, Money::from_major(125));
        assert_eq!(allocation.entries[2].to_principal, Money::from_decimal(dec!(62.50)));
        assert!(state.installments[0].completed);
        assert!(state.installments[1].completed);
        assert!(!state.installments[2].completed);
        assert_eq!(allocation.excess, Money::ZERO);
    }

    #[test]
    fn test_overpayment_recorded_as_excess() {
        let terms = terms();
        let processor = TransactionProcessor::new(&terms, &EveryDay);
        let mut state = disbursed_state(&terms);
        let mut events = EventStore::new();

        let allocation = processor
            .apply(
                &mut state,
                &txn(TransactionKind::Repayment, Money::from_major(600), date(2024, 1, 2)),
                &mut events,
            )
            .unwrap();

        assert_eq!(allocation.excess, Money::from_major(100));
        assert_eq!(state.overpayment, Money::from_major(100));
        assert_eq!(state.status, LoanStatus::Overpaid);
    }

    #[test]
    fn test_non_positive_payment_rejected_without_effect() {
        let terms = terms();
        let processor = TransactionProcessor::new(&terms, &EveryDay);
        let mut state = disbursed_state(&terms);
        let before = state.clone();
        let mut events = EventStore::new();

        let err = processor.apply(
            &mut state,
            &txn(TransactionKind::Repayment, Money::ZERO, date(2024, 1, 2)),
            &mut events,
        );
        assert!(matches!(err, Err(ScheduleError::InvalidAmount { .. })));
        assert_eq!(state, before);
    }

    #[test]
    fn test_payment_before_first_disbursement_rejected() {
        let terms = terms();
        let processor = TransactionProcessor::new(&terms, &EveryDay);
        let mut state = disbursed_state(&terms);
        let mut events = EventStore::new();

        let err = processor.apply(
            &mut state,
            &txn(TransactionKind::Repayment, Money::from_major(10), date(2023, 12, 31)),
            &mut events,
        );
        assert!(matches!(err, Err(ScheduleError::PaymentBeforeDisbursement { .. })));
    }

    #[test]
    fn test_charge_attaches_to_nearest_installment() {
        let terms = terms();
        let processor = TransactionProcessor::new(&terms, &EveryDay);
        let mut state = disbursed_state(&terms);
        let mut events = EventStore::new();

        // due 2024-01-20 lands on the installment due 2024-01-31
        processor
            .apply(
                &mut state,
                &txn(
                    TransactionKind::Charge {
                        kind: ChargeKind::Fee,
                        due_date: date(2024, 1, 20),
                        target: None,
                    },
                    Money::from_major(10),
                    date(2024, 1, 20),
                ),
                &mut events,
            )
            .unwrap();

        let target = state.installments.iter().find(|i| i.due_date == date(2024, 1, 31)).unwrap();
        assert_eq!(target.fee_due, Money::from_major(10));

        // past every due date: falls onto the last installment
        processor
            .apply(
                &mut state,
                &txn(
                    TransactionKind::Charge {
                        kind: ChargeKind::Penalty,
                        due_date: date(2024, 6, 1),
                        target: None,
                    },
                    Money::from_major(7),
                    date(2024, 6, 1),
                ),
                &mut events,
            )
            .unwrap();
        assert_eq!(state.installments.last().unwrap().penalty_due, Money::from_major(7));
    }

    #[test]
    fn test_explicit_charge_target_resolves_by_due_date() {
        let terms = terms();
        let processor = TransactionProcessor::new(&terms, &EveryDay);
        let mut state = disbursed_state(&terms);
        let mut events = EventStore::new();

        // nearest-match would pick 01-16; the explicit target overrides it
        processor
            .apply(
                &mut state,
                &txn(
                    TransactionKind::Charge {
                        kind: ChargeKind::Fee,
                        due_date: date(2024, 1, 10),
                        target: Some(date(2024, 1, 31)),
                    },
                    Money::from_major(10),
                    date(2024, 1, 10),
                ),
                &mut events,
            )
            .unwrap();
        let charged = state.installments.iter().find(|i| i.fee_due.is_positive()).unwrap();
        assert_eq!(charged.due_date, date(2024, 1, 31));
    }

    #[test]
    fn test_charge_to_unknown_installment_rejected() {
        let terms = terms();
        let processor = TransactionProcessor::new(&terms, &EveryDay);
        let mut state = disbursed_state(&terms);
        let mut events = EventStore::new();

        let err = processor.apply(
            &mut state,
            &txn(
                TransactionKind::Charge {
                    kind: ChargeKind::Fee,
                    due_date: date(2024, 1, 20),
                    target: Some(date(2024, 7, 4)),
                },
                Money::from_major(10),
                date(2024, 1, 20),
            ),
            &mut events,
        );
        assert!(matches!(err, Err(ScheduleError::UnknownInstallment { .. })));
    }

    #[test]
    fn test_interest_waiver_oldest_first() {
        let mut t = terms();
        t.interest_rate = Rate::from_percentage(12);
        t.down_payment = None;
        let processor = TransactionProcessor::new(&t, &EveryDay);
        let mut state = ScheduleState::new(t.loan_id, t.currency.clone());
        let mut events = EventStore::new();
        processor
            .apply(
                &mut state,
                &txn(TransactionKind::Disbursement, Money::from_major(500), date(2024, 1, 1)),
                &mut events,
            )
            .unwrap();

        let first_interest = state.installments[0].interest_due;
        assert!(first_interest.is_positive());

        let allocation = processor
            .apply(
                &mut state,
                &txn(TransactionKind::InterestWaiver, first_interest, date(2024, 1, 10)),
                &mut events,
            )
            .unwrap();

        assert_eq!(allocation.entries[0].period, state.installments[0].period);
        assert_eq!(state.installments[0].interest_outstanding(), Money::ZERO);
        assert_eq!(allocation.excess, Money::ZERO);
    }

    #[test]
    fn test_write_off_freezes_the_loan() {
        let terms = terms();
        let processor = TransactionProcessor::new(&terms, &EveryDay);
        let mut state = disbursed_state(&terms);
        let mut events = EventStore::new();

        // partial payment first: written-off amount is only the remainder
        processor
            .apply(
                &mut state,
                &txn(TransactionKind::Repayment, Money::from_major(125), date(2024, 1, 2)),
                &mut events,
            )
            .unwrap();
        processor
            .apply(
                &mut state,
                &txn(TransactionKind::WriteOff, Money::ZERO, date(2024, 2, 1)),
                &mut events,
            )
            .unwrap();

        assert_eq!(state.status, LoanStatus::WrittenOff);
        let written_off: Money = state.installments.iter().map(|i| i.principal_written_off).sum();
        assert_eq!(written_off, Money::from_major(375));
        assert!(state.check_conservation().is_ok());
        assert!(state.installments.iter().all(|i| i.completed));

        // further mutation is rejected
        let err = processor.apply(
            &mut state,
            &txn(TransactionKind::Repayment, Money::from_major(10), date(2024, 3, 1)),
            &mut events,
        );
        assert!(matches!(err, Err(ScheduleError::LoanNotMutable { .. })));
    }
}
