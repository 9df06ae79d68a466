use crate::builder::rederive_declining_interest;
use crate::config::LoanTerms;
use crate::currency::Money;
use crate::errors::Result;
use crate::schedule::ScheduleState;
use crate::transactions::{Allocation, InstallmentAllocation, Transaction};
use crate::types::InterestMethod;

/// collapse not-yet-met principal and redistribute it across the remaining
/// schedule
///
/// effective at the transaction date D:
/// - every installment due on or before D gives up its unpaid principal
///   remainder; paid principal stays exactly where it was, and attached
///   charges are never zeroed
/// - the removed total lands on the installments due after D (down payments
///   excluded), divided evenly with the rounding residue on the last
/// - if nothing is due after D, the final installment is spared from the
///   collapse and absorbs the whole remainder
///
/// undo is replay without this transaction, never inverse arithmetic
pub fn apply(terms: &LoanTerms, state: &mut ScheduleState, txn: &Transaction) -> Result<Allocation> {
    let effective = txn.date;
    let mut allocation = Allocation::new(txn.id);

    let absorbers: Vec<usize> = state
        .installments
        .iter()
        .enumerate()
        .filter(|(_, inst)| !inst.down_payment && inst.due_date > effective)
        .map(|(idx, _)| idx)
        .collect();

    // with the whole schedule past due, the final installment absorbs instead
    // of collapsing
    let spared = if absorbers.is_empty() {
        state
            .installments
            .iter()
            .rposition(|inst| !inst.down_payment)
    } else {
        None
    };

    let mut collapsed = Money::ZERO;
    for (idx, inst) in state.installments.iter_mut().enumerate() {
        if inst.due_date > effective || Some(idx) == spared {
            continue;
        }
        let unpaid = inst.principal_outstanding();
        if unpaid.is_positive() {
            inst.principal_due -= unpaid;
            collapsed += unpaid;
            allocation.entries.push(InstallmentAllocation {
                period: inst.period,
                to_principal: unpaid,
                ..Default::default()
            });
        }
        // declining-balance interest follows its principal forward and is
        // re-derived below; flat interest is owed regardless of the principal
        // path and stays due on the collapsed installment
        if terms.interest_method == InterestMethod::DecliningBalance {
            let interest_unpaid = inst.interest_outstanding();
            if interest_unpaid.is_positive() {
                inst.interest_due -= interest_unpaid;
            }
        }
    }

    if collapsed.is_positive() {
        match spared {
            Some(idx) => {
                state.installments[idx].principal_due += collapsed;
            }
            None => {
                let shares = terms
                    .currency
                    .split_evenly(collapsed, absorbers.len() as u32);
                for (&idx, share) in absorbers.iter().zip(shares) {
                    state.installments[idx].principal_due += share;
                }
            }
        }
        rederive_declining_interest(terms, state);
    }

    Ok(allocation)
}
