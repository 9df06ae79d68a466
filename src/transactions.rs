use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::Money;
use crate::errors::{Result, ScheduleError};
use crate::types::ChargeKind;

/// unique identifier for a transaction
pub type TransactionId = Uuid;

/// typed mutation source for the schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Disbursement,
    Repayment,
    Charge {
        kind: ChargeKind,
        due_date: NaiveDate,
        /// explicit target installment, identified by its due date because
        /// period numbers shift when a backdated tranche is inserted;
        /// otherwise the nearest due installment
        target: Option<NaiveDate>,
    },
    /// collapse not-yet-met principal and redistribute it forward
    ReAmortize,
    InterestWaiver,
    WriteOff,
}

/// one entry of the loan's append-only transaction log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub amount: Money,
    pub date: NaiveDate,
    /// insertion order, the tie-break for same-day transactions
    pub sequence: u64,
    pub reversed: bool,
}

/// append-only, reversible transaction log owned by the loan aggregate
///
/// reversal only marks the entry; its effect disappears because replay skips
/// reversed entries, never through inverse arithmetic
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLog {
    entries: Vec<Transaction>,
    next_sequence: u64,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, kind: TransactionKind, amount: Money, date: NaiveDate) -> TransactionId {
        let id = Uuid::new_v4();
        self.entries.push(Transaction {
            id,
            kind,
            amount,
            date,
            sequence: self.next_sequence,
            reversed: false,
        });
        self.next_sequence += 1;
        id
    }

    pub fn get(&self, id: TransactionId) -> Option<&Transaction> {
        self.entries.iter().find(|t| t.id == id)
    }

    /// mark a transaction reversed; the caller must rebuild afterwards
    pub fn reverse(&mut self, id: TransactionId) -> Result<()> {
        match self.entries.iter_mut().find(|t| t.id == id) {
            Some(txn) => {
                txn.reversed = true;
                Ok(())
            }
            None => Err(ScheduleError::MissingTransaction { id }),
        }
    }

    /// non-reversed entries in replay order: (date, insertion sequence)
    pub fn ordered(&self) -> Vec<&Transaction> {
        let mut live: Vec<&Transaction> = self.entries.iter().filter(|t| !t.reversed).collect();
        live.sort_by_key(|t| (t.date, t.sequence));
        live
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.entries.iter()
    }
}

/// how one transaction landed on one installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InstallmentAllocation {
    pub period: u32,
    pub to_penalty: Money,
    pub to_fee: Money,
    pub to_interest: Money,
    pub to_principal: Money,
}

impl InstallmentAllocation {
    pub fn total(&self) -> Money {
        self.to_penalty + self.to_fee + self.to_interest + self.to_principal
    }

    pub fn is_empty(&self) -> bool {
        self.total().is_zero()
    }
}

/// per-transaction allocation breakdown, consumed by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub transaction_id: TransactionId,
    pub entries: Vec<InstallmentAllocation>,
    /// amount not absorbed by any installment
    pub excess: Money,
}

impl Allocation {
    pub fn new(transaction_id: TransactionId) -> Self {
        Self {
            transaction_id,
            entries: Vec::new(),
            excess: Money::ZERO,
        }
    }

    pub fn total_allocated(&self) -> Money {
        self.entries.iter().map(|e| e.total()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_ordered_sorts_by_date_then_sequence() {
        let mut log = TransactionLog::new();
        let a = log.append(TransactionKind::Disbursement, Money::from_major(100), date(2024, 1, 1));
        let late = log.append(TransactionKind::Repayment, Money::from_major(10), date(2024, 3, 1));
        // backdated entry inserted after the later one
        let backdated = log.append(TransactionKind::Repayment, Money::from_major(10), date(2024, 2, 1));

        let ids: Vec<TransactionId> = log.ordered().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a, backdated, late]);
    }

    #[test]
    fn test_same_day_keeps_insertion_order() {
        let mut log = TransactionLog::new();
        let first = log.append(TransactionKind::Disbursement, Money::from_major(100), date(2024, 1, 1));
        let second = log.append(TransactionKind::Repayment, Money::from_major(25), date(2024, 1, 1));

        let ids: Vec<TransactionId> = log.ordered().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn test_reverse_hides_entry_from_replay_order() {
        let mut log = TransactionLog::new();
        let a = log.append(TransactionKind::Disbursement, Money::from_major(100), date(2024, 1, 1));
        let b = log.append(TransactionKind::Repayment, Money::from_major(10), date(2024, 2, 1));

        log.reverse(b).unwrap();
        let ids: Vec<TransactionId> = log.ordered().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a]);
        // the entry itself survives for audit
        assert_eq!(log.len(), 2);
        assert!(log.get(b).unwrap().reversed);
    }

    #[test]
    fn test_reverse_unknown_transaction_fails() {
        let mut log = TransactionLog::new();
        assert!(matches!(
            log.reverse(Uuid::new_v4()),
            Err(ScheduleError::MissingTransaction { .. })
        ));
    }
}
