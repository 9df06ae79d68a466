use crate::calendar::HolidayCalendar;
use crate::config::LoanTerms;
use crate::errors::{Result, ScheduleError};
use crate::events::{EventStore, ScheduleEvent};
use crate::processor::TransactionProcessor;
use crate::schedule::ScheduleState;
use crate::transactions::{Allocation, TransactionId, TransactionLog};

/// outcome of folding the full transaction history
#[derive(Debug)]
pub struct ReplayOutcome {
    /// the canonical current schedule
    pub schedule: ScheduleState,
    /// per-transaction allocation breakdowns, in replay order
    pub allocations: Vec<Allocation>,
    /// notifications collected during the fold
    pub events: Vec<ScheduleEvent>,
}

/// deterministic recomputation of the schedule from the transaction log
///
/// the only entry point allowed to produce a "current" schedule: every
/// reversal, undo or backdated insertion goes through a full rebuild, so the
/// schedule is always a pure function of `(terms, log)`. the fold is
/// synchronous and in-memory; the caller serializes per-loan access and
/// commits the outcome atomically or not at all
pub struct ReplayEngine<'a> {
    terms: &'a LoanTerms,
    calendar: &'a dyn HolidayCalendar,
}

impl<'a> ReplayEngine<'a> {
    pub fn new(terms: &'a LoanTerms, calendar: &'a dyn HolidayCalendar) -> Self {
        Self { terms, calendar }
    }

    /// fold the ordered, non-reversed log into the canonical schedule
    pub fn rebuild(&self, log: &TransactionLog) -> Result<ReplayOutcome> {
        self.terms.validate()?;

        let processor = TransactionProcessor::new(self.terms, self.calendar);
        let mut state = ScheduleState::new(self.terms.loan_id, self.terms.currency.clone());
        let mut events = EventStore::new();
        let mut allocations = Vec::new();

        let ordered = log.ordered();
        for txn in ordered.iter().copied() {
            allocations.push(processor.apply(&mut state, txn, &mut events)?);
        }
        state.check_conservation()?;

        events.emit(ScheduleEvent::ScheduleRebuilt {
            loan_id: state.loan_id,
            transactions_replayed: ordered.len(),
        });
        Ok(ReplayOutcome {
            schedule: state,
            allocations,
            events: events.take_events(),
        })
    }

    /// rebuild with one transaction excluded: the implementation of every
    /// undo, including `UndoReAmortize`
    pub fn rebuild_without(&self, log: &TransactionLog, excluded: TransactionId) -> Result<ReplayOutcome> {
        if log.get(excluded).is_none() {
            return Err(ScheduleError::MissingTransaction { id: excluded });
        }
        let mut reduced = log.clone();
        reduced.reverse(excluded)?;
        self.rebuild(&reduced)
    }
}
