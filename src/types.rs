use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// amortization method for the installment split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmortizationType {
    /// total due per period held constant, principal/interest split varies
    EqualInstallments,
    /// principal per period constant, interest declines
    EqualPrincipal,
}

/// how interest is derived per period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterestMethod {
    /// interest on the outstanding balance at each period start
    DecliningBalance,
    /// constant interest on the original principal share
    Flat,
}

/// repayment cadence unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepaymentFrequency {
    Days,
    Weeks,
    Months,
}

/// where the principal of a later disbursement tranche lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranchePlacement {
    /// append a new trailing group of periods
    Horizontal,
    /// merge into the existing future installments
    Vertical,
}

/// charge classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeKind {
    Fee,
    Penalty,
}

/// derived loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// open with outstanding obligations
    Active,
    /// every obligation met, excess payment held
    Overpaid,
    /// every obligation met exactly
    ObligationsMet,
    /// written off as loss; immutable
    WrittenOff,
}

impl LoanStatus {
    /// whether further transactions may be applied
    pub fn is_mutable(self) -> bool {
        matches!(self, LoanStatus::Active)
    }
}
