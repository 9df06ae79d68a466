use rust_decimal::Decimal;

use crate::config::LoanTerms;
use crate::currency::Money;
use crate::errors::{Result, ScheduleError};
use crate::types::{AmortizationType, InterestMethod};

/// per-period principal/interest due produced by the allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodAmounts {
    pub principal: Money,
    pub interest: Money,
}

/// compute the principal/interest split for a group of `periods` installments
/// repaying `principal`
///
/// zero-interest products split the principal evenly with the rounding
/// residue on the last period of the group; interest-bearing products follow
/// the configured amortization and interest method, with every per-period
/// figure rounded at the currency boundary
pub fn allocate_group(terms: &LoanTerms, principal: Money, periods: u32) -> Result<Vec<PeriodAmounts>> {
    if periods == 0 {
        return Err(ScheduleError::InvalidConfiguration {
            message: "cannot allocate across zero periods".to_string(),
        });
    }
    let rate = terms.period_rate();
    if rate.is_zero() {
        let shares = terms.currency.split_evenly(principal, periods);
        return Ok(shares
            .into_iter()
            .map(|principal| PeriodAmounts {
                principal,
                interest: Money::ZERO,
            })
            .collect());
    }

    match terms.interest_method {
        InterestMethod::Flat => allocate_flat(terms, principal, periods),
        InterestMethod::DecliningBalance => match terms.amortization {
            AmortizationType::EqualPrincipal => allocate_equal_principal(terms, principal, periods),
            AmortizationType::EqualInstallments => allocate_equal_installments(terms, principal, periods),
        },
    }
}

/// constant interest on the original principal share, principal split evenly
fn allocate_flat(terms: &LoanTerms, principal: Money, periods: u32) -> Result<Vec<PeriodAmounts>> {
    let rate = terms.period_rate();
    let share = principal / Decimal::from(periods);
    let interest = terms.currency.round(share * rate.as_decimal());
    let shares = terms.currency.split_evenly(principal, periods);
    Ok(shares
        .into_iter()
        .map(|principal| PeriodAmounts { principal, interest })
        .collect())
}

/// constant principal per period, interest on the declining balance
fn allocate_equal_principal(terms: &LoanTerms, principal: Money, periods: u32) -> Result<Vec<PeriodAmounts>> {
    let rate = terms.period_rate().as_decimal();
    let shares = terms.currency.split_evenly(principal, periods);
    let mut balance = principal;
    let mut out = Vec::with_capacity(periods as usize);
    for share in shares {
        let interest = terms.currency.round(balance * rate);
        out.push(PeriodAmounts {
            principal: share,
            interest,
        });
        balance -= share;
    }
    Ok(out)
}

/// constant total per period (annuity), split varies; the final period clears
/// whatever principal remains so the group conserves exactly
fn allocate_equal_installments(terms: &LoanTerms, principal: Money, periods: u32) -> Result<Vec<PeriodAmounts>> {
    let rate = terms.period_rate().as_decimal();
    let installment = annuity_installment(terms, principal, periods);

    let mut balance = principal;
    let mut out = Vec::with_capacity(periods as usize);
    for k in 1..=periods {
        let interest = terms.currency.round(balance * rate);
        let principal_part = if k == periods {
            balance
        } else {
            (installment - interest).min(balance)
        };
        if principal_part.is_negative() {
            return Err(ScheduleError::InvalidConfiguration {
                message: format!(
                    "annuity installment {} cannot cover period interest {}",
                    installment, interest
                ),
            });
        }
        out.push(PeriodAmounts {
            principal: principal_part,
            interest,
        });
        balance -= principal_part;
    }
    Ok(out)
}

/// EMI = P * r * (1 + r)^n / ((1 + r)^n - 1), rounded to currency scale
fn annuity_installment(terms: &LoanTerms, principal: Money, periods: u32) -> Money {
    let r = terms.period_rate().as_decimal();
    let mut compound = Decimal::ONE;
    let base = Decimal::ONE + r;
    for _ in 0..periods {
        compound *= base;
    }
    let raw = principal.as_decimal() * r * compound / (compound - Decimal::ONE);
    terms.currency.round(Money::from_decimal(raw))
}
