use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::currency::{Currency, Money, Rate};
use crate::errors::{Result, ScheduleError};
use crate::types::{AmortizationType, InterestMethod, LoanId, RepaymentFrequency, TranchePlacement};

/// loan terms: everything the engine needs to derive a schedule
///
/// the schedule itself is a pure function of these terms plus the ordered
/// transaction log; the terms never change after approval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerms {
    pub loan_id: LoanId,
    pub currency: Currency,
    pub approved_principal: Money,
    pub number_of_installments: u32,
    pub repayment_every: u32,
    pub repayment_frequency: RepaymentFrequency,
    /// nominal annual rate
    pub interest_rate: Rate,
    pub amortization: AmortizationType,
    pub interest_method: InterestMethod,
    /// percentage of each disbursement due as a same-day down payment
    pub down_payment: Option<Rate>,
    pub multi_disbursement: bool,
    pub placement: TranchePlacement,
}

impl LoanTerms {
    pub fn validate(&self) -> Result<()> {
        if !self.approved_principal.is_positive() {
            return Err(ScheduleError::InvalidConfiguration {
                message: format!("approved principal must be positive, got {}", self.approved_principal),
            });
        }
        if self.number_of_installments == 0 {
            return Err(ScheduleError::InvalidConfiguration {
                message: "number of installments must be at least 1".to_string(),
            });
        }
        if self.repayment_every == 0 {
            return Err(ScheduleError::InvalidConfiguration {
                message: "repayment cadence must be at least 1".to_string(),
            });
        }
        if self.interest_rate.as_decimal().is_sign_negative() {
            return Err(ScheduleError::InvalidConfiguration {
                message: format!("interest rate must not be negative, got {}", self.interest_rate),
            });
        }
        if let Some(pct) = self.down_payment {
            let p = pct.as_percentage();
            if p <= Decimal::ZERO || p >= dec!(100) {
                return Err(ScheduleError::InvalidConfiguration {
                    message: format!("down payment percentage must be within (0, 100), got {}", p),
                });
            }
        }
        Ok(())
    }

    /// annual rate scaled to one repayment period
    pub fn period_rate(&self) -> Rate {
        let annual = self.interest_rate.as_decimal();
        let every = Decimal::from(self.repayment_every);
        let per = match self.repayment_frequency {
            RepaymentFrequency::Months => annual / dec!(12) * every,
            RepaymentFrequency::Weeks => annual * dec!(7) / dec!(365) * every,
            RepaymentFrequency::Days => annual / dec!(365) * every,
        };
        Rate::from_decimal(per)
    }

    /// advance a date by one repayment period
    pub fn step(&self, date: NaiveDate) -> NaiveDate {
        match self.repayment_frequency {
            RepaymentFrequency::Months => date + Months::new(self.repayment_every),
            RepaymentFrequency::Weeks => date + Days::new(7 * self.repayment_every as u64),
            RepaymentFrequency::Days => date + Days::new(self.repayment_every as u64),
        }
    }

    /// due date of the k-th period (1-based) anchored at a disbursement date
    pub fn due_date_of(&self, anchor: NaiveDate, k: u32) -> NaiveDate {
        let mut date = anchor;
        for _ in 0..k {
            date = self.step(date);
        }
        date
    }

    /// down payment owed for a disbursed tranche, rounded to currency scale
    pub fn down_payment_amount(&self, disbursed: Money) -> Money {
        match self.down_payment {
            Some(pct) => self.currency.percent_of(disbursed, pct),
            None => Money::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn base_terms() -> LoanTerms {
        LoanTerms {
            loan_id: Uuid::new_v4(),
            currency: Currency::usd(),
            approved_principal: Money::from_major(1_000),
            number_of_installments: 4,
            repayment_every: 1,
            repayment_frequency: RepaymentFrequency::Months,
            interest_rate: Rate::ZERO,
            amortization: AmortizationType::EqualPrincipal,
            interest_method: InterestMethod::DecliningBalance,
            down_payment: None,
            multi_disbursement: false,
            placement: TranchePlacement::Horizontal,
        }
    }

    #[test]
    fn test_validate_rejects_bad_terms() {
        let mut terms = base_terms();
        terms.approved_principal = Money::ZERO;
        assert!(terms.validate().is_err());

        let mut terms = base_terms();
        terms.number_of_installments = 0;
        assert!(terms.validate().is_err());

        let mut terms = base_terms();
        terms.down_payment = Some(Rate::from_percentage(100));
        assert!(terms.validate().is_err());

        assert!(base_terms().validate().is_ok());
    }

    #[test]
    fn test_period_rate() {
        let mut terms = base_terms();
        terms.interest_rate = Rate::from_percentage(12);
        assert_eq!(terms.period_rate().as_decimal(), dec!(0.01));

        terms.repayment_every = 3;
        assert_eq!(terms.period_rate().as_decimal(), dec!(0.03));

        terms.repayment_every = 15;
        terms.repayment_frequency = RepaymentFrequency::Days;
        assert_eq!(
            terms.period_rate().as_decimal(),
            dec!(0.12) / dec!(365) * dec!(15)
        );
    }

    #[test]
    fn test_cadence_stepping() {
        let terms = base_terms();
        let jan31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        // month stepping clamps to the end of shorter months
        assert_eq!(terms.step(jan31), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let mut days = base_terms();
        days.repayment_every = 15;
        days.repayment_frequency = RepaymentFrequency::Days;
        let jan1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(days.due_date_of(jan1, 2), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }

    #[test]
    fn test_down_payment_amount_rounds() {
        let mut terms = base_terms();
        terms.down_payment = Some(Rate::from_percentage(25));
        assert_eq!(terms.down_payment_amount(Money::from_major(500)), Money::from_major(125));

        let dp = terms.down_payment_amount(Money::from_decimal(dec!(0.01)));
        assert_eq!(dp, Money::ZERO); // 0.0025 rounds below the minor unit

        terms.down_payment = None;
        assert_eq!(terms.down_payment_amount(Money::from_major(500)), Money::ZERO);
    }
}
