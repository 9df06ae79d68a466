/// quick start - minimal example to get started
use loan_schedule_rs::{
    AmortizationType, Currency, EveryDay, InterestMethod, LoanTerms, Money, Rate, RepaymentFrequency,
    ReplayEngine, TranchePlacement, TransactionKind, TransactionLog, Uuid,
};
use loan_schedule_rs::chrono::NaiveDate;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // a $1,000 loan repaid in 4 monthly installments at 12% nominal
    let terms = LoanTerms {
        loan_id: Uuid::new_v4(),
        currency: Currency::usd(),
        approved_principal: Money::from_major(1_000),
        number_of_installments: 4,
        repayment_every: 1,
        repayment_frequency: RepaymentFrequency::Months,
        interest_rate: Rate::from_percentage(12),
        amortization: AmortizationType::EqualInstallments,
        interest_method: InterestMethod::DecliningBalance,
        down_payment: None,
        multi_disbursement: false,
        placement: TranchePlacement::Horizontal,
    };

    // disburse, then pay the first installment
    let mut log = TransactionLog::new();
    log.append(
        TransactionKind::Disbursement,
        Money::from_major(1_000),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    );
    log.append(
        TransactionKind::Repayment,
        Money::from_major(260),
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
    );

    // the current schedule is always rebuilt from the log
    let outcome = ReplayEngine::new(&terms, &EveryDay).rebuild(&log)?;
    for inst in &outcome.schedule.installments {
        println!(
            "#{} due {}  principal {}  interest {}  outstanding {}",
            inst.period,
            inst.due_date,
            inst.principal_due,
            inst.interest_due,
            inst.total_outstanding()
        );
    }

    Ok(())
}
