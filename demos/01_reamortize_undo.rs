/// re-amortization and its undo via replay
use loan_schedule_rs::{
    AmortizationType, Currency, EveryDay, InterestMethod, LoanTerms, Money, Rate, RepaymentFrequency,
    ReplayEngine, TranchePlacement, TransactionKind, TransactionLog, Uuid,
};
use loan_schedule_rs::chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // $1,250 with a 50% same-day down payment, two monthly installments
    let terms = LoanTerms {
        loan_id: Uuid::new_v4(),
        currency: Currency::usd(),
        approved_principal: Money::from_major(1_250),
        number_of_installments: 2,
        repayment_every: 1,
        repayment_frequency: RepaymentFrequency::Months,
        interest_rate: Rate::ZERO,
        amortization: AmortizationType::EqualPrincipal,
        interest_method: InterestMethod::DecliningBalance,
        down_payment: Some(Rate::from_percentage(50)),
        multi_disbursement: false,
        placement: TranchePlacement::Horizontal,
    };
    let engine = ReplayEngine::new(&terms, &EveryDay);

    let mut log = TransactionLog::new();
    log.append(TransactionKind::Disbursement, Money::from_major(1_250), date(2024, 1, 1));
    log.append(TransactionKind::Repayment, Money::from_major(625), date(2024, 1, 1));

    // the february installment was missed; roll its principal forward
    let reamortize = log.append(TransactionKind::ReAmortize, Money::ZERO, date(2024, 2, 2));

    let collapsed = engine.rebuild(&log)?;
    println!("after re-amortization:");
    for inst in &collapsed.schedule.installments {
        println!("  #{} due {}  principal {}", inst.period, inst.due_date, inst.principal_due);
    }

    // undo is a rebuild without the transaction, not inverse arithmetic
    let undone = engine.rebuild_without(&log, reamortize)?;
    println!("after undo:");
    for inst in &undone.schedule.installments {
        println!("  #{} due {}  principal {}", inst.period, inst.due_date, inst.principal_due);
    }

    Ok(())
}
