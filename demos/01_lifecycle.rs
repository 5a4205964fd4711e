/// lifecycle - complete loan lifecycle from request to full repayment
use peer_loan_rs::{
    CollateralTerms, InMemoryLedger, LoanRegistry, Money, ProtocolConfig, Rate, SafeTimeProvider,
    TimeSource, Units,
};
use chrono::{TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== loan lifecycle ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));

    let ether: u64 = 1_000_000_000_000_000_000;
    let borrower = "borrower".to_string();
    let lender = "lender".to_string();

    let mut registry = LoanRegistry::new(ProtocolConfig::standard("platform".to_string()));
    let mut ledger = InMemoryLedger::new();
    ledger.credit_funds(&lender, Money::from_units(12 * ether));
    // the borrower needs their own funds to cover interest on top of principal
    ledger.credit_funds(&borrower, Money::from_units(ether));
    ledger.credit_collateral(&"TTT".to_string(), &borrower, Units::from_count(30_000));

    // 1. collateral policy
    println!("1. collateral policy");
    println!("-------------------");
    registry.register_collateral_asset(
        "TTT".to_string(),
        Money::from_units(1_000_000_000_000_000),
        Rate::from_bps(20_000),
    )?;
    println!("  ✓ TTT approved at 0.001 ether per unit, 200% ratio");

    // 2. loan request
    println!("\n2. loan request");
    println!("--------------");
    let id = registry.create_loan_request(
        &borrower,
        Money::from_units(12 * ether),
        60,
        &[CollateralTerms {
            asset: "TTT".to_string(),
            interest_rate: Rate::from_bps(100),
        }],
        &time,
    )?;
    println!("  loan {} requested: 12 ether over 60s, 1% interest", id);
    println!("  status: {:?}", registry.loan(id).unwrap().state.status);

    // 3. funding
    println!("\n3. funding");
    println!("---------");
    let policy = registry.policy.clone();
    let loan = registry.loan_mut(id).unwrap();
    loan.fund_loan(&lender, Money::from_units(12 * ether), &mut ledger, &time)?;
    println!("  ✓ lender escrowed the principal");
    println!("  status: {:?}", loan.state.status);

    // 4. collateral and activation
    println!("\n4. collateral and activation");
    println!("---------------------------");
    let required = policy.required_collateral(Money::from_units(12 * ether), &"TTT".to_string())?;
    println!("  required collateral: {} units", required.as_decimal());

    loan.transfer_collateral(&borrower, &"TTT".to_string(), required, &policy, &mut ledger, &time)?;
    println!("  ✓ collateral locked, principal released");
    println!("  status: {:?}", loan.state.status);
    println!("  borrower balance: {}", ledger.funds_balance(&borrower));
    println!("  installments: {}", loan.state.schedule.len());

    // 5. repayment
    println!("\n5. repayment");
    println!("-----------");
    for index in 1..=loan.state.installment_count {
        let due = loan.get_repayment_amount(index)?;
        println!(
            "  installment {}: {} due (fee portion {})",
            index, due.amount, due.fee_portion
        );
        loan.repay(&borrower, due.amount, &mut ledger, &time)?;
        println!("    ✓ paid; outstanding {}", loan.state.outstanding_principal);
    }

    // 6. closure
    println!("\n6. closure");
    println!("---------");
    println!("  status: {:?}", loan.state.status);
    println!("  collateral: {:?}", loan.state.collateral_status);
    println!(
        "  borrower collateral back: {} units",
        ledger
            .collateral_balance(&"TTT".to_string(), &borrower)
            .as_decimal()
    );
    println!("  lender balance: {}", ledger.funds_balance(&lender));
    println!("  platform fees: {}", ledger.funds_balance(&"platform".to_string()));

    Ok(())
}
