/// default settlement - missed deadline, default claim, and collateral split
use peer_loan_rs::{
    CollateralTerms, InMemoryLedger, LoanRegistry, Money, ProtocolConfig, Rate, SafeTimeProvider,
    TimeSource, Units,
};
use chrono::{Duration, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== default and settlement ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let ether: u64 = 1_000_000_000_000_000_000;
    let borrower = "borrower".to_string();
    let lender = "lender".to_string();

    let mut registry = LoanRegistry::new(ProtocolConfig::standard("platform".to_string()));
    let mut ledger = InMemoryLedger::new();
    ledger.credit_funds(&lender, Money::from_units(12 * ether));
    ledger.credit_collateral(&"TTT".to_string(), &borrower, Units::from_count(24_000));

    registry.register_collateral_asset(
        "TTT".to_string(),
        Money::from_units(1_000_000_000_000_000),
        Rate::from_bps(20_000),
    )?;

    // 1. set up an active loan
    println!("1. activation");
    println!("------------");
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

    let policy = registry.policy.clone();
    let loan = registry.loan_mut(id).unwrap();
    loan.fund_loan(&lender, Money::from_units(12 * ether), &mut ledger, &time)?;
    loan.transfer_collateral(
        &borrower,
        &"TTT".to_string(),
        Units::from_count(24_000),
        &policy,
        &mut ledger,
        &time,
    )?;
    println!("  status: {:?}", loan.state.status);
    println!("  24000 units locked at 0.001 ether each");

    // 2. miss every installment
    println!("\n2. missed deadlines");
    println!("------------------");
    controller.advance(Duration::seconds(120));
    println!("  advanced past the full term without a single payment");

    match loan.repay(&borrower, loan.get_repayment_amount(1)?.amount, &mut ledger, &time) {
        Ok(_) => println!("  error: late payment should be refused!"),
        Err(e) => println!("  ✓ late repayment refused: {}", e),
    }

    // 3. default claim
    println!("\n3. default claim");
    println!("---------------");
    loan.claim_default(&lender, &time)?;
    println!("  status: {:?}", loan.state.status);
    println!(
        "  outstanding debt (principal + unpaid interest): {}",
        loan.state.outstanding_debt()
    );

    // 4. settlement
    println!("\n4. settlement");
    println!("------------");
    let settlement = loan.settle_collateral(&lender, &mut ledger, &time)?;
    println!(
        "  debt {} at lock price {} per unit",
        settlement.outstanding_debt, settlement.valuation_at_lock
    );
    println!("  seized by lender:     {} units", settlement.seized.as_decimal());
    println!("  returned to borrower: {} units", settlement.returned.as_decimal());
    println!("  final status: {:?}", loan.state.status);
    println!("  collateral: {:?}", loan.state.collateral_status);

    println!(
        "\n  lender collateral balance:   {}",
        ledger
            .collateral_balance(&"TTT".to_string(), &lender)
            .as_decimal()
    );
    println!(
        "  borrower collateral balance: {}",
        ledger
            .collateral_balance(&"TTT".to_string(), &borrower)
            .as_decimal()
    );

    Ok(())
}
