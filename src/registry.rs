//! The loan book: owns the protocol configuration, the collateral
//! policy, and every loan ever created. Creation validates everything
//! before allocating an identifier, so a failed request leaves no trace.

use std::collections::HashMap;

use hourglass_rs::SafeTimeProvider;

use crate::config::ProtocolConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::events::{Event, EventStore};
use crate::loan::LoanContract;
use crate::policy::CollateralPolicy;
use crate::state::LoanState;
use crate::types::{AssetId, CollateralTerms, LoanId, PartyId};

pub struct LoanRegistry {
    pub config: ProtocolConfig,
    pub policy: CollateralPolicy,
    loans: Vec<LoanContract>,
    index: HashMap<LoanId, usize>,
    next_id: LoanId,
    events: EventStore,
}

impl LoanRegistry {
    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            config,
            policy: CollateralPolicy::new(),
            loans: Vec::new(),
            index: HashMap::new(),
            next_id: 1,
            events: EventStore::new(),
        }
    }

    /// approve a collateral asset for use by new loans
    pub fn register_collateral_asset(
        &mut self,
        asset: AssetId,
        unit_price: Money,
        required_ratio: Rate,
    ) -> Result<()> {
        self.policy.register(asset.clone(), unit_price, required_ratio)?;
        self.events.emit(Event::CollateralAssetRegistered {
            asset,
            unit_price,
            required_ratio,
        });
        Ok(())
    }

    /// reprice an approved asset; affects only loans not yet activated
    pub fn update_collateral_price(&mut self, asset: &AssetId, unit_price: Money) -> Result<()> {
        let old_price = self.policy.update_price(asset, unit_price)?;
        self.events.emit(Event::CollateralPriceUpdated {
            asset: asset.clone(),
            old_price,
            new_price: unit_price,
        });
        Ok(())
    }

    /// borrower opens a loan request. The first collateral term supplies
    /// the asset and interest rate the loan is bound to.
    pub fn create_loan_request(
        &mut self,
        borrower: &PartyId,
        principal: Money,
        duration_secs: u64,
        terms: &[CollateralTerms],
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanId> {
        let term = self.validate_terms(principal, duration_secs, terms)?;
        let id = self.allocate_id();

        let state = LoanState::new_request(
            id,
            borrower.clone(),
            principal,
            duration_secs,
            self.config.installment_count(duration_secs),
            term.interest_rate,
            term.asset.clone(),
            time_provider.now(),
        );

        self.events.emit(Event::LoanRequested {
            loan_id: id,
            borrower: borrower.clone(),
            principal,
            timestamp: state.created_at,
        });

        self.insert(LoanContract::new(self.config.clone(), state));
        Ok(id)
    }

    /// lender opens a loan offer awaiting a borrower
    pub fn create_loan_offer(
        &mut self,
        lender: &PartyId,
        principal: Money,
        duration_secs: u64,
        terms: &[CollateralTerms],
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanId> {
        let term = self.validate_terms(principal, duration_secs, terms)?;
        let id = self.allocate_id();

        let state = LoanState::new_offer(
            id,
            lender.clone(),
            principal,
            duration_secs,
            self.config.installment_count(duration_secs),
            term.interest_rate,
            term.asset.clone(),
            time_provider.now(),
        );

        self.events.emit(Event::LoanOffered {
            loan_id: id,
            lender: lender.clone(),
            principal,
            timestamp: state.created_at,
        });

        self.insert(LoanContract::new(self.config.clone(), state));
        Ok(id)
    }

    pub fn loan(&self, id: LoanId) -> Option<&LoanContract> {
        self.index.get(&id).map(|&i| &self.loans[i])
    }

    pub fn loan_mut(&mut self, id: LoanId) -> Option<&mut LoanContract> {
        self.index.get(&id).copied().map(move |i| &mut self.loans[i])
    }

    /// owned snapshots of every loan record, in creation order
    pub fn get_all_loans(&self) -> Vec<LoanState> {
        self.loans.iter().map(|l| l.loan_data()).collect()
    }

    pub fn loan_count(&self) -> usize {
        self.loans.len()
    }

    /// get pending registry-level events
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    fn validate_terms<'a>(
        &self,
        principal: Money,
        duration_secs: u64,
        terms: &'a [CollateralTerms],
    ) -> Result<&'a CollateralTerms> {
        if principal.is_zero() {
            return Err(LoanError::InvalidScheduleParameters {
                message: "principal must be positive".to_string(),
            });
        }

        if duration_secs == 0 {
            return Err(LoanError::InvalidScheduleParameters {
                message: "duration must be positive".to_string(),
            });
        }

        let term = terms
            .first()
            .ok_or_else(|| LoanError::InvalidScheduleParameters {
                message: "at least one collateral term is required".to_string(),
            })?;

        if !self.policy.is_registered(&term.asset) {
            return Err(LoanError::UnapprovedCollateral {
                asset: term.asset.clone(),
            });
        }

        Ok(term)
    }

    fn allocate_id(&mut self) -> LoanId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert(&mut self, loan: LoanContract) {
        self.index.insert(loan.id, self.loans.len());
        self.loans.push(loan);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Rate, Units};
    use crate::ledger::InMemoryLedger;
    use crate::types::{CollateralStatus, LoanStatus};
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;

    const ETHER: u64 = 1_000_000_000_000_000_000;

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn test_registry() -> LoanRegistry {
        let mut registry = LoanRegistry::new(ProtocolConfig::standard("platform".to_string()));
        registry
            .register_collateral_asset(
                "TTT".to_string(),
                Money::from_units(1_000_000_000_000_000),
                Rate::from_bps(20_000),
            )
            .unwrap();
        registry
    }

    fn terms() -> Vec<CollateralTerms> {
        vec![CollateralTerms {
            asset: "TTT".to_string(),
            interest_rate: Rate::from_bps(100),
        }]
    }

    #[test]
    fn test_loan_ids_monotonic() {
        let time = test_time();
        let mut registry = test_registry();

        let first = registry
            .create_loan_request(&"alice".to_string(), Money::from_units(ETHER), 60, &terms(), &time)
            .unwrap();
        let second = registry
            .create_loan_offer(&"bob".to_string(), Money::from_units(ETHER), 60, &terms(), &time)
            .unwrap();

        assert!(second > first);
        assert_eq!(registry.loan_count(), 2);
    }

    #[test]
    fn test_creation_rejects_bad_parameters_atomically() {
        let time = test_time();
        let mut registry = test_registry();

        let zero_principal = registry.create_loan_request(
            &"alice".to_string(),
            Money::ZERO,
            60,
            &terms(),
            &time,
        );
        assert!(matches!(
            zero_principal,
            Err(LoanError::InvalidScheduleParameters { .. })
        ));

        let zero_duration = registry.create_loan_request(
            &"alice".to_string(),
            Money::from_units(ETHER),
            0,
            &terms(),
            &time,
        );
        assert!(matches!(
            zero_duration,
            Err(LoanError::InvalidScheduleParameters { .. })
        ));

        let no_terms = registry.create_loan_request(
            &"alice".to_string(),
            Money::from_units(ETHER),
            60,
            &[],
            &time,
        );
        assert!(matches!(
            no_terms,
            Err(LoanError::InvalidScheduleParameters { .. })
        ));

        let bad_asset = registry.create_loan_request(
            &"alice".to_string(),
            Money::from_units(ETHER),
            60,
            &[CollateralTerms {
                asset: "NOPE".to_string(),
                interest_rate: Rate::from_bps(100),
            }],
            &time,
        );
        assert!(matches!(bad_asset, Err(LoanError::UnapprovedCollateral { .. })));

        // nothing was created and no identifier was consumed
        assert_eq!(registry.loan_count(), 0);
        let next = registry
            .create_loan_request(&"alice".to_string(), Money::from_units(ETHER), 60, &terms(), &time)
            .unwrap();
        assert_eq!(next, 1);
    }

    #[test]
    fn test_installment_count_comes_from_config() {
        let time = test_time();
        let mut registry = test_registry();

        let id = registry
            .create_loan_request(&"alice".to_string(), Money::from_units(ETHER), 90, &terms(), &time)
            .unwrap();

        let loan = registry.loan(id).unwrap();
        assert_eq!(loan.state.installment_count, 3);
    }

    #[test]
    fn test_full_lifecycle_through_registry() {
        let time = test_time();
        let mut registry = test_registry();
        let mut ledger = InMemoryLedger::new();

        ledger.credit_funds(&"lender".to_string(), Money::from_units(12 * ETHER));
        // interest on top of principal comes out of the borrower's own funds
        ledger.credit_funds(&"borrower".to_string(), Money::from_units(ETHER));
        ledger.credit_collateral(
            &"TTT".to_string(),
            &"borrower".to_string(),
            Units::from_count(24_000),
        );

        let id = registry
            .create_loan_request(
                &"borrower".to_string(),
                Money::from_units(12 * ETHER),
                60,
                &terms(),
                &time,
            )
            .unwrap();

        let required = registry
            .policy
            .required_collateral(Money::from_units(12 * ETHER), &"TTT".to_string())
            .unwrap();
        assert_eq!(required, Units::from_count(24_000));

        // fund, post collateral, observe activation and principal release
        let policy = registry.policy.clone();
        let loan = registry.loan_mut(id).unwrap();
        loan.fund_loan(&"lender".to_string(), Money::from_units(12 * ETHER), &mut ledger, &time)
            .unwrap();
        loan.transfer_collateral(
            &"borrower".to_string(),
            &"TTT".to_string(),
            required,
            &policy,
            &mut ledger,
            &time,
        )
        .unwrap();

        assert_eq!(loan.state.status, LoanStatus::Active);
        assert_eq!(loan.state.collateral_status, CollateralStatus::Arrived);
        assert_eq!(
            ledger.funds_balance(&"borrower".to_string()),
            Money::from_units(13 * ETHER)
        );

        // repay both installments to close
        for index in 1..=2 {
            let due = loan.get_repayment_amount(index).unwrap();
            loan.repay(&"borrower".to_string(), due.amount, &mut ledger, &time)
                .unwrap();
        }
        assert_eq!(loan.state.status, LoanStatus::Closed);
    }

    #[test]
    fn test_get_all_loans_returns_owned_snapshots() {
        let time = test_time();
        let mut registry = test_registry();

        for party in ["alice", "bob", "carol"] {
            registry
                .create_loan_request(
                    &party.to_string(),
                    Money::from_units(ETHER),
                    60,
                    &terms(),
                    &time,
                )
                .unwrap();
        }

        let all = registry.get_all_loans();
        assert_eq!(all.len(), 3);
        assert_eq!(
            all.iter().map(|l| l.loan_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(all[1].borrower.as_deref(), Some("bob"));
    }

    #[test]
    fn test_price_update_affects_only_future_activations() {
        let time = test_time();
        let mut registry = test_registry();
        let mut ledger = InMemoryLedger::new();

        ledger.credit_funds(&"lender".to_string(), Money::from_units(12 * ETHER));
        ledger.credit_collateral(
            &"TTT".to_string(),
            &"borrower".to_string(),
            Units::from_count(100_000),
        );

        let id = registry
            .create_loan_request(
                &"borrower".to_string(),
                Money::from_units(12 * ETHER),
                60,
                &terms(),
                &time,
            )
            .unwrap();

        let policy = registry.policy.clone();
        let loan = registry.loan_mut(id).unwrap();
        loan.fund_loan(&"lender".to_string(), Money::from_units(12 * ETHER), &mut ledger, &time)
            .unwrap();
        loan.transfer_collateral(
            &"borrower".to_string(),
            &"TTT".to_string(),
            Units::from_count(24_000),
            &policy,
            &mut ledger,
            &time,
        )
        .unwrap();

        // repricing after activation leaves the locked valuation alone
        registry
            .update_collateral_price(&"TTT".to_string(), Money::from_units(2_000_000_000_000_000))
            .unwrap();
        assert_eq!(
            registry.loan(id).unwrap().state.collateral_valuation_at_lock,
            Some(Money::from_units(1_000_000_000_000_000))
        );

        // a new loan of the same size now needs half the units
        let required = registry
            .policy
            .required_collateral(Money::from_units(12 * ETHER), &"TTT".to_string())
            .unwrap();
        assert_eq!(required, Units::from_count(12_000));
    }

    #[test]
    fn test_registry_emits_origination_events() {
        let time = test_time();
        let mut registry = test_registry();
        registry.take_events();

        registry
            .create_loan_request(&"alice".to_string(), Money::from_units(ETHER), 60, &terms(), &time)
            .unwrap();
        registry
            .create_loan_offer(&"bob".to_string(), Money::from_units(ETHER), 60, &terms(), &time)
            .unwrap();

        let events = registry.take_events();
        assert!(matches!(events[0], Event::LoanRequested { loan_id: 1, .. }));
        assert!(matches!(events[1], Event::LoanOffered { loan_id: 2, .. }));
    }
}
