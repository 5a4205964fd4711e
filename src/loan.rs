//! The loan lifecycle state machine. Every operation follows the same
//! shape: validate guards against current state, run the substrate
//! transfers, and only then mutate state, emit events, and snapshot.
//! A failed transfer therefore leaves the loan record untouched.

use hourglass_rs::SafeTimeProvider;

use crate::config::ProtocolConfig;
use crate::decimal::{Money, Units};
use crate::errors::{LoanError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::{CollateralLedger, FundsLedger};
use crate::policy::CollateralPolicy;
use crate::schedule::{amount_due, build_schedule};
use crate::state::{LoanState, StateSnapshot};
use crate::types::{
    AmountDue, AssetId, CollateralSettlement, CollateralStatus, InstallmentStatus, LoanId,
    LoanStatus, PartyId, SeizureRounding,
};

/// one loan: its record, pending events, and audit trail
pub struct LoanContract {
    pub id: LoanId,
    pub config: ProtocolConfig,
    pub state: LoanState,
    pub events: EventStore,
    pub snapshots: Vec<StateSnapshot>,
}

impl LoanContract {
    pub fn new(config: ProtocolConfig, state: LoanState) -> Self {
        Self {
            id: state.loan_id,
            config,
            state,
            events: EventStore::new(),
            snapshots: Vec::new(),
        }
    }

    /// snapshot of the full loan record
    pub fn loan_data(&self) -> LoanState {
        self.state.clone()
    }

    /// repayment quote for a 1-based installment index
    pub fn get_repayment_amount(&self, index: u32) -> Result<AmountDue> {
        if self.state.schedule.is_empty() {
            return Err(LoanError::StateTransitionNotAllowed {
                status: self.state.status,
                operation: "get_repayment_amount",
            });
        }
        amount_due(&self.state.schedule, index)
    }

    /// 1-based index of the installment due next
    pub fn get_current_repayment_number(&self) -> Result<u32> {
        self.state
            .next_unpaid_index()
            .ok_or(LoanError::StateTransitionNotAllowed {
                status: self.state.status,
                operation: "get_current_repayment_number",
            })
    }

    /// identity of the party that paid an installment, if it was paid
    pub fn check_repayment_status(&self, index: u32) -> Result<Option<PartyId>> {
        let installment = self
            .state
            .schedule
            .get(index.checked_sub(1).map(|i| i as usize).unwrap_or(usize::MAX))
            .ok_or_else(|| LoanError::InvalidScheduleParameters {
                message: format!(
                    "installment {} not in schedule of {}",
                    index,
                    self.state.schedule.len()
                ),
            })?;
        Ok(installment.paid_by.clone())
    }

    /// lender escrows the exact principal. From Requested this binds the
    /// lender and moves straight to CollateralPending; from Offered the
    /// loan waits in FundsPending for a borrower.
    pub fn fund_loan<L: FundsLedger>(
        &mut self,
        lender: &PartyId,
        amount: Money,
        ledger: &mut L,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        self.require_status(&[LoanStatus::Requested, LoanStatus::Offered], "fund_loan")?;

        if let Some(bound) = &self.state.lender {
            if bound != lender {
                return Err(LoanError::StateTransitionNotAllowed {
                    status: self.state.status,
                    operation: "fund_loan",
                });
            }
        }

        if amount != self.state.principal_amount {
            return Err(LoanError::AmountMismatch {
                expected: self.state.principal_amount.as_decimal(),
                provided: amount.as_decimal(),
            });
        }

        ledger.pull_funds(lender, amount)?;

        let now = time_provider.now();
        self.state.lender = Some(lender.clone());

        self.events.emit(Event::FundsEscrowed {
            loan_id: self.id,
            lender: lender.clone(),
            amount,
            timestamp: now,
        });

        let next = match self.state.status {
            LoanStatus::Requested => LoanStatus::CollateralPending,
            _ => LoanStatus::FundsPending,
        };
        self.transition(next, lender, now);
        self.snapshot(format!("funded: {}", amount), now);

        Ok(())
    }

    /// borrower accepts a funded offer, binding themselves to the loan
    pub fn accept_offer(&mut self, borrower: &PartyId, time_provider: &SafeTimeProvider) -> Result<()> {
        self.require_status(&[LoanStatus::FundsPending], "accept_offer")?;

        if let Some(bound) = &self.state.borrower {
            if bound != borrower {
                return Err(LoanError::StateTransitionNotAllowed {
                    status: self.state.status,
                    operation: "accept_offer",
                });
            }
        }

        let now = time_provider.now();
        self.state.borrower = Some(borrower.clone());

        self.events.emit(Event::OfferAccepted {
            loan_id: self.id,
            borrower: borrower.clone(),
            timestamp: now,
        });

        self.transition(LoanStatus::CollateralPending, borrower, now);
        self.snapshot("offer accepted".to_string(), now);

        Ok(())
    }

    /// borrower posts the exact policy-computed collateral. Activates the
    /// loan: valuation snapshot, schedule generation, and principal
    /// release all happen in this one transition.
    pub fn transfer_collateral<L: FundsLedger + CollateralLedger>(
        &mut self,
        borrower: &PartyId,
        asset: &AssetId,
        amount: Units,
        policy: &CollateralPolicy,
        ledger: &mut L,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        self.require_status(&[LoanStatus::CollateralPending], "transfer_collateral")?;
        self.require_party(self.state.borrower.clone(), borrower, "transfer_collateral")?;

        if *asset != self.state.collateral_asset {
            return Err(LoanError::UnapprovedCollateral { asset: asset.clone() });
        }

        let entry = policy.entry(asset)?;
        let required = policy.required_collateral(self.state.principal_amount, asset)?;

        if amount != required {
            return Err(LoanError::AmountMismatch {
                expected: required.as_decimal(),
                provided: amount.as_decimal(),
            });
        }

        let now = time_provider.now();

        // schedule construction is fallible; run it before any transfer
        let schedule = build_schedule(
            self.state.principal_amount,
            self.state.duration_secs,
            self.state.installment_count,
            self.state.interest_rate,
            self.config.platform_fee_rate,
            now,
        )?;

        // collateral in, then principal out to the borrower
        ledger.pull_collateral(asset, borrower, amount)?;
        ledger.push_funds(borrower, self.state.principal_amount)?;

        self.state.collateral_amount = amount;
        self.state.collateral_valuation_at_lock = Some(entry.unit_price);
        self.state.collateral_status = CollateralStatus::Arrived;
        self.state.start_time = Some(now);
        self.state.schedule = schedule;

        self.events.emit(Event::CollateralArrived {
            loan_id: self.id,
            asset: asset.clone(),
            amount,
            valuation_at_lock: entry.unit_price,
            timestamp: now,
        });
        self.events.emit(Event::LoanActivated {
            loan_id: self.id,
            principal_released: self.state.principal_amount,
            start_time: now,
        });

        self.transition(LoanStatus::Active, borrower, now);
        self.snapshot("activated".to_string(), now);

        Ok(())
    }

    /// repay the next due installment with the exact amount owed
    pub fn repay<L: FundsLedger + CollateralLedger>(
        &mut self,
        borrower: &PartyId,
        amount: Money,
        ledger: &mut L,
        time_provider: &SafeTimeProvider,
    ) -> Result<AmountDue> {
        let index = self.get_current_repayment_number()?;
        self.repay_installment(borrower, index, amount, ledger, time_provider)
    }

    /// repay a specific installment; rejected unless it is the next unpaid
    pub fn repay_installment<L: FundsLedger + CollateralLedger>(
        &mut self,
        borrower: &PartyId,
        index: u32,
        amount: Money,
        ledger: &mut L,
        time_provider: &SafeTimeProvider,
    ) -> Result<AmountDue> {
        self.require_status(&[LoanStatus::Active, LoanStatus::Repaying], "repay")?;
        self.require_party(self.state.borrower.clone(), borrower, "repay")?;
        let lender = self.bound_party(self.state.lender.clone(), "repay")?;

        let next_index = self.get_current_repayment_number()?;
        if index != next_index {
            return Err(LoanError::OutOfOrderRepayment {
                next_index,
                requested_index: index,
            });
        }

        let due = amount_due(&self.state.schedule, index)?;
        if amount != due.amount {
            return Err(LoanError::AmountMismatch {
                expected: due.amount.as_decimal(),
                provided: amount.as_decimal(),
            });
        }

        let now = time_provider.now();
        let deadline = self.state.schedule[(index - 1) as usize].due_at + self.config.grace_period();
        if now > deadline {
            return Err(LoanError::Expired { deadline, now });
        }

        let is_final = index == self.state.installment_count;

        // all transfers before any state mutation
        ledger.pull_funds(borrower, amount)?;
        ledger.push_funds(&lender, due.amount - due.fee_portion)?;
        if !due.fee_portion.is_zero() {
            ledger.push_funds(&self.config.platform_account.clone(), due.fee_portion)?;
        }
        if is_final && !self.state.collateral_amount.is_zero() {
            ledger.push_collateral(
                &self.state.collateral_asset.clone(),
                borrower,
                self.state.collateral_amount,
            )?;
        }

        {
            let installment = &mut self.state.schedule[(index - 1) as usize];
            installment.status = InstallmentStatus::Paid;
            installment.paid_by = Some(borrower.clone());
            installment.paid_at = Some(now);
            self.state.outstanding_principal -= installment.principal_component;
        }

        self.events.emit(Event::RepaymentReceived {
            loan_id: self.id,
            installment_index: index,
            amount,
            fee_portion: due.fee_portion,
            paid_by: borrower.clone(),
            timestamp: now,
        });

        if is_final {
            self.state.collateral_status = CollateralStatus::Returned;
            self.transition(LoanStatus::Closed, borrower, now);
            self.events.emit(Event::LoanClosed {
                loan_id: self.id,
                timestamp: now,
            });
        } else if self.state.status == LoanStatus::Active {
            self.transition(LoanStatus::Repaying, borrower, now);
        }

        self.snapshot(format!("repayment {}: {}", index, amount), now);

        Ok(due)
    }

    /// lender claims default once the next unpaid installment is past its
    /// grace deadline. Detection is lazy: nothing transitions on a timer.
    pub fn claim_default(&mut self, lender: &PartyId, time_provider: &SafeTimeProvider) -> Result<()> {
        self.require_status(&[LoanStatus::Active, LoanStatus::Repaying], "claim_default")?;
        self.require_party(self.state.lender.clone(), lender, "claim_default")?;

        let next_index = self.get_current_repayment_number()?;
        let now = time_provider.now();
        let deadline = self.state.schedule[(next_index - 1) as usize].due_at + self.config.grace_period();

        if now <= deadline {
            return Err(LoanError::StateTransitionNotAllowed {
                status: self.state.status,
                operation: "claim_default",
            });
        }

        let grace = self.config.grace_period();
        for installment in &mut self.state.schedule {
            if installment.status == InstallmentStatus::Pending && now > installment.due_at + grace {
                installment.status = InstallmentStatus::Missed;
            }
        }

        self.events.emit(Event::DefaultClaimed {
            loan_id: self.id,
            missed_index: next_index,
            timestamp: now,
        });

        self.transition(LoanStatus::Defaulted, lender, now);
        self.snapshot("default claimed".to_string(), now);

        Ok(())
    }

    /// settle escrowed collateral after default: the portion covering the
    /// outstanding debt (valued at the lock-time price) goes to the
    /// lender, any remainder returns to the borrower
    pub fn settle_collateral<L: CollateralLedger>(
        &mut self,
        caller: &PartyId,
        ledger: &mut L,
        time_provider: &SafeTimeProvider,
    ) -> Result<CollateralSettlement> {
        self.require_status(&[LoanStatus::Defaulted], "settle_collateral")?;

        let borrower = self.bound_party(self.state.borrower.clone(), "settle_collateral")?;
        let lender = self.bound_party(self.state.lender.clone(), "settle_collateral")?;
        if *caller != borrower && *caller != lender {
            return Err(LoanError::StateTransitionNotAllowed {
                status: self.state.status,
                operation: "settle_collateral",
            });
        }

        let valuation = self
            .state
            .collateral_valuation_at_lock
            .ok_or(LoanError::StateTransitionNotAllowed {
                status: self.state.status,
                operation: "settle_collateral",
            })?;

        let debt = self.state.outstanding_debt();
        let raw_units = debt.as_decimal() / valuation.as_decimal();
        let units_for_debt = match self.config.seizure_rounding {
            SeizureRounding::FavorLender => Units::from_decimal(raw_units.ceil()),
            SeizureRounding::FavorBorrower => Units::from_decimal(raw_units.floor()),
        };

        let seized = units_for_debt.min(self.state.collateral_amount);
        let returned = self.state.collateral_amount - seized;

        let asset = self.state.collateral_asset.clone();
        if !seized.is_zero() {
            ledger.push_collateral(&asset, &lender, seized)?;
        }
        if !returned.is_zero() {
            ledger.push_collateral(&asset, &borrower, returned)?;
        }

        let now = time_provider.now();
        self.state.collateral_status = if seized.is_zero() {
            CollateralStatus::Returned
        } else {
            CollateralStatus::Seized
        };

        self.events.emit(Event::CollateralSettled {
            loan_id: self.id,
            asset,
            seized,
            returned,
            timestamp: now,
        });

        self.transition(LoanStatus::Closed, caller, now);
        self.events.emit(Event::LoanClosed {
            loan_id: self.id,
            timestamp: now,
        });
        self.snapshot("collateral settled".to_string(), now);

        Ok(CollateralSettlement {
            seized,
            returned,
            outstanding_debt: debt,
            valuation_at_lock: valuation,
        })
    }

    /// get pending events
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    fn require_status(&self, allowed: &[LoanStatus], operation: &'static str) -> Result<()> {
        if allowed.contains(&self.state.status) {
            Ok(())
        } else {
            Err(LoanError::StateTransitionNotAllowed {
                status: self.state.status,
                operation,
            })
        }
    }

    fn require_party(
        &self,
        expected: Option<PartyId>,
        caller: &PartyId,
        operation: &'static str,
    ) -> Result<()> {
        match expected {
            Some(ref party) if party == caller => Ok(()),
            _ => Err(LoanError::StateTransitionNotAllowed {
                status: self.state.status,
                operation,
            }),
        }
    }

    fn bound_party(&self, party: Option<PartyId>, operation: &'static str) -> Result<PartyId> {
        party.ok_or(LoanError::StateTransitionNotAllowed {
            status: self.state.status,
            operation,
        })
    }

    fn transition(&mut self, to: LoanStatus, actor: &PartyId, now: chrono::DateTime<chrono::Utc>) {
        let from = self.state.status;
        self.state.update_status(to, now);
        self.events.emit(Event::StatusChanged {
            loan_id: self.id,
            from_status: from,
            to_status: to,
            timestamp: now,
            actor: actor.clone(),
        });
    }

    fn snapshot(&mut self, trigger: String, now: chrono::DateTime<chrono::Utc>) {
        self.snapshots.push(StateSnapshot::capture(&self.state, trigger, now));
    }
}
