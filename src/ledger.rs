//! Interface to the value-transfer substrate. A loan never owns balances;
//! it only asks the substrate to pull exact amounts into escrow or push
//! them out, and treats any failure as a fatal abort of the triggering
//! operation.

use std::collections::HashMap;

use crate::decimal::{Money, Units};
use crate::errors::{LoanError, Result};
use crate::types::{AssetId, PartyId};

/// native-currency transfer substrate. Each call is atomic: it either
/// moves the exact amount or fails without effect.
pub trait FundsLedger {
    /// pull an exact amount from a party into escrow
    fn pull_funds(&mut self, from: &PartyId, amount: Money) -> Result<()>;

    /// push an exact amount from escrow to a party
    fn push_funds(&mut self, to: &PartyId, amount: Money) -> Result<()>;
}

/// collateral asset transfer substrate, same exact-amount contract
pub trait CollateralLedger {
    /// pull an exact quantity of an asset from a party into escrow
    fn pull_collateral(&mut self, asset: &AssetId, from: &PartyId, amount: Units) -> Result<()>;

    /// push an exact quantity of an asset from escrow to a party
    fn push_collateral(&mut self, asset: &AssetId, to: &PartyId, amount: Units) -> Result<()>;
}

/// reference substrate keeping balances in maps; used by tests and demos
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    funds: HashMap<PartyId, Money>,
    collateral: HashMap<(AssetId, PartyId), Units>,
    escrow_funds: Money,
    escrow_collateral: HashMap<AssetId, Units>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit_funds(&mut self, party: &PartyId, amount: Money) {
        *self.funds.entry(party.clone()).or_insert(Money::ZERO) += amount;
    }

    pub fn credit_collateral(&mut self, asset: &AssetId, party: &PartyId, amount: Units) {
        *self
            .collateral
            .entry((asset.clone(), party.clone()))
            .or_insert(Units::ZERO) += amount;
    }

    pub fn funds_balance(&self, party: &PartyId) -> Money {
        self.funds.get(party).copied().unwrap_or(Money::ZERO)
    }

    pub fn collateral_balance(&self, asset: &AssetId, party: &PartyId) -> Units {
        self.collateral
            .get(&(asset.clone(), party.clone()))
            .copied()
            .unwrap_or(Units::ZERO)
    }

    pub fn escrowed_funds(&self) -> Money {
        self.escrow_funds
    }

    pub fn escrowed_collateral(&self, asset: &AssetId) -> Units {
        self.escrow_collateral
            .get(asset)
            .copied()
            .unwrap_or(Units::ZERO)
    }
}

impl FundsLedger for InMemoryLedger {
    fn pull_funds(&mut self, from: &PartyId, amount: Money) -> Result<()> {
        let balance = self.funds.entry(from.clone()).or_insert(Money::ZERO);

        if *balance < amount {
            return Err(LoanError::TransferFailed {
                reason: format!("{} holds {}, cannot cover {}", from, balance, amount),
            });
        }

        *balance -= amount;
        self.escrow_funds += amount;
        Ok(())
    }

    fn push_funds(&mut self, to: &PartyId, amount: Money) -> Result<()> {
        if self.escrow_funds < amount {
            return Err(LoanError::TransferFailed {
                reason: format!("escrow holds {}, cannot release {}", self.escrow_funds, amount),
            });
        }

        self.escrow_funds -= amount;
        *self.funds.entry(to.clone()).or_insert(Money::ZERO) += amount;
        Ok(())
    }
}

impl CollateralLedger for InMemoryLedger {
    fn pull_collateral(&mut self, asset: &AssetId, from: &PartyId, amount: Units) -> Result<()> {
        let balance = self
            .collateral
            .entry((asset.clone(), from.clone()))
            .or_insert(Units::ZERO);

        if *balance < amount {
            return Err(LoanError::TransferFailed {
                reason: format!("{} holds {} of {}, cannot cover {}", from, balance, asset, amount),
            });
        }

        *balance -= amount;
        *self
            .escrow_collateral
            .entry(asset.clone())
            .or_insert(Units::ZERO) += amount;
        Ok(())
    }

    fn push_collateral(&mut self, asset: &AssetId, to: &PartyId, amount: Units) -> Result<()> {
        let escrowed = self
            .escrow_collateral
            .entry(asset.clone())
            .or_insert(Units::ZERO);

        if *escrowed < amount {
            return Err(LoanError::TransferFailed {
                reason: format!("escrow holds {} of {}, cannot release {}", escrowed, asset, amount),
            });
        }

        *escrowed -= amount;
        *self
            .collateral
            .entry((asset.clone(), to.clone()))
            .or_insert(Units::ZERO) += amount;
        Ok(())
    }
}
