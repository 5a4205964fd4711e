use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate, Units};
use crate::errors::{LoanError, Result};
use crate::types::AssetId;

/// one approved collateral asset: its unit price and the required
/// collateral value as a ratio of loan principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub asset: AssetId,
    pub unit_price: Money,
    pub required_ratio: Rate,
}

/// catalog of approved collateral assets. Entries are keyed by asset
/// identity and only ever replaced by administrative action, never
/// deleted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollateralPolicy {
    entries: HashMap<AssetId, PolicyEntry>,
}

impl CollateralPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// register an asset, replacing any existing entry for the same identity
    pub fn register(&mut self, asset: AssetId, unit_price: Money, required_ratio: Rate) -> Result<()> {
        if unit_price.is_zero() {
            return Err(LoanError::InvalidPolicy {
                message: format!("unit price for {} must be positive", asset),
            });
        }

        if required_ratio.is_zero() {
            return Err(LoanError::InvalidPolicy {
                message: format!("required ratio for {} must be positive", asset),
            });
        }

        self.entries.insert(
            asset.clone(),
            PolicyEntry {
                asset,
                unit_price,
                required_ratio,
            },
        );

        Ok(())
    }

    /// update the unit price of a registered asset
    pub fn update_price(&mut self, asset: &AssetId, unit_price: Money) -> Result<Money> {
        if unit_price.is_zero() {
            return Err(LoanError::InvalidPolicy {
                message: format!("unit price for {} must be positive", asset),
            });
        }

        let entry = self
            .entries
            .get_mut(asset)
            .ok_or_else(|| LoanError::UnknownAsset { asset: asset.clone() })?;

        let old_price = entry.unit_price;
        entry.unit_price = unit_price;
        Ok(old_price)
    }

    pub fn entry(&self, asset: &AssetId) -> Result<&PolicyEntry> {
        self.entries
            .get(asset)
            .ok_or_else(|| LoanError::UnknownAsset { asset: asset.clone() })
    }

    pub fn is_registered(&self, asset: &AssetId) -> bool {
        self.entries.contains_key(asset)
    }

    /// collateral units required to back a loan of `loan_amount`.
    ///
    /// ceil(loan_amount * required_ratio / unit_price) so collateral is
    /// never under-valued against the principal.
    pub fn required_collateral(&self, loan_amount: Money, asset: &AssetId) -> Result<Units> {
        let entry = self.entry(asset)?;

        let required_value = loan_amount.as_decimal() * entry.required_ratio.as_decimal();
        let units = (required_value / entry.unit_price.as_decimal()).ceil();

        Ok(Units::from_decimal(units))
    }
}
