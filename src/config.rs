use serde::{Deserialize, Serialize};

use crate::decimal::Rate;
use crate::errors::{LoanError, Result};
use crate::types::{PartyId, SeizureRounding};

/// protocol-wide configuration shared by every loan the registry creates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// seconds between installments; the installment count of a loan is
    /// derived from its duration and this interval, never caller-supplied
    pub installment_interval_secs: u64,
    /// platform fee carved out of each interest component
    pub platform_fee_rate: Rate,
    /// seconds past an installment's due date before repayment is refused
    /// and default may be claimed
    pub grace_period_secs: u64,
    /// account receiving the platform fee
    pub platform_account: PartyId,
    /// rounding direction for the collateral split at default settlement
    pub seizure_rounding: SeizureRounding,
}

impl ProtocolConfig {
    pub fn new(
        installment_interval_secs: u64,
        platform_fee_rate: Rate,
        grace_period_secs: u64,
        platform_account: PartyId,
        seizure_rounding: SeizureRounding,
    ) -> Result<Self> {
        if installment_interval_secs == 0 {
            return Err(LoanError::InvalidPolicy {
                message: "installment interval must be positive".to_string(),
            });
        }

        if platform_fee_rate.as_bps() >= rust_decimal::Decimal::from(10000) {
            return Err(LoanError::InvalidPolicy {
                message: format!("platform fee {} would consume all interest", platform_fee_rate),
            });
        }

        Ok(Self {
            installment_interval_secs,
            platform_fee_rate,
            grace_period_secs,
            platform_account,
            seizure_rounding,
        })
    }

    /// 30-second installments with a 1% platform fee, no grace period
    pub fn standard(platform_account: PartyId) -> Self {
        Self {
            installment_interval_secs: 30,
            platform_fee_rate: Rate::from_bps(100),
            grace_period_secs: 0,
            platform_account,
            seizure_rounding: SeizureRounding::FavorLender,
        }
    }

    /// number of installments for a loan of the given duration, capped
    /// at `u32::MAX` rather than truncated
    pub fn installment_count(&self, duration_secs: u64) -> u32 {
        let count = (duration_secs / self.installment_interval_secs).max(1);
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    pub fn grace_period(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.grace_period_secs as i64)
    }
}
