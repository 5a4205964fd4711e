use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate, Units};
use crate::types::{
    AssetId, CollateralStatus, Installment, InstallmentStatus, LoanId, LoanStatus,
    OriginationMode, PartyId,
};

/// the full record of one loan. Cloning this is the `loan_data()`
/// snapshot the query surface returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanState {
    // identity and terms, immutable after creation
    pub loan_id: LoanId,
    pub origination_mode: OriginationMode,
    pub principal_amount: Money,
    pub duration_secs: u64,
    pub installment_count: u32,
    pub interest_rate: Rate,
    pub collateral_asset: AssetId,

    // parties; at most one is unset until the counterparty acts
    pub borrower: Option<PartyId>,
    pub lender: Option<PartyId>,

    // collateral custody bookkeeping, immutable once set
    pub collateral_amount: Units,
    pub collateral_valuation_at_lock: Option<Money>,
    pub collateral_status: CollateralStatus,

    // lifecycle
    pub status: LoanStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub outstanding_principal: Money,
    pub schedule: Vec<Installment>,

    // dates
    pub created_at: DateTime<Utc>,
    pub last_status_change: DateTime<Utc>,
}

impl LoanState {
    fn new(
        loan_id: LoanId,
        origination_mode: OriginationMode,
        status: LoanStatus,
        borrower: Option<PartyId>,
        lender: Option<PartyId>,
        principal_amount: Money,
        duration_secs: u64,
        installment_count: u32,
        interest_rate: Rate,
        collateral_asset: AssetId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            loan_id,
            origination_mode,
            principal_amount,
            duration_secs,
            installment_count,
            interest_rate,
            collateral_asset,
            borrower,
            lender,
            collateral_amount: Units::ZERO,
            collateral_valuation_at_lock: None,
            collateral_status: CollateralStatus::None,
            status,
            start_time: None,
            outstanding_principal: principal_amount,
            schedule: Vec::new(),
            created_at,
            last_status_change: created_at,
        }
    }

    /// borrower-initiated loan; lender unset until funding
    pub fn new_request(
        loan_id: LoanId,
        borrower: PartyId,
        principal_amount: Money,
        duration_secs: u64,
        installment_count: u32,
        interest_rate: Rate,
        collateral_asset: AssetId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            loan_id,
            OriginationMode::Request,
            LoanStatus::Requested,
            Some(borrower),
            None,
            principal_amount,
            duration_secs,
            installment_count,
            interest_rate,
            collateral_asset,
            created_at,
        )
    }

    /// lender-initiated loan; borrower unset until acceptance
    pub fn new_offer(
        loan_id: LoanId,
        lender: PartyId,
        principal_amount: Money,
        duration_secs: u64,
        installment_count: u32,
        interest_rate: Rate,
        collateral_asset: AssetId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            loan_id,
            OriginationMode::Offer,
            LoanStatus::Offered,
            None,
            Some(lender),
            principal_amount,
            duration_secs,
            installment_count,
            interest_rate,
            collateral_asset,
            created_at,
        )
    }

    pub fn update_status(&mut self, new_status: LoanStatus, timestamp: DateTime<Utc>) {
        self.status = new_status;
        self.last_status_change = timestamp;
    }

    /// 1-based index of the earliest installment that is not yet paid
    pub fn next_unpaid_index(&self) -> Option<u32> {
        self.schedule
            .iter()
            .find(|i| i.status != InstallmentStatus::Paid)
            .map(|i| i.index)
    }

    /// interest still owed across unpaid installments
    pub fn unpaid_interest(&self) -> Money {
        self.schedule
            .iter()
            .filter(|i| i.status != InstallmentStatus::Paid)
            .map(|i| i.interest_component)
            .fold(Money::ZERO, |acc, x| acc + x)
    }

    /// unpaid principal plus unpaid interest; what collateral must cover
    /// at default settlement
    pub fn outstanding_debt(&self) -> Money {
        self.outstanding_principal + self.unpaid_interest()
    }

    pub fn is_terminal(&self) -> bool {
        self.status == LoanStatus::Closed
    }
}

/// state snapshot for the audit trail, captured on every mutating operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub snapshot_id: Uuid,
    pub loan_id: LoanId,
    pub timestamp: DateTime<Utc>,
    pub state: LoanState,
    pub trigger: String,
}

impl StateSnapshot {
    pub fn capture(state: &LoanState, trigger: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            snapshot_id: Uuid::new_v4(),
            loan_id: state.loan_id,
            timestamp,
            state: state.clone(),
            trigger,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_request_starts_without_lender() {
        let state = LoanState::new_request(
            1,
            "borrower".to_string(),
            Money::from_units(1_000),
            60,
            2,
            Rate::from_bps(100),
            "TTT".to_string(),
            created_at(),
        );

        assert_eq!(state.status, LoanStatus::Requested);
        assert_eq!(state.lender, None);
        assert_eq!(state.collateral_status, CollateralStatus::None);
        assert_eq!(state.outstanding_principal, Money::from_units(1_000));
        assert!(state.schedule.is_empty());
    }

    #[test]
    fn test_offer_starts_without_borrower() {
        let state = LoanState::new_offer(
            2,
            "lender".to_string(),
            Money::from_units(1_000),
            60,
            2,
            Rate::from_bps(100),
            "TTT".to_string(),
            created_at(),
        );

        assert_eq!(state.status, LoanStatus::Offered);
        assert_eq!(state.borrower, None);
        assert_eq!(state.lender.as_deref(), Some("lender"));
    }

    #[test]
    fn test_state_serializes_round_trip() {
        let state = LoanState::new_request(
            7,
            "borrower".to_string(),
            Money::from_units(12_000_000_000_000_000_000),
            60,
            2,
            Rate::from_bps(100),
            "TTT".to_string(),
            created_at(),
        );

        let json = serde_json::to_string(&state).unwrap();
        let restored: LoanState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }
}
