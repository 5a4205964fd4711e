use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};

/// unique identifier for a loan, assigned by the registry in strictly
/// increasing order
pub type LoanId = u64;

/// opaque identifier for a party (borrower, lender, platform account)
pub type PartyId = String;

/// opaque identifier for a collateral asset
pub type AssetId = String;

/// loan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// borrower-initiated, waiting for a lender to fund
    Requested,
    /// lender-initiated, waiting for the lender's funds
    Offered,
    /// offer funded, waiting for a borrower to accept
    FundsPending,
    /// counterparty bound, waiting for collateral
    CollateralPending,
    /// collateralized and funded, schedule running
    Active,
    /// at least one installment paid
    Repaying,
    /// lender claimed default on a missed installment
    Defaulted,
    /// terminal: fully repaid or collateral settled
    Closed,
}

/// collateral custody status; only ever moves forward
/// None -> Arrived -> (Returned | Seized)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollateralStatus {
    None,
    Arrived,
    Returned,
    Seized,
}

/// which party supplied funds-intent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginationMode {
    /// borrower created a request; lender funds it
    Request,
    /// lender created an offer; borrower accepts it
    Offer,
}

/// installment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Missed,
}

/// one scheduled repayment, decomposed into principal, interest, and fee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    /// 1-based position in the schedule
    pub index: u32,
    pub due_at: DateTime<Utc>,
    pub principal_component: Money,
    pub interest_component: Money,
    /// platform fee, carved out of the interest component
    pub fee_component: Money,
    pub status: InstallmentStatus,
    pub paid_by: Option<PartyId>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Installment {
    /// total the borrower owes for this installment
    pub fn amount_due(&self) -> Money {
        self.principal_component + self.interest_component
    }

    /// what the lender receives once the fee is split out
    pub fn lender_portion(&self) -> Money {
        self.amount_due() - self.fee_component
    }
}

/// repayment quote for one installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountDue {
    pub amount: Money,
    pub fee_portion: Money,
}

/// collateral terms supplied at origination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralTerms {
    pub asset: AssetId,
    pub interest_rate: Rate,
}

/// rounding direction for the collateral split at default settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeizureRounding {
    /// round the seized unit count up; the lender may receive up to one
    /// unit price more than the outstanding debt
    FavorLender,
    /// round the seized unit count down; the lender may receive up to one
    /// unit price less than the outstanding debt
    FavorBorrower,
}

/// outcome of settling collateral after default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralSettlement {
    pub seized: crate::decimal::Units,
    pub returned: crate::decimal::Units,
    pub outstanding_debt: Money,
    pub valuation_at_lock: Money,
}
