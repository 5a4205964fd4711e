use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{AssetId, LoanStatus};

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("invalid schedule parameters: {message}")]
    InvalidScheduleParameters {
        message: String,
    },

    #[error("invalid collateral policy: {message}")]
    InvalidPolicy {
        message: String,
    },

    #[error("unknown collateral asset: {asset}")]
    UnknownAsset {
        asset: AssetId,
    },

    #[error("collateral asset not approved: {asset}")]
    UnapprovedCollateral {
        asset: AssetId,
    },

    #[error("amount mismatch: expected {expected}, provided {provided}")]
    AmountMismatch {
        expected: Decimal,
        provided: Decimal,
    },

    #[error("out of order repayment: next unpaid installment is {next_index}, requested {requested_index}")]
    OutOfOrderRepayment {
        next_index: u32,
        requested_index: u32,
    },

    #[error("operation {operation} not allowed in status {status:?}")]
    StateTransitionNotAllowed {
        status: LoanStatus,
        operation: &'static str,
    },

    #[error("transfer failed: {reason}")]
    TransferFailed {
        reason: String,
    },

    #[error("past grace period: deadline {deadline}, current time {now}")]
    Expired {
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    },
}

pub type Result<T> = std::result::Result<T, LoanError>;
