use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate, Units};
use crate::types::{AssetId, LoanId, LoanStatus, PartyId};

/// all events emitted by loans and the registry; emission is best-effort
/// bookkeeping and never gates a transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // origination events
    LoanRequested {
        loan_id: LoanId,
        borrower: PartyId,
        principal: Money,
        timestamp: DateTime<Utc>,
    },
    LoanOffered {
        loan_id: LoanId,
        lender: PartyId,
        principal: Money,
        timestamp: DateTime<Utc>,
    },

    // funding events
    FundsEscrowed {
        loan_id: LoanId,
        lender: PartyId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    OfferAccepted {
        loan_id: LoanId,
        borrower: PartyId,
        timestamp: DateTime<Utc>,
    },

    // collateral events
    CollateralArrived {
        loan_id: LoanId,
        asset: AssetId,
        amount: Units,
        valuation_at_lock: Money,
        timestamp: DateTime<Utc>,
    },
    CollateralSettled {
        loan_id: LoanId,
        asset: AssetId,
        seized: Units,
        returned: Units,
        timestamp: DateTime<Utc>,
    },

    // lifecycle events
    LoanActivated {
        loan_id: LoanId,
        principal_released: Money,
        start_time: DateTime<Utc>,
    },
    RepaymentReceived {
        loan_id: LoanId,
        installment_index: u32,
        amount: Money,
        fee_portion: Money,
        paid_by: PartyId,
        timestamp: DateTime<Utc>,
    },
    DefaultClaimed {
        loan_id: LoanId,
        missed_index: u32,
        timestamp: DateTime<Utc>,
    },
    LoanClosed {
        loan_id: LoanId,
        timestamp: DateTime<Utc>,
    },

    // policy administration events
    CollateralAssetRegistered {
        asset: AssetId,
        unit_price: Money,
        required_ratio: Rate,
    },
    CollateralPriceUpdated {
        asset: AssetId,
        old_price: Money,
        new_price: Money,
    },

    // every transition also emits this structured record
    StatusChanged {
        loan_id: LoanId,
        from_status: LoanStatus,
        to_status: LoanStatus,
        timestamp: DateTime<Utc>,
        actor: PartyId,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
