pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod loan;
pub mod policy;
pub mod registry;
pub mod schedule;
pub mod state;
pub mod types;

// re-export key types
pub use config::ProtocolConfig;
pub use decimal::{Money, Rate, Units};
pub use errors::{LoanError, Result};
pub use events::{Event, EventStore};
pub use ledger::{CollateralLedger, FundsLedger, InMemoryLedger};
pub use loan::LoanContract;
pub use policy::{CollateralPolicy, PolicyEntry};
pub use registry::LoanRegistry;
pub use schedule::{amount_due, build_schedule};
pub use state::{LoanState, StateSnapshot};
pub use types::{
    AmountDue, AssetId, CollateralSettlement, CollateralStatus, CollateralTerms, Installment,
    InstallmentStatus, LoanId, LoanStatus, OriginationMode, PartyId, SeizureRounding,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
