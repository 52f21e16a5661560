//! Lending contracts and the in-process runtime hosting them.

pub mod authorization;
pub mod bank;
pub mod error;
pub mod escrow;
pub mod events;
pub mod interest;
pub mod lender_manager;
pub mod parameters;
pub mod position;
pub mod reputation;
pub mod runtime;
pub mod types;

pub use authorization::OraclePolicy;
pub use bank::Bank;
pub use error::ProtocolError;
pub use escrow::{Escrow, EscrowState};
pub use events::{EventLog, EventRecord, ProtocolEvent};
pub use lender_manager::LenderManager;
pub use parameters::ProtocolParameters;
pub use position::{BorrowOrder, LendingPosition};
pub use reputation::{ReputationRequest, RequestStatus};
pub use runtime::{Ledger, Runtime};
pub use types::{Address, Amount, CallContext, LoanKey, RequestId, Score, UnixTime};
