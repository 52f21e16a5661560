use std::str::FromStr;

use thiserror::Error;

/// Failure kinds of the lending contracts. Every failure leaves the ledger
/// state untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Empty_Amount")]
    Empty_Amount,

    #[error("Loan_Period_Excedeed")]
    Loan_Period_Excedeed,

    #[error("InterestRate_Too_High")]
    InterestRate_Too_High,

    #[error("Not_Authorized")]
    Not_Authorized,

    #[error("Unknown_Request")]
    Unknown_Request,

    #[error("Request_Expired")]
    Request_Expired,

    #[error("Already_Received")]
    Already_Received,

    #[error("Empty_Lender")]
    Empty_Lender,

    #[error("Impossible_Borrower")]
    Impossible_Borrower,

    #[error("Loan_No_More_Available")]
    Loan_No_More_Available,

    #[error("Reputation_Not_Received")]
    Reputation_Not_Received,

    #[error("Reputation_Too_Low")]
    Reputation_Too_Low,

    #[error("Not_The_Borrower")]
    Not_The_Borrower,

    #[error("Not_The_Lender")]
    Not_The_Lender,

    #[error("Not_Enough_Balance")]
    Not_Enough_Balance,

    #[error("Loan_Not_Started")]
    Loan_Not_Started,

    #[error("Already_Started")]
    Already_Started,

    #[error("Loan_Not_Expired")]
    Loan_Not_Expired,

    #[error("Loan_Closed")]
    Loan_Closed,

    #[error("Nothing_To_Repay")]
    Nothing_To_Repay,

    #[error("Not_Due")]
    Not_Due,

    #[error("Insufficient_Funds")]
    Insufficient_Funds,

    #[error("Arithmetic_Overflow")]
    Arithmetic_Overflow,

    #[error("Unknown_Escrow")]
    Unknown_Escrow,
}

impl ProtocolError {
    pub const ALL: [ProtocolError; 24] = [
        ProtocolError::Empty_Amount,
        ProtocolError::Loan_Period_Excedeed,
        ProtocolError::InterestRate_Too_High,
        ProtocolError::Not_Authorized,
        ProtocolError::Unknown_Request,
        ProtocolError::Request_Expired,
        ProtocolError::Already_Received,
        ProtocolError::Empty_Lender,
        ProtocolError::Impossible_Borrower,
        ProtocolError::Loan_No_More_Available,
        ProtocolError::Reputation_Not_Received,
        ProtocolError::Reputation_Too_Low,
        ProtocolError::Not_The_Borrower,
        ProtocolError::Not_The_Lender,
        ProtocolError::Not_Enough_Balance,
        ProtocolError::Loan_Not_Started,
        ProtocolError::Already_Started,
        ProtocolError::Loan_Not_Expired,
        ProtocolError::Loan_Closed,
        ProtocolError::Nothing_To_Repay,
        ProtocolError::Not_Due,
        ProtocolError::Insufficient_Funds,
        ProtocolError::Arithmetic_Overflow,
        ProtocolError::Unknown_Escrow,
    ];

    /// Stable wire code, identical to the `Display` output.
    pub fn code(&self) -> String {
        self.to_string()
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, ProtocolError::Not_Authorized)
    }
}

impl FromStr for ProtocolError {
    type Err = crate::error::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ProtocolError::ALL
            .iter()
            .find(|item| item.to_string() == value)
            .copied()
            .ok_or_else(|| {
                crate::error::Error::ParseMessage(format!(
                    "unknown protocol error code {}",
                    value
                ))
            })
    }
}
