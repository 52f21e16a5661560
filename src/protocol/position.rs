use std::collections::HashMap;

use serde::Serialize;

use super::{
    error::ProtocolError,
    types::{Address, Amount, InterestRate, LoanKey, UnixTime},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LendingPosition {
    pub lender: Address,
    pub available_amount: Amount,
    pub end_timestamp: UnixTime,
    pub interest_rate: InterestRate,
    pub loan_key: LoanKey,
}

impl LendingPosition {
    pub fn is_expired(&self, now: UnixTime) -> bool {
        now > self.end_timestamp
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BorrowOrder {
    pub borrower: Address,
    pub loan_amount: Amount,
    pub miner_actor: Address,
    pub loan_key: LoanKey,
}

/// Lending positions and everything recorded against them.
#[derive(Debug, Clone, Default)]
pub struct PositionRegistry {
    positions: HashMap<LoanKey, LendingPosition>,
    loan_keys: Vec<LoanKey>,
    deposits: HashMap<LoanKey, Amount>,
    orders: HashMap<LoanKey, Vec<BorrowOrder>>,
    escrows: HashMap<LoanKey, Vec<Address>>,
}

impl PositionRegistry {
    pub fn new() -> Self {
        PositionRegistry::default()
    }

    pub fn insert(&mut self, position: LendingPosition) {
        let key = position.loan_key.clone();
        self.deposits.insert(key.clone(), position.available_amount);
        self.loan_keys.push(key.clone());
        self.positions.insert(key, position);
    }

    pub fn get(&self, key: &LoanKey) -> Option<&LendingPosition> {
        self.positions.get(key)
    }

    pub fn contains(&self, key: &LoanKey) -> bool {
        self.positions.contains_key(key)
    }

    pub fn loan_key(&self, index: usize) -> Option<&LoanKey> {
        self.loan_keys.get(index)
    }

    pub fn loan_keys(&self) -> &[LoanKey] {
        &self.loan_keys
    }

    pub fn original_deposit(&self, key: &LoanKey) -> Option<Amount> {
        self.deposits.get(key).copied()
    }

    pub fn orders(&self, key: &LoanKey) -> &[BorrowOrder] {
        self.orders.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn escrows(&self, key: &LoanKey) -> &[Address] {
        self.escrows.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Draws `order.loan_amount` from the position and records the order and
    /// its escrow address.
    pub fn record_borrow(
        &mut self,
        order: BorrowOrder,
        escrow: Address,
    ) -> Result<(), ProtocolError> {
        let position = self
            .positions
            .get_mut(&order.loan_key)
            .ok_or(ProtocolError::Empty_Lender)?;

        position.available_amount = position
            .available_amount
            .checked_sub(order.loan_amount)
            .ok_or(ProtocolError::Loan_No_More_Available)?;

        let key = order.loan_key.clone();
        self.escrows.entry(key.clone()).or_default().push(escrow);
        self.orders.entry(key).or_default().push(order);

        Ok(())
    }

    pub fn borrowed_total(&self, key: &LoanKey) -> Amount {
        self.orders(key).iter().map(|o| o.loan_amount).sum()
    }
}
