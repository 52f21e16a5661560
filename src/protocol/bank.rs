use std::collections::HashMap;

use super::{
    error::ProtocolError,
    types::{Address, Amount},
};

/// Native-token balances of every account the runtime knows about.
#[derive(Debug, Clone, Default)]
pub struct Bank {
    balances: HashMap<Address, Amount>,
}

impl Bank {
    pub fn new() -> Self {
        Bank::default()
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Credits an account out of thin air. Only genesis setup and tests use it.
    pub fn mint(&mut self, account: &Address, amount: Amount) {
        let balance = self.balances.entry(account.clone()).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), ProtocolError> {
        if amount == 0 || from == to {
            return Ok(());
        }

        let from_balance = self.balance_of(from);
        let remaining = from_balance
            .checked_sub(amount)
            .ok_or(ProtocolError::Insufficient_Funds)?;
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(ProtocolError::Arithmetic_Overflow)?;

        self.balances.insert(from.clone(), remaining);
        self.balances.insert(to.clone(), credited);

        Ok(())
    }

    pub fn total_supply(&self) -> Amount {
        self.balances.values().sum()
    }
}
