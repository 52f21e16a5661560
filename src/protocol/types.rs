use std::fmt;

use serde::{Deserialize, Serialize};

pub type Amount = u128;
pub type UnixTime = i64;
pub type Duration = i64;
pub type RequestId = u64;
pub type Score = u32;
pub type InterestRate = u32;

pub const DAY: Duration = 86_400;

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Address(value.into())
    }

    /// Derives a contract address from its creator and a salt, truncated to
    /// the 20 byte hex form used by account addresses.
    pub fn derive(creator: &Address, salt: &str) -> Self {
        let digest = sha256::digest(format!("{}:{}", creator.0, salt));
        Address(format!("0x{}", &digest[..40]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Address(value.to_owned())
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LoanKey(String);

impl LoanKey {
    pub fn new(value: impl Into<String>) -> Self {
        LoanKey(value.into())
    }

    pub fn generate(
        lender: &Address,
        nonce: u64,
        end_timestamp: UnixTime,
        now: UnixTime,
    ) -> Self {
        LoanKey(sha256::digest(format!(
            "{}:{}:{}:{}",
            lender, nonce, end_timestamp, now
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller identity, attached value and block time of one contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub value: Amount,
    pub now: UnixTime,
}

impl CallContext {
    pub fn new(caller: impl Into<Address>, now: UnixTime) -> Self {
        CallContext {
            caller: caller.into(),
            value: 0,
            now,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_addresses_are_stable_and_distinct() {
        let creator = Address::from("0xmanager");
        let a = Address::derive(&creator, "escrow:0");
        let b = Address::derive(&creator, "escrow:1");

        assert_eq!(a, Address::derive(&creator, "escrow:0"));
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 42);
        assert!(a.as_str().starts_with("0x"));
    }

    #[test]
    fn loan_keys_depend_on_nonce() {
        let lender = Address::from("0xlender");
        let first = LoanKey::generate(&lender, 0, 100, 10);
        let second = LoanKey::generate(&lender, 1, 100, 10);

        assert_ne!(first, second);
        assert_eq!(first.as_str().len(), 64);
    }
}
