use std::collections::BTreeSet;

use super::types::Address;

/// Principals allowed to deliver reputation scores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OraclePolicy {
    principals: BTreeSet<Address>,
}

impl OraclePolicy {
    pub fn new<I>(principals: I) -> Self
    where
        I: IntoIterator<Item = Address>,
    {
        OraclePolicy {
            principals: principals.into_iter().collect(),
        }
    }

    pub fn single(principal: Address) -> Self {
        OraclePolicy::new([principal])
    }

    pub fn is_authorized(&self, caller: &Address) -> bool {
        self.principals.contains(caller)
    }

    pub fn grant(&mut self, principal: Address) -> bool {
        self.principals.insert(principal)
    }

    pub fn revoke(&mut self, principal: &Address) -> bool {
        self.principals.remove(principal)
    }

    pub fn principals(&self) -> impl Iterator<Item = &Address> {
        self.principals.iter()
    }
}
