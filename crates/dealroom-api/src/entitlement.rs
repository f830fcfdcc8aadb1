//! Entitlement check consulted once, before a deal is created.

use std::collections::BTreeSet;

use dealroom_core::UserId;

/// Decides whether a user may open a deal of a given contract type.
pub trait EntitlementCheck: Send + Sync + std::fmt::Debug {
    /// `Err` carries the message returned to the caller as 403.
    fn check(&self, user: UserId, contract_type: &str) -> Result<(), String>;
}

/// Everyone is entitled to everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl EntitlementCheck for AllowAll {
    fn check(&self, _user: UserId, _contract_type: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Only the listed contract types are entitled.
#[derive(Debug, Clone, Default)]
pub struct ContractTypeAllowList {
    allowed: BTreeSet<String>,
}

impl ContractTypeAllowList {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: types.into_iter().map(Into::into).collect(),
        }
    }
}

impl EntitlementCheck for ContractTypeAllowList {
    fn check(&self, user: UserId, contract_type: &str) -> Result<(), String> {
        if self.allowed.contains(contract_type) {
            Ok(())
        } else {
            tracing::warn!(%user, contract_type, "deal creation refused: not entitled");
            Err(format!("not entitled to create {contract_type} deals"))
        }
    }
}
