//! Authorization registry interface
//!
//! The ledger never embeds role logic. It asks an [`AuthorizationRegistry`]
//! whether a caller holds a capability and whether an account is blocked,
//! and tells it to block accounts whose holdings were drained by a refund.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Capabilities the ledger checks before privileged operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// May create new locked supply via `mint_lockup`
    Mint,
    /// May spend on behalf of other accounts without an allowance
    Spend,
    /// May refund lockups and change the income account
    Administer,
}

pub trait AuthorizationRegistry {
    fn has_capability(&self, account: &str, capability: Capability) -> bool;

    fn is_blocked(&self, account: &str) -> bool;

    fn set_blocked(&mut self, account: &str, blocked: bool);
}

/// Registry kept entirely in memory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryAuthRegistry {
    capabilities: HashMap<String, HashSet<Capability>>,
    blocked: HashSet<String>,
}

impl InMemoryAuthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, account: &str, capability: Capability) {
        self.capabilities
            .entry(account.to_string())
            .or_default()
            .insert(capability);
    }

    pub fn revoke(&mut self, account: &str, capability: Capability) {
        if let Some(caps) = self.capabilities.get_mut(account) {
            caps.remove(&capability);
            if caps.is_empty() {
                self.capabilities.remove(account);
            }
        }
    }

    pub fn capabilities_of(&self, account: &str) -> Vec<Capability> {
        let mut caps: Vec<Capability> = self
            .capabilities
            .get(account)
            .map(|caps| caps.iter().copied().collect())
            .unwrap_or_default();
        caps.sort_by_key(|cap| *cap as u8);
        caps
    }

    pub fn blocked_accounts(&self) -> Vec<String> {
        let mut accounts: Vec<String> = self.blocked.iter().cloned().collect();
        accounts.sort();
        accounts
    }
}

impl AuthorizationRegistry for InMemoryAuthRegistry {
    fn has_capability(&self, account: &str, capability: Capability) -> bool {
        self.capabilities
            .get(account)
            .is_some_and(|caps| caps.contains(&capability))
    }

    fn is_blocked(&self, account: &str) -> bool {
        self.blocked.contains(account)
    }

    fn set_blocked(&mut self, account: &str, blocked: bool) {
        if blocked {
            self.blocked.insert(account.to_string());
        } else {
            self.blocked.remove(account);
        }
    }
}
