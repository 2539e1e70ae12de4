//! Ledger audit trail

use serde::{Deserialize, Serialize};

use crate::distribution::Distribution;

/// A successful ledger mutation, stamped with clock time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub timestamp: u64,
    pub kind: LedgerEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEventKind {
    Minted {
        account: String,
        amount: u64,
        matures_at: u64,
    },
    Unlocked {
        account: String,
        amount: u64,
    },
    Spent {
        operator: String,
        account: String,
        amount: u64,
        from_liquid: u64,
        from_locked: u64,
    },
    Distributed {
        account: String,
        operator: String,
        parent: Option<String>,
        grandparent: Option<String>,
        income_account: String,
        shares: Distribution,
    },
    Refunded {
        account: String,
        amount: u64,
        matures_at: u64,
    },
    Blocked {
        account: String,
    },
    Approved {
        owner: String,
        operator: String,
        amount: u64,
    },
    Transferred {
        from: String,
        to: String,
        amount: u64,
    },
    IncomeAccountChanged {
        account: String,
    },
}

impl LedgerEventKind {
    /// Short label for display
    pub fn label(&self) -> &'static str {
        match self {
            LedgerEventKind::Minted { .. } => "minted",
            LedgerEventKind::Unlocked { .. } => "unlocked",
            LedgerEventKind::Spent { .. } => "spent",
            LedgerEventKind::Distributed { .. } => "distributed",
            LedgerEventKind::Refunded { .. } => "refunded",
            LedgerEventKind::Blocked { .. } => "blocked",
            LedgerEventKind::Approved { .. } => "approved",
            LedgerEventKind::Transferred { .. } => "transferred",
            LedgerEventKind::IncomeAccountChanged { .. } => "income_account_changed",
        }
    }
}
