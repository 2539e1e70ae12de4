//! Operation scripts replayed against a simulated ledger
//!
//! A script is a JSON array of operations, for example:
//! ```json
//! [
//!   { "op": "grant", "account": "owner", "capability": "mint" },
//!   { "op": "mint", "caller": "owner", "account": "user", "amount": 100 },
//!   { "op": "advance", "days": 20 },
//!   { "op": "unlock", "account": "user" }
//! ]
//! ```

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use stars_core::{
    AuthorizationRegistry, Capability, InMemoryAuthRegistry, InMemoryReferralGraph, Ledger,
    LedgerConfig, LedgerError, ManualClock, MemoryLedger, DAY,
};

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Account {account} has no lockup bucket #{index}")]
    UnknownBucket { account: String, index: usize },

    #[error("Refund needs either matures_at or bucket")]
    MissingBucket,

    #[error("Advance of {days} days and {seconds} seconds overflows")]
    AdvanceOverflow { days: u64, seconds: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    Grant {
        account: String,
        capability: Capability,
    },
    Refer {
        parent: String,
        child: String,
    },
    Block {
        account: String,
    },
    SetIncome {
        caller: String,
        account: String,
    },
    Mint {
        caller: String,
        account: String,
        amount: u64,
    },
    Advance {
        #[serde(default)]
        seconds: u64,
        #[serde(default)]
        days: u64,
    },
    Unlock {
        account: String,
    },
    Approve {
        owner: String,
        operator: String,
        amount: u64,
    },
    Spend {
        operator: String,
        account: String,
        amount: u64,
    },
    Transfer {
        from: String,
        to: String,
        amount: u64,
    },
    /// Targets either an explicit maturity or the n-th current bucket
    Refund {
        caller: String,
        account: String,
        amount: u64,
        #[serde(default)]
        matures_at: Option<u64>,
        #[serde(default)]
        bucket: Option<usize>,
    },
}

pub fn load_script<P: AsRef<Path>>(path: P) -> Result<Vec<ScriptOp>, ScriptError> {
    let content = fs::read_to_string(path)?;
    parse_script(&content)
}

pub fn parse_script(content: &str) -> Result<Vec<ScriptOp>, ScriptError> {
    Ok(serde_json::from_str(content)?)
}

/// A failed step; the ledger is unchanged by it
#[derive(Debug, Clone)]
pub struct StepFailure {
    pub step: usize,
    pub op: ScriptOp,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub applied: usize,
    pub failures: Vec<StepFailure>,
}

pub struct ScriptRunner {
    ledger: MemoryLedger<ManualClock>,
    clock: ManualClock,
}

impl ScriptRunner {
    pub fn new(config: LedgerConfig, start: u64) -> Result<Self, ScriptError> {
        let clock = ManualClock::new(start);
        let ledger = Ledger::new(
            config,
            InMemoryAuthRegistry::new(),
            InMemoryReferralGraph::new(),
            clock.clone(),
        )?;
        Ok(Self { ledger, clock })
    }

    pub fn ledger(&self) -> &MemoryLedger<ManualClock> {
        &self.ledger
    }

    /// Apply every operation, continuing past failures.
    pub fn run(&mut self, ops: &[ScriptOp]) -> RunSummary {
        let mut summary = RunSummary::default();
        for (step, op) in ops.iter().enumerate() {
            match self.apply(op) {
                Ok(()) => summary.applied += 1,
                Err(e) => {
                    warn!("Step {} failed: {}", step + 1, e);
                    summary.failures.push(StepFailure {
                        step: step + 1,
                        op: op.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        info!(
            "Script finished: {} applied, {} failed",
            summary.applied,
            summary.failures.len()
        );
        summary
    }

    pub fn apply(&mut self, op: &ScriptOp) -> Result<(), ScriptError> {
        match op {
            ScriptOp::Grant {
                account,
                capability,
            } => self.ledger.registry_mut().grant(account, *capability),
            ScriptOp::Refer { parent, child } => {
                self.ledger.referrals_mut().add_relation(parent, child)?
            }
            ScriptOp::Block { account } => self.ledger.registry_mut().set_blocked(account, true),
            ScriptOp::SetIncome { caller, account } => {
                self.ledger.set_income_account(caller, account)?
            }
            ScriptOp::Mint {
                caller,
                account,
                amount,
            } => {
                self.ledger.mint_lockup(caller, account, *amount)?;
            }
            ScriptOp::Advance { seconds, days } => {
                let delta = days
                    .checked_mul(DAY)
                    .and_then(|d| d.checked_add(*seconds))
                    .ok_or(ScriptError::AdvanceOverflow {
                        days: *days,
                        seconds: *seconds,
                    })?;
                self.clock.advance(delta);
            }
            ScriptOp::Unlock { account } => {
                self.ledger.unlock_available(account)?;
            }
            ScriptOp::Approve {
                owner,
                operator,
                amount,
            } => self.ledger.approve(owner, operator, *amount)?,
            ScriptOp::Spend {
                operator,
                account,
                amount,
            } => {
                self.ledger.spend(operator, account, *amount)?;
            }
            ScriptOp::Transfer { from, to, amount } => self.ledger.transfer(from, to, *amount)?,
            ScriptOp::Refund {
                caller,
                account,
                amount,
                matures_at,
                bucket,
            } => {
                let matures_at = match (matures_at, bucket) {
                    (Some(matures_at), _) => *matures_at,
                    (None, Some(index)) => self
                        .ledger
                        .lockups(account)
                        .get(*index)
                        .map(|l| l.matures_at)
                        .ok_or_else(|| ScriptError::UnknownBucket {
                            account: account.clone(),
                            index: *index,
                        })?,
                    (None, None) => return Err(ScriptError::MissingBucket),
                };
                self.ledger
                    .refund_lockup(caller, account, *amount, matures_at)?;
            }
        }
        Ok(())
    }

    pub fn is_blocked(&self, account: &str) -> bool {
        self.ledger.registry().is_blocked(account)
    }
}
