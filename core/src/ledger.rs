//! Lockup ledger
//!
//! Tracks liquid and locked balance per account together with the aggregate
//! supply counters. Every mutating operation validates all of its
//! preconditions before touching state, so a failed call leaves the ledger
//! exactly as it was.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::auth::{AuthorizationRegistry, Capability};
use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::event::{LedgerEvent, LedgerEventKind};
use crate::lockup::{bucket_start, Lockup, LockupSchedule};
use crate::referral::ReferralGraph;
use crate::supply::SupplyStats;

/// Balance state of a single account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    pub liquid: u64,
    pub lockups: LockupSchedule,
}

impl AccountEntry {
    pub fn locked(&self) -> u64 {
        self.lockups.total()
    }

    /// Liquid plus locked
    pub fn holdings(&self) -> u64 {
        self.liquid + self.locked()
    }
}

pub struct Ledger<A, R, C> {
    pub(crate) config: LedgerConfig,
    pub(crate) accounts: HashMap<String, AccountEntry>,
    /// owner -> operator -> remaining allowance
    pub(crate) allowances: HashMap<String, HashMap<String, u64>>,
    pub(crate) supply: SupplyStats,
    pub(crate) income_account: Option<String>,
    pub(crate) events: Vec<LedgerEvent>,
    pub(crate) registry: A,
    pub(crate) referrals: R,
    pub(crate) clock: C,
}

impl<A, R, C> Ledger<A, R, C>
where
    A: AuthorizationRegistry,
    R: ReferralGraph,
    C: Clock,
{
    pub fn new(config: LedgerConfig, registry: A, referrals: R, clock: C) -> Result<Self> {
        config.validate()?;

        info!(
            "Ledger initialized: lockup_time={}s lockup_unit={}s",
            config.lockup_time, config.lockup_unit
        );

        Ok(Self {
            income_account: config.income_account.clone(),
            config,
            accounts: HashMap::new(),
            allowances: HashMap::new(),
            supply: SupplyStats::new(),
            events: Vec::new(),
            registry,
            referrals,
            clock,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn registry(&self) -> &A {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut A {
        &mut self.registry
    }

    pub fn referrals(&self) -> &R {
        &self.referrals
    }

    pub fn referrals_mut(&mut self) -> &mut R {
        &mut self.referrals
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn income_account(&self) -> Option<&str> {
        self.income_account.as_deref()
    }

    /// Designate the account that collects the residual share of spends.
    pub fn set_income_account(&mut self, caller: &str, account: &str) -> Result<()> {
        self.require(caller, Capability::Administer)?;
        if account.is_empty() {
            return Err(LedgerError::InvalidOperator(
                "income account must not be empty".to_string(),
            ));
        }

        self.income_account = Some(account.to_string());
        info!("Income account set to {}", account);
        self.record(LedgerEventKind::IncomeAccountChanged {
            account: account.to_string(),
        });
        Ok(())
    }

    /// Maturity timestamp for a deposit made now
    pub fn current_maturity(&self) -> u64 {
        bucket_start(self.now(), self.config.lockup_unit).saturating_add(self.config.lockup_time)
    }

    /// Lock `amount` of new supply for `account`.
    ///
    /// Deposits made within one `lockup_unit` window merge into the same
    /// bucket. Returns the bucket's maturity timestamp.
    pub fn mint_lockup(&mut self, caller: &str, account: &str, amount: u64) -> Result<u64> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount(
                "mint amount must be positive".to_string(),
            ));
        }
        self.require(caller, Capability::Mint)?;
        self.ensure_not_blocked(account)?;
        if self.supply.minted.checked_add(amount).is_none() {
            return Err(LedgerError::SupplyOverflow);
        }

        let matures_at = self.lock_into(account, amount);
        self.supply.record_mint(amount);

        info!("Minted {} locked until {} for {}", amount, matures_at, account);
        self.record(LedgerEventKind::Minted {
            account: account.to_string(),
            amount,
            matures_at,
        });
        Ok(matures_at)
    }

    /// Move every matured bucket of `account` into its liquid balance.
    /// Returns the released amount; zero when nothing has matured.
    pub fn unlock_available(&mut self, account: &str) -> Result<u64> {
        self.ensure_not_blocked(account)?;

        let now = self.now();
        let released = match self.accounts.get_mut(account) {
            Some(entry) => {
                let released = entry.lockups.drain_matured(now);
                entry.liquid += released;
                released
            }
            None => 0,
        };

        if released > 0 {
            self.supply.record_unlock(released);
            debug!("Unlocked {} for {}", released, account);
            self.record(LedgerEventKind::Unlocked {
                account: account.to_string(),
                amount: released,
            });
        }
        Ok(released)
    }

    /// Administrative claw-back from the bucket maturing at `matures_at`.
    ///
    /// Requests beyond what the bucket holds are capped, and a missing bucket
    /// removes nothing. When the refund drains the account's last holdings
    /// it is blocked through the authorization registry. Returns the amount
    /// removed.
    pub fn refund_lockup(
        &mut self,
        caller: &str,
        account: &str,
        amount: u64,
        matures_at: u64,
    ) -> Result<u64> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount(
                "refund amount must be positive".to_string(),
            ));
        }
        self.require(caller, Capability::Administer)?;

        let removed = self
            .accounts
            .get_mut(account)
            .map(|entry| entry.lockups.reduce(matures_at, amount))
            .unwrap_or(0);

        if removed > 0 {
            self.supply.record_refund(removed);
            info!(
                "Refunded {} of bucket {} from {}",
                removed, matures_at, account
            );
            self.record(LedgerEventKind::Refunded {
                account: account.to_string(),
                amount: removed,
                matures_at,
            });
        }

        if removed > 0 && self.holdings_of(account) == 0 && !self.registry.is_blocked(account) {
            self.registry.set_blocked(account, true);
            warn!("Account {} drained by refund, blocking", account);
            self.record(LedgerEventKind::Blocked {
                account: account.to_string(),
            });
        }

        Ok(removed)
    }

    /// Allow `operator` to spend up to `amount` of `owner`'s holdings.
    /// Replaces any previous allowance; zero revokes it.
    pub fn approve(&mut self, owner: &str, operator: &str, amount: u64) -> Result<()> {
        if owner == operator {
            return Err(LedgerError::InvalidOperator(format!(
                "{} cannot approve itself",
                owner
            )));
        }
        self.ensure_not_blocked(owner)?;

        if amount == 0 {
            if let Some(operators) = self.allowances.get_mut(owner) {
                operators.remove(operator);
                if operators.is_empty() {
                    self.allowances.remove(owner);
                }
            }
        } else {
            self.allowances
                .entry(owner.to_string())
                .or_default()
                .insert(operator.to_string(), amount);
        }

        debug!("{} approved {} for {}", owner, operator, amount);
        self.record(LedgerEventKind::Approved {
            owner: owner.to_string(),
            operator: operator.to_string(),
            amount,
        });
        Ok(())
    }

    pub fn allowance(&self, owner: &str, operator: &str) -> u64 {
        self.allowances
            .get(owner)
            .and_then(|operators| operators.get(operator))
            .copied()
            .unwrap_or(0)
    }

    /// Move liquid balance between accounts. Locked value is not
    /// transferable.
    pub fn transfer(&mut self, from: &str, to: &str, amount: u64) -> Result<()> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount(
                "transfer amount must be positive".to_string(),
            ));
        }
        if from == to {
            return Err(LedgerError::InvalidOperator(format!(
                "{} cannot transfer to itself",
                from
            )));
        }
        self.ensure_not_blocked(from)?;
        self.ensure_not_blocked(to)?;

        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        if let Some(sender) = self.accounts.get_mut(from) {
            sender.liquid -= amount;
        }
        self.accounts.entry(to.to_string()).or_default().liquid += amount;

        info!("Transferred {} from {} to {}", amount, from, to);
        self.record(LedgerEventKind::Transferred {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        });
        Ok(())
    }

    /// Liquid balance only
    pub fn balance_of(&self, account: &str) -> u64 {
        self.accounts.get(account).map(|e| e.liquid).unwrap_or(0)
    }

    /// Sum of all lockup buckets, matured or not. Never unlocks.
    pub fn locked_of(&self, account: &str) -> u64 {
        self.accounts.get(account).map(|e| e.locked()).unwrap_or(0)
    }

    pub fn holdings_of(&self, account: &str) -> u64 {
        self.accounts.get(account).map(|e| e.holdings()).unwrap_or(0)
    }

    /// Ordered buckets of `account`, earliest maturity first
    pub fn lockups(&self, account: &str) -> Vec<Lockup> {
        self.accounts
            .get(account)
            .map(|e| e.lockups.to_vec())
            .unwrap_or_default()
    }

    pub fn locked_supply(&self) -> u64 {
        self.supply.locked
    }

    /// Liquid supply across all accounts
    pub fn total_supply(&self) -> u64 {
        self.supply.liquid
    }

    pub fn supply(&self) -> SupplyStats {
        self.supply
    }

    pub fn account(&self, account: &str) -> Option<&AccountEntry> {
        self.accounts.get(account)
    }

    /// Known account identifiers, sorted
    pub fn accounts(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.accounts.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Recompute aggregates from account state and compare with the
    /// counters. Also checks bucket ordering and global conservation.
    pub fn verify_integrity(&self) -> bool {
        let mut liquid: u64 = 0;
        let mut locked: u64 = 0;
        for entry in self.accounts.values() {
            if !entry.lockups.is_well_formed() {
                return false;
            }
            liquid += entry.liquid;
            locked += entry.locked();
        }
        liquid == self.supply.liquid && locked == self.supply.locked && self.supply.is_conserved()
    }

    /// Insert `amount` into the current maturity bucket of `account`.
    /// Supply counters are the caller's responsibility.
    pub(crate) fn lock_into(&mut self, account: &str, amount: u64) -> u64 {
        let matures_at = self.current_maturity();
        let merged = self
            .accounts
            .entry(account.to_string())
            .or_default()
            .lockups
            .insert(matures_at, amount);
        if merged {
            debug!("Merged {} into bucket {} of {}", amount, matures_at, account);
        }
        matures_at
    }

    pub(crate) fn require(&self, caller: &str, capability: Capability) -> Result<()> {
        if self.registry.has_capability(caller, capability) {
            Ok(())
        } else {
            Err(LedgerError::NotApproved(format!(
                "{} lacks {:?} capability",
                caller, capability
            )))
        }
    }

    pub(crate) fn ensure_not_blocked(&self, account: &str) -> Result<()> {
        if self.registry.is_blocked(account) {
            warn!("Rejected operation on blocked account {}", account);
            return Err(LedgerError::AccountBlocked(account.to_string()));
        }
        Ok(())
    }

    pub(crate) fn record(&mut self, kind: LedgerEventKind) {
        let timestamp = self.now();
        self.events.push(LedgerEvent { timestamp, kind });
    }
}
