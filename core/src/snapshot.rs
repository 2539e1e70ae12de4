//! Ledger snapshots with JSON disk backup

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::auth::AuthorizationRegistry;
use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::event::LedgerEvent;
use crate::ledger::{AccountEntry, Ledger};
use crate::referral::ReferralGraph;
use crate::supply::SupplyStats;

/// Full ledger state at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub taken_at: DateTime<Utc>,
    pub config: LedgerConfig,
    pub income_account: Option<String>,
    pub accounts: BTreeMap<String, AccountEntry>,
    pub allowances: BTreeMap<String, BTreeMap<String, u64>>,
    pub supply: SupplyStats,
    #[serde(default)]
    pub events: Vec<LedgerEvent>,
}

impl LedgerSnapshot {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Check that the stored counters match the stored accounts
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;

        let mut liquid: u64 = 0;
        let mut locked: u64 = 0;
        for (id, entry) in &self.accounts {
            if !entry.lockups.is_well_formed() {
                return Err(LedgerError::Serialization(format!(
                    "malformed lockups for {}",
                    id
                )));
            }
            liquid = liquid
                .checked_add(entry.liquid)
                .ok_or(LedgerError::SupplyOverflow)?;
            locked = entry
                .lockups
                .checked_total()
                .and_then(|total| locked.checked_add(total))
                .ok_or(LedgerError::SupplyOverflow)?;
        }

        if liquid != self.supply.liquid || locked != self.supply.locked {
            return Err(LedgerError::Serialization(format!(
                "supply mismatch: accounts hold {} liquid / {} locked, counters say {} / {}",
                liquid, locked, self.supply.liquid, self.supply.locked
            )));
        }
        liquid
            .checked_add(locked)
            .ok_or(LedgerError::SupplyOverflow)?;
        if !self.supply.is_conserved() {
            return Err(LedgerError::Serialization(
                "minted minus refunded does not match supply".to_string(),
            ));
        }
        Ok(())
    }
}

impl<A, R, C> Ledger<A, R, C>
where
    A: AuthorizationRegistry,
    R: ReferralGraph,
    C: Clock,
{
    pub fn snapshot(&self) -> LedgerSnapshot {
        let taken_at = DateTime::from_timestamp(self.now() as i64, 0).unwrap_or_else(Utc::now);

        LedgerSnapshot {
            taken_at,
            config: self.config.clone(),
            income_account: self.income_account.clone(),
            accounts: self
                .accounts
                .iter()
                .map(|(id, entry)| (id.clone(), entry.clone()))
                .collect(),
            allowances: self
                .allowances
                .iter()
                .map(|(owner, operators)| {
                    let operators = operators
                        .iter()
                        .map(|(op, amount)| (op.clone(), *amount))
                        .collect();
                    (owner.clone(), operators)
                })
                .collect(),
            supply: self.supply,
            events: self.events.clone(),
        }
    }

    /// Rebuild a ledger from a snapshot with fresh collaborators.
    pub fn restore(snapshot: LedgerSnapshot, registry: A, referrals: R, clock: C) -> Result<Self> {
        snapshot.validate()?;

        info!(
            "Restoring ledger snapshot from {} ({} accounts)",
            snapshot.taken_at,
            snapshot.accounts.len()
        );

        Ok(Self {
            config: snapshot.config,
            accounts: snapshot.accounts.into_iter().collect(),
            allowances: snapshot
                .allowances
                .into_iter()
                .map(|(owner, operators)| (owner, operators.into_iter().collect::<HashMap<_, _>>()))
                .collect(),
            supply: snapshot.supply,
            income_account: snapshot.income_account,
            events: snapshot.events,
            registry,
            referrals,
            clock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Capability, InMemoryAuthRegistry};
    use crate::clock::{ManualClock, DAY};
    use crate::lockup::LockupSchedule;
    use crate::referral::InMemoryReferralGraph;

    fn registry() -> InMemoryAuthRegistry {
        let mut registry = InMemoryAuthRegistry::new();
        registry.grant("owner", Capability::Mint);
        registry.grant("game", Capability::Spend);
        registry
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let clock = ManualClock::new(50 * DAY);
        let mut ledger = Ledger::new(
            LedgerConfig::new(10 * DAY, DAY).with_income_account("income"),
            registry(),
            InMemoryReferralGraph::new(),
            clock.clone(),
        )
        .unwrap();

        ledger.mint_lockup("owner", "user", 40).unwrap();
        clock.advance(2 * DAY);
        ledger.mint_lockup("owner", "user", 60).unwrap();
        ledger.approve("user", "shop", 7).unwrap();
        ledger.spend("game", "user", 25).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        ledger.snapshot().save_to_file(&path).unwrap();

        let loaded = LedgerSnapshot::load_from_file(&path).unwrap();
        assert_eq!(loaded, ledger.snapshot());

        let restored =
            Ledger::restore(loaded, registry(), InMemoryReferralGraph::new(), clock).unwrap();
        assert_eq!(restored.lockups("user"), ledger.lockups("user"));
        assert_eq!(restored.allowance("user", "shop"), 7);
        assert_eq!(restored.supply(), ledger.supply());
        assert_eq!(restored.events().len(), ledger.events().len());
        assert!(restored.verify_integrity());
    }

    #[test]
    fn test_restore_rejects_tampered_supply() {
        let clock = ManualClock::new(0);
        let mut ledger = Ledger::new(
            LedgerConfig::new(10 * DAY, DAY),
            registry(),
            InMemoryReferralGraph::new(),
            clock.clone(),
        )
        .unwrap();
        ledger.mint_lockup("owner", "user", 40).unwrap();

        let mut snapshot = ledger.snapshot();
        snapshot.supply.locked += 1;

        assert!(
            Ledger::restore(snapshot, registry(), InMemoryReferralGraph::new(), clock).is_err()
        );
    }

    fn overflowing_snapshot() -> LedgerSnapshot {
        let mut accounts = BTreeMap::new();
        accounts.insert(
            "a".to_string(),
            AccountEntry {
                liquid: u64::MAX,
                lockups: LockupSchedule::new(),
            },
        );
        let mut lockups = LockupSchedule::new();
        lockups.insert(DAY, 1);
        accounts.insert("b".to_string(), AccountEntry { liquid: 0, lockups });

        LedgerSnapshot {
            taken_at: Utc::now(),
            config: LedgerConfig::new(10 * DAY, DAY),
            income_account: None,
            accounts,
            allowances: BTreeMap::new(),
            supply: SupplyStats {
                liquid: u64::MAX,
                locked: 1,
                minted: u64::MAX,
                refunded: 0,
            },
            events: Vec::new(),
        }
    }

    #[test]
    fn test_validate_rejects_overflowing_supply() {
        let snapshot = overflowing_snapshot();
        assert!(matches!(
            snapshot.validate(),
            Err(LedgerError::SupplyOverflow)
        ));
    }

    #[test]
    fn test_validate_rejects_overflowing_buckets() {
        let mut snapshot = overflowing_snapshot();
        let mut lockups = LockupSchedule::new();
        lockups.insert(DAY, u64::MAX);
        lockups.insert(2 * DAY, 1);
        snapshot
            .accounts
            .insert("a".to_string(), AccountEntry { liquid: 0, lockups });
        snapshot.accounts.remove("b");

        assert!(matches!(
            snapshot.validate(),
            Err(LedgerError::SupplyOverflow)
        ));
    }
}
