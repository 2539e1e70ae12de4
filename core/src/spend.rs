//! Spend path and referral distribution
//!
//! A spend removes value from an account (liquid first, then the
//! earliest-maturing buckets) and re-issues exactly the same amount:
//! the operator's share as liquid balance, the referral and income shares
//! as fresh lockups.

use log::info;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthorizationRegistry, Capability};
use crate::clock::Clock;
use crate::distribution::Distribution;
use crate::error::{LedgerError, Result};
use crate::event::LedgerEventKind;
use crate::ledger::Ledger;
use crate::referral::ReferralGraph;

/// Referral levels that take part in a spend
pub const REFERRAL_DEPTH: usize = 2;

/// Outcome of a successful spend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendReceipt {
    pub amount: u64,
    pub from_liquid: u64,
    pub from_locked: u64,
    pub parent: Option<String>,
    pub grandparent: Option<String>,
    pub income_account: String,
    pub shares: Distribution,
    /// Whether the operator's allowance was consumed
    pub used_allowance: bool,
}

impl<A, R, C> Ledger<A, R, C>
where
    A: AuthorizationRegistry,
    R: ReferralGraph,
    C: Clock,
{
    /// Spend `amount` of `account`'s holdings on behalf of `operator`.
    ///
    /// The operator needs either an allowance of at least `amount` from the
    /// account (which is consumed) or the `Spend` capability.
    pub fn spend(&mut self, operator: &str, account: &str, amount: u64) -> Result<SpendReceipt> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount(
                "spend amount must be positive".to_string(),
            ));
        }
        if operator == account {
            return Err(LedgerError::InvalidOperator(format!(
                "{} cannot operate its own spend",
                account
            )));
        }
        self.ensure_not_blocked(account)?;
        self.ensure_not_blocked(operator)?;

        let income_account = self
            .income_account
            .clone()
            .ok_or(LedgerError::IncomeAccountNotSet)?;
        if income_account == account {
            return Err(LedgerError::NotApproved(format!(
                "income account {} cannot spend",
                account
            )));
        }

        let used_allowance = self.allowance(account, operator) >= amount;
        if !used_allowance && !self.registry.has_capability(operator, Capability::Spend) {
            return Err(LedgerError::NotApproved(format!(
                "{} has neither an allowance of {} from {} nor spend capability",
                operator, amount, account
            )));
        }

        let available = self.holdings_of(account);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        let (parent, grandparent) = self.eligible_referrers(account);
        let shares = self
            .config
            .distribution
            .split(amount, parent.is_some(), grandparent.is_some());

        // All preconditions hold; nothing below can fail.
        if used_allowance {
            self.consume_allowance(account, operator, amount);
        }
        let (from_liquid, from_locked) = self.debit(account, amount);
        self.credit(operator, &parent, &grandparent, &income_account, &shares);

        info!(
            "{} spent {} of {} (liquid {}, locked {}): operator {}, parent {}, grandparent {}, income {}",
            operator,
            amount,
            account,
            from_liquid,
            from_locked,
            shares.operator,
            shares.parent,
            shares.grandparent,
            shares.income
        );

        self.record(LedgerEventKind::Spent {
            operator: operator.to_string(),
            account: account.to_string(),
            amount,
            from_liquid,
            from_locked,
        });
        self.record(LedgerEventKind::Distributed {
            account: account.to_string(),
            operator: operator.to_string(),
            parent: parent.clone(),
            grandparent: grandparent.clone(),
            income_account: income_account.clone(),
            shares,
        });

        Ok(SpendReceipt {
            amount,
            from_liquid,
            from_locked,
            parent,
            grandparent,
            income_account,
            shares,
            used_allowance,
        })
    }

    /// Parent and grandparent of `account`. Blocked referrers get nothing.
    fn eligible_referrers(&self, account: &str) -> (Option<String>, Option<String>) {
        let mut chain = self
            .referrals
            .ancestors(account, REFERRAL_DEPTH)
            .into_iter()
            .map(|referrer| Some(referrer).filter(|r| !self.registry.is_blocked(r)));

        let parent = chain.next().flatten();
        let grandparent = chain.next().flatten();
        (parent, grandparent)
    }

    fn consume_allowance(&mut self, owner: &str, operator: &str, amount: u64) {
        if let Some(operators) = self.allowances.get_mut(owner) {
            if let Some(remaining) = operators.get_mut(operator) {
                *remaining -= amount;
                if *remaining == 0 {
                    operators.remove(operator);
                }
            }
            if operators.is_empty() {
                self.allowances.remove(owner);
            }
        }
    }

    /// Take `amount` from liquid balance first, then from the oldest buckets.
    fn debit(&mut self, account: &str, amount: u64) -> (u64, u64) {
        let Some(entry) = self.accounts.get_mut(account) else {
            return (0, 0);
        };

        let from_liquid = entry.liquid.min(amount);
        entry.liquid -= from_liquid;
        let from_locked = entry.lockups.take_oldest(amount - from_liquid);

        self.supply.record_debit(from_liquid, from_locked);
        (from_liquid, from_locked)
    }

    fn credit(
        &mut self,
        operator: &str,
        parent: &Option<String>,
        grandparent: &Option<String>,
        income_account: &str,
        shares: &Distribution,
    ) {
        if shares.operator > 0 {
            self.accounts.entry(operator.to_string()).or_default().liquid += shares.operator;
        }

        let mut locked = 0;
        for (referrer, share) in [(parent, shares.parent), (grandparent, shares.grandparent)] {
            if let Some(referrer) = referrer {
                if share > 0 {
                    self.lock_into(referrer, share);
                    locked += share;
                }
            }
        }
        if shares.income > 0 {
            self.lock_into(income_account, shares.income);
            locked += shares.income;
        }

        self.supply.record_credit(shares.operator, locked);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::InMemoryAuthRegistry;
    use crate::clock::{ManualClock, DAY};
    use crate::config::LedgerConfig;
    use crate::distribution::DistributionConfig;
    use crate::referral::InMemoryReferralGraph;

    type TestLedger = Ledger<InMemoryAuthRegistry, InMemoryReferralGraph, ManualClock>;

    fn setup() -> (TestLedger, ManualClock) {
        let clock = ManualClock::new(200 * DAY);
        let mut registry = InMemoryAuthRegistry::new();
        registry.grant("owner", Capability::Mint);
        registry.grant("owner", Capability::Administer);
        registry.grant("game", Capability::Spend);

        let config = LedgerConfig::new(10 * DAY, DAY)
            .with_income_account("income")
            .with_distribution(DistributionConfig {
                operator_bps: 1_000,
                parent_bps: 2_000,
                grandparent_bps: 1_000,
            });
        let ledger = Ledger::new(
            config,
            registry,
            InMemoryReferralGraph::new(),
            clock.clone(),
        )
        .unwrap();
        (ledger, clock)
    }

    #[test]
    fn test_spend_drains_liquid_before_locked() {
        let (mut ledger, clock) = setup();
        ledger.mint_lockup("owner", "user", 30).unwrap();
        clock.advance(10 * DAY);
        ledger.unlock_available("user").unwrap();
        ledger.mint_lockup("owner", "user", 50).unwrap();
        clock.advance(DAY);
        ledger.mint_lockup("owner", "user", 50).unwrap();

        let receipt = ledger.spend("game", "user", 70).unwrap();
        assert_eq!(receipt.from_liquid, 30);
        assert_eq!(receipt.from_locked, 40);
        assert!(!receipt.used_allowance);

        let lockups = ledger.lockups("user");
        assert_eq!(lockups.len(), 2);
        assert_eq!(lockups[0].amount, 10);
        assert_eq!(lockups[1].amount, 50);
        assert_eq!(ledger.holdings_of("user"), 130 - 70);
        assert!(ledger.verify_integrity());
    }

    #[test]
    fn test_spend_without_referrers_goes_to_income() {
        let (mut ledger, _clock) = setup();
        ledger.mint_lockup("owner", "user", 100).unwrap();

        let receipt = ledger.spend("game", "user", 100).unwrap();
        assert_eq!(receipt.shares.operator, 10);
        assert_eq!(receipt.shares.income, 90);
        assert_eq!(receipt.parent, None);

        assert_eq!(ledger.balance_of("game"), 10);
        assert_eq!(ledger.locked_of("income"), 90);
        assert_eq!(ledger.holdings_of("user"), 0);
    }

    #[test]
    fn test_spend_fans_out_to_referrers() {
        let (mut ledger, _clock) = setup();
        ledger.referrals_mut().add_relation("grandpa", "parent").unwrap();
        ledger.referrals_mut().add_relation("parent", "user").unwrap();
        ledger.mint_lockup("owner", "user", 1_000).unwrap();

        let receipt = ledger.spend("game", "user", 1_000).unwrap();
        assert_eq!(receipt.parent.as_deref(), Some("parent"));
        assert_eq!(receipt.grandparent.as_deref(), Some("grandpa"));

        assert_eq!(ledger.locked_of("parent"), 200);
        assert_eq!(ledger.locked_of("grandpa"), 100);
        assert_eq!(ledger.locked_of("income"), 600);
        assert_eq!(ledger.balance_of("game"), 100);
        assert_eq!(ledger.supply().total(), 1_000);
        assert!(ledger.verify_integrity());
    }

    #[test]
    fn test_blocked_referrer_share_folds_into_income() {
        let (mut ledger, _clock) = setup();
        ledger.referrals_mut().add_relation("grandpa", "parent").unwrap();
        ledger.referrals_mut().add_relation("parent", "user").unwrap();
        ledger.registry_mut().set_blocked("parent", true);
        ledger.mint_lockup("owner", "user", 1_000).unwrap();

        let receipt = ledger.spend("game", "user", 1_000).unwrap();
        assert_eq!(receipt.parent, None);
        assert_eq!(receipt.grandparent.as_deref(), Some("grandpa"));
        assert_eq!(ledger.locked_of("parent"), 0);
        assert_eq!(ledger.locked_of("income"), 800);
    }

    #[test]
    fn test_allowance_is_consumed() {
        let (mut ledger, _clock) = setup();
        ledger.mint_lockup("owner", "user", 100).unwrap();
        ledger.approve("user", "shop", 15).unwrap();

        let receipt = ledger.spend("shop", "user", 10).unwrap();
        assert!(receipt.used_allowance);
        assert_eq!(ledger.allowance("user", "shop"), 5);

        assert!(matches!(
            ledger.spend("shop", "user", 10),
            Err(LedgerError::NotApproved(_))
        ));
        ledger.spend("shop", "user", 5).unwrap();
        assert_eq!(ledger.allowance("user", "shop"), 0);
    }

    #[test]
    fn test_failed_spend_changes_nothing() {
        let (mut ledger, _clock) = setup();
        ledger.mint_lockup("owner", "user", 10).unwrap();
        ledger.approve("user", "shop", 50).unwrap();
        let events_before = ledger.events().len();
        let supply_before = ledger.supply();

        assert!(matches!(
            ledger.spend("shop", "user", 11),
            Err(LedgerError::InsufficientBalance {
                requested: 11,
                available: 10
            })
        ));
        assert!(matches!(
            ledger.spend("game", "user", 0),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            ledger.spend("user", "user", 1),
            Err(LedgerError::InvalidOperator(_))
        ));

        assert_eq!(ledger.allowance("user", "shop"), 50);
        assert_eq!(ledger.holdings_of("user"), 10);
        assert_eq!(ledger.supply(), supply_before);
        assert_eq!(ledger.events().len(), events_before);
    }

    #[test]
    fn test_spend_from_blocked_account_rejected() {
        let (mut ledger, _clock) = setup();
        ledger.mint_lockup("owner", "user", 10).unwrap();
        ledger.registry_mut().set_blocked("user", true);

        assert!(matches!(
            ledger.spend("game", "user", 5),
            Err(LedgerError::AccountBlocked(_))
        ));
    }

    #[test]
    fn test_spend_by_blocked_operator_rejected() {
        let (mut ledger, _clock) = setup();
        ledger.mint_lockup("owner", "user", 10).unwrap();
        ledger.approve("user", "shop", 10).unwrap();
        ledger.registry_mut().set_blocked("game", true);
        ledger.registry_mut().set_blocked("shop", true);

        assert!(matches!(
            ledger.spend("game", "user", 5),
            Err(LedgerError::AccountBlocked(_))
        ));
        assert!(matches!(
            ledger.spend("shop", "user", 5),
            Err(LedgerError::AccountBlocked(_))
        ));
        assert_eq!(ledger.holdings_of("user"), 10);
        assert_eq!(ledger.allowance("user", "shop"), 10);
    }

    #[test]
    fn test_spend_requires_income_account() {
        let clock = ManualClock::new(0);
        let mut registry = InMemoryAuthRegistry::new();
        registry.grant("owner", Capability::Mint);
        registry.grant("game", Capability::Spend);
        let mut ledger = Ledger::new(
            LedgerConfig::new(10 * DAY, DAY),
            registry,
            InMemoryReferralGraph::new(),
            clock,
        )
        .unwrap();
        ledger.mint_lockup("owner", "user", 10).unwrap();

        assert!(matches!(
            ledger.spend("game", "user", 5),
            Err(LedgerError::IncomeAccountNotSet)
        ));
    }
}
