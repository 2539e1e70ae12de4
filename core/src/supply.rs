//! Aggregate supply tracking

use serde::{Deserialize, Serialize};

/// Process-wide supply counters.
///
/// `liquid` and `locked` always equal the sums of the matching balance
/// components over all accounts. `minted` and `refunded` are cumulative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyStats {
    pub liquid: u64,
    pub locked: u64,
    pub minted: u64,
    pub refunded: u64,
}

impl SupplyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.liquid + self.locked
    }

    /// Value is only created by minting and only destroyed by refunds.
    pub fn is_conserved(&self) -> bool {
        let held = self.liquid.checked_add(self.locked);
        held.is_some() && self.minted.checked_sub(self.refunded) == held
    }

    pub(crate) fn record_mint(&mut self, amount: u64) {
        self.minted += amount;
        self.locked += amount;
    }

    pub(crate) fn record_refund(&mut self, amount: u64) {
        self.refunded += amount;
        self.locked -= amount;
    }

    pub(crate) fn record_unlock(&mut self, amount: u64) {
        self.locked -= amount;
        self.liquid += amount;
    }

    /// Value leaving an account during a spend
    pub(crate) fn record_debit(&mut self, liquid: u64, locked: u64) {
        self.liquid -= liquid;
        self.locked -= locked;
    }

    /// Value re-issued to an account during a spend
    pub(crate) fn record_credit(&mut self, liquid: u64, locked: u64) {
        self.liquid += liquid;
        self.locked += locked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supply_flow() {
        let mut supply = SupplyStats::new();

        supply.record_mint(1000);
        assert_eq!(supply.locked, 1000);
        assert_eq!(supply.total(), 1000);

        supply.record_unlock(400);
        assert_eq!(supply.liquid, 400);
        assert_eq!(supply.locked, 600);

        supply.record_refund(100);
        assert_eq!(supply.total(), 900);
        assert!(supply.is_conserved());
    }

    #[test]
    fn test_detects_drift() {
        let supply = SupplyStats {
            liquid: 10,
            locked: 0,
            minted: 5,
            refunded: 0,
        };
        assert!(!supply.is_conserved());
    }

    #[test]
    fn test_overflowing_counters_not_conserved() {
        let supply = SupplyStats {
            liquid: u64::MAX,
            locked: 1,
            minted: u64::MAX,
            refunded: 0,
        };
        assert!(!supply.is_conserved());
    }
}
