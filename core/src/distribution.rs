//! Spend distribution arithmetic
//!
//! A spent amount is re-issued across four destinations: the operator that
//! executed the spend, the spender's parent, the spender's grandparent and
//! the income account. Shares are computed with integer math in basis
//! points; every rounding remainder and every share whose referrer is
//! missing goes to the income account, so the four parts always add up to
//! the spent amount.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// 100% in basis points
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Share of each spend, in basis points, paid to each non-income destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Credited as liquid balance to the operator
    pub operator_bps: u64,
    /// Locked up for the spender's parent
    pub parent_bps: u64,
    /// Locked up for the spender's grandparent
    pub grandparent_bps: u64,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            operator_bps: 1_000,
            parent_bps: 1_000,
            grandparent_bps: 500,
        }
    }
}

impl DistributionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let total = self
            .operator_bps
            .checked_add(self.parent_bps)
            .and_then(|t| t.checked_add(self.grandparent_bps));

        match total {
            Some(total) if total <= BPS_DENOMINATOR => Ok(()),
            _ => Err(ConfigError::Invalid(format!(
                "distribution shares exceed {} bps: operator {}, parent {}, grandparent {}",
                BPS_DENOMINATOR, self.operator_bps, self.parent_bps, self.grandparent_bps
            ))),
        }
    }

    /// Basis points left for the income account when every referrer exists
    pub fn income_bps(&self) -> u64 {
        BPS_DENOMINATOR.saturating_sub(
            self.operator_bps
                .saturating_add(self.parent_bps)
                .saturating_add(self.grandparent_bps),
        )
    }

    /// Split `amount`. Missing referrers fold their share into income.
    pub fn split(&self, amount: u64, has_parent: bool, has_grandparent: bool) -> Distribution {
        let operator = share_of(amount, self.operator_bps);
        let parent = if has_parent {
            share_of(amount, self.parent_bps)
        } else {
            0
        };
        let grandparent = if has_grandparent {
            share_of(amount, self.grandparent_bps)
        } else {
            0
        };

        Distribution {
            operator,
            parent,
            grandparent,
            income: amount - operator - parent - grandparent,
        }
    }
}

fn share_of(amount: u64, bps: u64) -> u64 {
    // u128 keeps amount * bps from overflowing; the result is <= amount.
    ((amount as u128 * bps as u128) / BPS_DENOMINATOR as u128) as u64
}

/// Concrete split of one spend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Distribution {
    pub operator: u64,
    pub parent: u64,
    pub grandparent: u64,
    pub income: u64,
}

impl Distribution {
    pub fn total(&self) -> u64 {
        self.operator + self.parent + self.grandparent + self.income
    }
}
