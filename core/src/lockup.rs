//! Time-bucketed lockups
//!
//! Deposits are grouped into windows `lockup_unit` seconds wide. All
//! deposits made inside one window share a single maturity timestamp, so an
//! account never holds more than one bucket per window. Buckets are kept in
//! ascending maturity order, no two share a timestamp and none is empty.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A quantity of value pending maturity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockup {
    pub amount: u64,
    pub matures_at: u64,
}

/// Start of the `unit`-wide window containing `timestamp`.
pub fn bucket_start(timestamp: u64, unit: u64) -> u64 {
    timestamp - (timestamp % unit)
}

/// Ordered queue of lockup buckets for one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockupSchedule {
    buckets: VecDeque<Lockup>,
}

impl LockupSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the bucket maturing at `matures_at`, creating it in
    /// sorted position if it does not exist. Returns true when an existing
    /// bucket was merged into.
    pub fn insert(&mut self, matures_at: u64, amount: u64) -> bool {
        if amount == 0 {
            return false;
        }

        // Deposits almost always land in the newest bucket.
        if let Some(last) = self.buckets.back_mut() {
            if last.matures_at == matures_at {
                last.amount += amount;
                return true;
            }
            if last.matures_at < matures_at {
                self.buckets.push_back(Lockup { amount, matures_at });
                return false;
            }
        }

        let pos = self.buckets.partition_point(|l| l.matures_at < matures_at);
        match self.buckets.get_mut(pos) {
            Some(existing) if existing.matures_at == matures_at => {
                existing.amount += amount;
                true
            }
            _ => {
                self.buckets.insert(pos, Lockup { amount, matures_at });
                false
            }
        }
    }

    /// Remove every bucket with `matures_at <= now` and return their sum.
    pub fn drain_matured(&mut self, now: u64) -> u64 {
        let mut released = 0;
        while let Some(front) = self.buckets.front() {
            if front.matures_at > now {
                break;
            }
            released += front.amount;
            self.buckets.pop_front();
        }
        released
    }

    /// Take up to `amount` from the earliest-maturing buckets first.
    /// Returns how much was actually taken.
    pub fn take_oldest(&mut self, amount: u64) -> u64 {
        let mut remaining = amount;
        while remaining > 0 {
            let Some(front) = self.buckets.front_mut() else {
                break;
            };
            if front.amount > remaining {
                front.amount -= remaining;
                remaining = 0;
            } else {
                remaining -= front.amount;
                self.buckets.pop_front();
            }
        }
        amount - remaining
    }

    /// Reduce the bucket maturing at `matures_at` by at most `amount`.
    /// Returns the amount removed; zero when no such bucket exists.
    pub fn reduce(&mut self, matures_at: u64, amount: u64) -> u64 {
        let Ok(pos) = self
            .buckets
            .binary_search_by_key(&matures_at, |l| l.matures_at)
        else {
            return 0;
        };

        let bucket = &mut self.buckets[pos];
        let removed = amount.min(bucket.amount);
        bucket.amount -= removed;
        if bucket.amount == 0 {
            self.buckets.remove(pos);
        }
        removed
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|l| l.amount).sum()
    }

    /// Like [`total`](Self::total) but `None` when the sum overflows,
    /// for schedules read from untrusted input.
    pub fn checked_total(&self) -> Option<u64> {
        self.buckets
            .iter()
            .try_fold(0u64, |acc, l| acc.checked_add(l.amount))
    }

    pub fn get(&self, matures_at: u64) -> Option<&Lockup> {
        self.buckets
            .binary_search_by_key(&matures_at, |l| l.matures_at)
            .ok()
            .map(|pos| &self.buckets[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lockup> {
        self.buckets.iter()
    }

    pub fn to_vec(&self) -> Vec<Lockup> {
        self.buckets.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// True when buckets are strictly increasing in maturity and non-empty.
    pub fn is_well_formed(&self) -> bool {
        self.buckets.iter().all(|l| l.amount > 0)
            && self
                .buckets
                .iter()
                .zip(self.buckets.iter().skip(1))
                .all(|(a, b)| a.matures_at < b.matures_at)
    }
}
