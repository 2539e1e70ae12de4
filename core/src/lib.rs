//! Stars Ledger Core Library
//!
//! Lockup-and-distribution ledger:
//! - New supply is minted as time-bucketed lockups that vest after `lockup_time`
//! - Matured buckets are released into liquid balance on demand
//! - Spending re-issues the spent amount to the operator, up to two
//!   referrers and the income account, conserving value exactly
//! - Accounts drained by administrative refunds are blocked

pub mod auth;
pub mod clock;
pub mod config;
pub mod distribution;
pub mod error;
pub mod event;
pub mod ledger;
pub mod lockup;
pub mod referral;
pub mod snapshot;
pub mod spend;
pub mod supply;

// Re-export main types
pub use auth::{AuthorizationRegistry, Capability, InMemoryAuthRegistry};
pub use clock::{Clock, ManualClock, SystemClock, DAY, HOUR};
pub use config::{ConfigError, LedgerConfig};
pub use distribution::{Distribution, DistributionConfig, BPS_DENOMINATOR};
pub use error::{LedgerError, Result};
pub use event::{LedgerEvent, LedgerEventKind};
pub use ledger::{AccountEntry, Ledger};
pub use lockup::{bucket_start, Lockup, LockupSchedule};
pub use referral::{InMemoryReferralGraph, ReferralGraph};
pub use snapshot::LedgerSnapshot;
pub use spend::{SpendReceipt, REFERRAL_DEPTH};
pub use supply::SupplyStats;

/// Base units per star (8 decimal places)
pub const STAR_UNIT: u64 = 100_000_000;

/// Ledger with the in-memory collaborators
pub type MemoryLedger<C = SystemClock> = Ledger<InMemoryAuthRegistry, InMemoryReferralGraph, C>;

/// Crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
