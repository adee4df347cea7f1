//! Delegation ledger for validators and guilds
//!
//! Delegators lock governance tokens with a delegatee in exchange for shares,
//! reclaim them through time-locked unbonding, move stake between delegatees
//! through redelegation and collect rewards in proportion to their shares.
//!
//! ## Features
//!
//! - **Share accounting**: per-delegatee exchange rate, truncating math, shares
//!   typed as a distinct currency per delegatee
//! - **Time locks**: unbond lock-ins, redelegations and rebond grace windows,
//!   each bounded per (delegator, delegatee)
//! - **Slashing**: reaches bonded stake and stake still in flight
//! - **Lump-sum rewards**: claims cost one step per share change, not per block
//!
//! ## Architecture
//!
//! ```text
//!   DelegationAction::execute(ctx, world, config)
//!          │  clone snapshot
//!          ▼
//!   DelegationRepository ──── StateStore  (tagged records, bincode)
//!          │              └── AssetLedger (pools, transfers)
//!          ▼
//!   Delegator ──► Delegatee ──► Bond / UnbondLockIn / Redelegation /
//!                               RebondGrace / LumpSumRewardsRecord
//!          │
//!          ▼
//!   new snapshot (or error, input untouched)
//! ```

pub mod action;
pub mod address;
pub mod asset;
pub mod bond;
pub mod codec;
pub mod config;
pub mod delegatee;
pub mod delegator;
pub mod error;
pub mod lump_sum;
pub mod rebond_grace;
pub mod redelegation;
pub mod repository;
pub mod unbond_lock_in;
pub mod unbonding_set;
pub mod world;

pub use action::{ActionContext, DelegationAction};
pub use address::Address;
pub use asset::{AssetError, AssetValue, Currency, BPS_DENOMINATOR};
pub use bond::Bond;
pub use config::{DelegateeKind, DelegateeParams, LedgerConfig};
pub use delegatee::Delegatee;
pub use delegator::{release_due_unbondings, Delegator};
pub use error::{DelegationError, Result};
pub use lump_sum::LumpSumRewardsRecord;
pub use rebond_grace::{RebondGrace, RebondGraceEntry};
pub use redelegation::{Redelegation, RedelegationEntry};
pub use repository::DelegationRepository;
pub use unbond_lock_in::{UnbondLockIn, UnbondLockInEntry};
pub use unbonding_set::{UnbondingKind, UnbondingRef, UnbondingSet};
pub use world::{AssetLedger, InMemoryWorld, StateStore, World};
