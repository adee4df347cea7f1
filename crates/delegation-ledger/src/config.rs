//! Ledger configuration
//!
//! Validators and guilds share one delegation engine. What differs per kind
//! lives in [`DelegateeParams`] and in the account namespace the kind's
//! records are stored under.

use crate::address::Address;
use crate::asset::{Currency, BPS_DENOMINATOR};
use crate::error::{DelegationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Default unbonding period in blocks (~1 week at 8s blocks)
pub const DEFAULT_UNBONDING_PERIOD: u64 = 75_600;

/// Default rebond grace window in blocks
pub const DEFAULT_REBOND_GRACE_PERIOD: u64 = 10_800;

/// Default cap on simultaneous entries per (delegator, delegatee) ledger
pub const DEFAULT_MAX_ENTRIES: usize = 10;

/// Default validator commission (10%)
pub const DEFAULT_VALIDATOR_COMMISSION_BPS: u64 = 1_000;

/// Kind of delegatee
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegateeKind {
    Validator,
    Guild,
}

impl DelegateeKind {
    pub fn label(&self) -> &'static str {
        match self {
            DelegateeKind::Validator => "validator",
            DelegateeKind::Guild => "guild",
        }
    }

    /// Account namespaces for this kind's records
    pub fn accounts(&self) -> Accounts {
        let account =
            |name: &str| Address::derive("account", &[self.label().as_bytes(), name.as_bytes()]);
        Accounts {
            delegatee: account("delegatee"),
            delegator: account("delegator"),
            bond: account("bond"),
            unbond_lock_in: account("unbond_lock_in"),
            redelegation: account("redelegation"),
            rebond_grace: account("rebond_grace"),
            unbonding_set: account("unbonding_set"),
            lump_sum_rewards_record: account("lump_sum_rewards_record"),
            slashed_pool: account("slashed_pool"),
        }
    }
}

/// Account addresses owned by one delegatee kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accounts {
    pub delegatee: Address,
    pub delegator: Address,
    pub bond: Address,
    pub unbond_lock_in: Address,
    pub redelegation: Address,
    pub rebond_grace: Address,
    pub unbonding_set: Address,
    pub lump_sum_rewards_record: Address,
    /// Holder of slashed tokens (an asset owner, not a record account)
    pub slashed_pool: Address,
}

/// Per-kind delegatee parameters, copied into a delegatee when it is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateeParams {
    /// Token delegators bond
    pub delegation_currency: Currency,

    /// Currencies rewards may be paid in
    #[serde(default)]
    pub reward_currencies: Vec<Currency>,

    /// Blocks between unbonding request and release
    #[serde(default = "default_unbonding_period")]
    pub unbonding_period: u64,

    #[serde(default = "default_max_entries")]
    pub max_unbond_lock_in_entries: usize,

    #[serde(default = "default_max_entries")]
    pub max_redelegation_entries: usize,

    #[serde(default = "default_max_entries")]
    pub max_rebond_grace_entries: usize,

    /// Blocks a cancelled redelegation stays clawable
    #[serde(default = "default_rebond_grace_period")]
    pub rebond_grace_period: u64,

    /// Share of each reward kept by the delegatee itself (basis points)
    #[serde(default)]
    pub commission_bps: u64,
}

fn default_unbonding_period() -> u64 {
    DEFAULT_UNBONDING_PERIOD
}

fn default_rebond_grace_period() -> u64 {
    DEFAULT_REBOND_GRACE_PERIOD
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

impl DelegateeParams {
    pub fn validator(delegation_currency: Currency, reward_currencies: Vec<Currency>) -> Self {
        Self {
            delegation_currency,
            reward_currencies,
            unbonding_period: DEFAULT_UNBONDING_PERIOD,
            max_unbond_lock_in_entries: DEFAULT_MAX_ENTRIES,
            max_redelegation_entries: DEFAULT_MAX_ENTRIES,
            max_rebond_grace_entries: DEFAULT_MAX_ENTRIES,
            rebond_grace_period: DEFAULT_REBOND_GRACE_PERIOD,
            commission_bps: DEFAULT_VALIDATOR_COMMISSION_BPS,
        }
    }

    pub fn guild(delegation_currency: Currency, reward_currencies: Vec<Currency>) -> Self {
        Self {
            commission_bps: 0,
            ..Self::validator(delegation_currency, reward_currencies)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.commission_bps > BPS_DENOMINATOR {
            return Err(DelegationError::InvalidConfig(format!(
                "commission {} bps exceeds 100%",
                self.commission_bps
            )));
        }
        if self.max_unbond_lock_in_entries == 0
            || self.max_redelegation_entries == 0
            || self.max_rebond_grace_entries == 0
        {
            return Err(DelegationError::InvalidConfig(
                "entry limits must be positive".into(),
            ));
        }
        if self.reward_currencies.contains(&self.delegation_currency) {
            return Err(DelegationError::InvalidConfig(format!(
                "reward currencies must not include the delegation currency {}",
                self.delegation_currency
            )));
        }
        let distinct: BTreeSet<_> = self.reward_currencies.iter().collect();
        if distinct.len() != self.reward_currencies.len() {
            return Err(DelegationError::InvalidConfig(
                "duplicate reward currency".into(),
            ));
        }
        Ok(())
    }
}

/// Whole-ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub validator: DelegateeParams,
    pub guild: DelegateeParams,

    /// Signers allowed to run system operations (reward distribution,
    /// slashing, jailing, removal, end-of-block release)
    #[serde(default)]
    pub operators: BTreeSet<Address>,
}

impl LedgerConfig {
    pub fn default_for(delegation_currency: Currency, reward_currencies: Vec<Currency>) -> Self {
        Self {
            validator: DelegateeParams::validator(
                delegation_currency.clone(),
                reward_currencies.clone(),
            ),
            guild: DelegateeParams::guild(delegation_currency, reward_currencies),
            operators: BTreeSet::new(),
        }
    }

    pub fn with_operator(mut self, operator: Address) -> Self {
        self.operators.insert(operator);
        self
    }

    pub fn params(&self, kind: DelegateeKind) -> &DelegateeParams {
        match kind {
            DelegateeKind::Validator => &self.validator,
            DelegateeKind::Guild => &self.guild,
        }
    }

    pub fn params_mut(&mut self, kind: DelegateeKind) -> &mut DelegateeParams {
        match kind {
            DelegateeKind::Validator => &mut self.validator,
            DelegateeKind::Guild => &mut self.guild,
        }
    }

    pub fn is_operator(&self, signer: &Address) -> bool {
        self.operators.contains(signer)
    }

    pub fn validate(&self) -> Result<()> {
        self.validator.validate()?;
        self.guild.validate()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DelegationError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            DelegationError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }
}
