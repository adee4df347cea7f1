//! Repository: typed access to ledger records in a world snapshot
//!
//! One repository is built per action, bound to the action's block index
//! and to one delegatee kind. Entities are loaded as owned values, mutated
//! in memory and written back with the matching `set_*` call; nothing is
//! cached here, so a record written once is what the next load returns.
//!
//! Storage layout (account = kind-specific namespace from [`Accounts`]):
//!
//! | record                 | account                   | address                        |
//! |------------------------|---------------------------|--------------------------------|
//! | Delegatee              | `delegatee`               | delegatee address              |
//! | Delegator              | `delegator`               | delegator address              |
//! | Bond                   | `bond`                    | `Bond::address_of`             |
//! | UnbondLockIn           | `unbond_lock_in`          | `UnbondLockIn::address_of`     |
//! | Redelegation           | `redelegation`            | `Redelegation::address_of`     |
//! | RebondGrace            | `rebond_grace`            | `RebondGrace::address_of`      |
//! | LumpSumRewardsRecord   | `lump_sum_rewards_record` | `(delegatee, index)` derived   |
//! | UnbondingSet           | `unbonding_set`           | fixed                          |

use crate::address::Address;
use crate::asset::{AssetValue, Currency};
use crate::bond::Bond;
use crate::codec::{decode, encode, Record};
use crate::config::{Accounts, DelegateeKind, DelegateeParams};
use crate::delegatee::Delegatee;
use crate::delegator::Delegator;
use crate::error::{DelegationError, Result};
use crate::lump_sum::LumpSumRewardsRecord;
use crate::rebond_grace::RebondGrace;
use crate::redelegation::Redelegation;
use crate::unbond_lock_in::UnbondLockIn;
use crate::unbonding_set::{UnbondingKind, UnbondingRef, UnbondingSet};
use crate::world::World;
use tracing::trace;

pub struct DelegationRepository<W: World> {
    world: W,
    block_index: u64,
    kind: DelegateeKind,
    accounts: Accounts,
    params: DelegateeParams,
}

impl<W: World> DelegationRepository<W> {
    /// Bind to `world` at `block_index`; `params` seed newly created delegatees
    pub fn new(world: W, block_index: u64, kind: DelegateeKind, params: DelegateeParams) -> Self {
        Self {
            world,
            block_index,
            kind,
            accounts: kind.accounts(),
            params,
        }
    }

    pub fn block_index(&self) -> u64 {
        self.block_index
    }

    pub fn kind(&self) -> DelegateeKind {
        self.kind
    }

    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    pub fn params(&self) -> &DelegateeParams {
        &self.params
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    /// Hand back the mutated snapshot
    pub fn into_world(self) -> W {
        self.world
    }

    fn load<R: Record>(
        &self,
        account: Address,
        address: Address,
        entity: &'static str,
    ) -> Result<Option<R>> {
        match self.world.get_state(&account, &address) {
            None => Ok(None),
            Some(bytes) => decode(&bytes)
                .map(Some)
                .map_err(|e| DelegationError::FailedLoadState {
                    entity,
                    address,
                    reason: e.to_string(),
                }),
        }
    }

    fn store<R: Record>(
        &mut self,
        account: Address,
        address: Address,
        record: &R,
        entity: &'static str,
    ) -> Result<()> {
        let bytes = encode(record).map_err(|source| DelegationError::Codec {
            entity,
            address,
            source,
        })?;
        trace!(entity, %address, len = bytes.len(), "store");
        self.world.set_state(account, address, bytes);
        Ok(())
    }

    fn erase(&mut self, account: Address, address: Address) {
        self.world.remove_state(&account, &address);
    }

    // -- delegatee --

    pub fn try_get_delegatee(&self, address: &Address) -> Result<Option<Delegatee>> {
        self.load(self.accounts.delegatee, *address, "delegatee")
    }

    /// Load a delegatee that must exist
    pub fn get_delegatee(&self, address: &Address) -> Result<Delegatee> {
        self.try_get_delegatee(address)?
            .ok_or_else(|| DelegationError::not_found("delegatee", *address))
    }

    /// Load a delegatee, or a fresh one seeded from the kind's parameters
    pub fn get_or_create_delegatee(&self, address: &Address) -> Result<Delegatee> {
        Ok(self
            .try_get_delegatee(address)?
            .unwrap_or_else(|| Delegatee::new(*address, self.kind, self.params.clone())))
    }

    pub fn set_delegatee(&mut self, delegatee: &Delegatee) -> Result<()> {
        self.store(
            self.accounts.delegatee,
            delegatee.address(),
            delegatee,
            "delegatee",
        )
    }

    pub fn remove_delegatee(&mut self, address: &Address) {
        self.erase(self.accounts.delegatee, *address);
    }

    // -- delegator --

    pub fn try_get_delegator(&self, address: &Address) -> Result<Option<Delegator>> {
        self.load(self.accounts.delegator, *address, "delegator")
    }

    pub fn get_delegator(&self, address: &Address) -> Result<Delegator> {
        self.try_get_delegator(address)?
            .ok_or_else(|| DelegationError::not_found("delegator", *address))
    }

    pub fn get_or_create_delegator(&self, address: &Address) -> Result<Delegator> {
        Ok(self
            .try_get_delegator(address)?
            .unwrap_or_else(|| Delegator::new(*address)))
    }

    pub fn set_delegator(&mut self, delegator: &Delegator) -> Result<()> {
        self.store(
            self.accounts.delegator,
            delegator.address(),
            delegator,
            "delegator",
        )
    }

    // -- bond --

    /// Bond of `delegator` at `delegatee`; zero shares if none is stored
    pub fn get_bond(&self, delegatee: &Delegatee, delegator: &Address) -> Result<Bond> {
        let address = Bond::address_of(&delegatee.address(), delegator);
        Ok(self
            .load(self.accounts.bond, address, "bond")?
            .unwrap_or_else(|| Bond::new(address, delegatee.share_currency().clone())))
    }

    /// Write a bond; a bond back at zero shares is deleted
    pub fn set_bond(&mut self, bond: &Bond) -> Result<()> {
        if bond.is_empty() {
            self.erase(self.accounts.bond, bond.address());
            Ok(())
        } else {
            self.store(self.accounts.bond, bond.address(), bond, "bond")
        }
    }

    // -- unbond lock-in --

    pub fn try_get_unbond_lock_in(
        &self,
        delegatee: &Address,
        delegator: &Address,
    ) -> Result<Option<UnbondLockIn>> {
        self.load(
            self.accounts.unbond_lock_in,
            UnbondLockIn::address_of(delegatee, delegator),
            "unbond lock-in",
        )
    }

    pub fn get_unbond_lock_in(
        &self,
        delegatee: &Delegatee,
        delegator: &Address,
    ) -> Result<UnbondLockIn> {
        Ok(self
            .try_get_unbond_lock_in(&delegatee.address(), delegator)?
            .unwrap_or_else(|| {
                UnbondLockIn::new(
                    delegatee.address(),
                    *delegator,
                    delegatee.share_currency().clone(),
                    delegatee.delegation_currency().clone(),
                    delegatee.params().max_unbond_lock_in_entries,
                )
            }))
    }

    /// Write the ledger (deleted when empty) and refresh its unbonding-set entry
    pub fn set_unbond_lock_in(&mut self, ledger: &UnbondLockIn) -> Result<()> {
        if ledger.is_empty() {
            self.erase(self.accounts.unbond_lock_in, ledger.address());
        } else {
            self.store(
                self.accounts.unbond_lock_in,
                ledger.address(),
                ledger,
                "unbond lock-in",
            )?;
        }
        self.refresh_unbonding(
            UnbondingRef::new(
                ledger.delegatee(),
                UnbondingKind::UnbondLockIn,
                ledger.delegator(),
            ),
            ledger.next_expiry(),
        )
    }

    // -- redelegation --

    pub fn try_get_redelegation(
        &self,
        source: &Address,
        delegator: &Address,
    ) -> Result<Option<Redelegation>> {
        self.load(
            self.accounts.redelegation,
            Redelegation::address_of(source, delegator),
            "redelegation",
        )
    }

    pub fn get_redelegation(&self, source: &Delegatee, delegator: &Address) -> Result<Redelegation> {
        Ok(self
            .try_get_redelegation(&source.address(), delegator)?
            .unwrap_or_else(|| {
                Redelegation::new(
                    source.address(),
                    *delegator,
                    source.params().max_redelegation_entries,
                )
            }))
    }

    /// Write the ledger and refresh its unbonding-set entry
    ///
    /// The record is kept when empty so entry ids stay unique per
    /// (source, delegator).
    pub fn set_redelegation(&mut self, ledger: &Redelegation) -> Result<()> {
        self.store(
            self.accounts.redelegation,
            ledger.address(),
            ledger,
            "redelegation",
        )?;
        self.refresh_unbonding(
            UnbondingRef::new(
                ledger.source(),
                UnbondingKind::Redelegation,
                ledger.delegator(),
            ),
            ledger.next_expiry(),
        )
    }

    // -- rebond grace --

    pub fn try_get_rebond_grace(
        &self,
        delegatee: &Address,
        delegator: &Address,
    ) -> Result<Option<RebondGrace>> {
        self.load(
            self.accounts.rebond_grace,
            RebondGrace::address_of(delegatee, delegator),
            "rebond grace",
        )
    }

    pub fn get_rebond_grace(&self, delegatee: &Delegatee, delegator: &Address) -> Result<RebondGrace> {
        Ok(self
            .try_get_rebond_grace(&delegatee.address(), delegator)?
            .unwrap_or_else(|| {
                RebondGrace::new(
                    delegatee.address(),
                    *delegator,
                    delegatee.delegation_currency().clone(),
                    delegatee.params().max_rebond_grace_entries,
                )
            }))
    }

    pub fn set_rebond_grace(&mut self, grace: &RebondGrace) -> Result<()> {
        if grace.is_empty() {
            self.erase(self.accounts.rebond_grace, grace.address());
        } else {
            self.store(
                self.accounts.rebond_grace,
                grace.address(),
                grace,
                "rebond grace",
            )?;
        }
        self.refresh_unbonding(
            UnbondingRef::new(
                grace.delegatee(),
                UnbondingKind::RebondGrace,
                grace.delegator(),
            ),
            grace.next_expiry(),
        )
    }

    // -- lump-sum reward records --

    pub fn try_get_lump_sum(
        &self,
        delegatee: &Address,
        index: u64,
    ) -> Result<Option<LumpSumRewardsRecord>> {
        self.load(
            self.accounts.lump_sum_rewards_record,
            LumpSumRewardsRecord::address_of(delegatee, index),
            "lump-sum rewards record",
        )
    }

    pub fn get_lump_sum(&self, delegatee: &Address, index: u64) -> Result<LumpSumRewardsRecord> {
        self.try_get_lump_sum(delegatee, index)?.ok_or_else(|| {
            DelegationError::not_found(
                "lump-sum rewards record",
                LumpSumRewardsRecord::address_of(delegatee, index),
            )
        })
    }

    pub fn set_lump_sum(&mut self, record: &LumpSumRewardsRecord) -> Result<()> {
        self.store(
            self.accounts.lump_sum_rewards_record,
            record.address(),
            record,
            "lump-sum rewards record",
        )
    }

    pub fn remove_lump_sum(&mut self, delegatee: &Address, index: u64) {
        self.erase(
            self.accounts.lump_sum_rewards_record,
            LumpSumRewardsRecord::address_of(delegatee, index),
        );
    }

    // -- unbonding set --

    pub fn get_unbonding_set(&self) -> Result<UnbondingSet> {
        Ok(self
            .load(
                self.accounts.unbonding_set,
                UnbondingSet::address(),
                "unbonding set",
            )?
            .unwrap_or_default())
    }

    pub fn set_unbonding_set(&mut self, set: &UnbondingSet) -> Result<()> {
        if set.is_empty() {
            self.erase(self.accounts.unbonding_set, UnbondingSet::address());
            Ok(())
        } else {
            self.store(
                self.accounts.unbonding_set,
                UnbondingSet::address(),
                set,
                "unbonding set",
            )
        }
    }

    fn refresh_unbonding(&mut self, r: UnbondingRef, next_expiry: Option<u64>) -> Result<()> {
        let mut set = self.get_unbonding_set()?;
        if set.expiry(&r) == next_expiry {
            return Ok(());
        }
        set.update(r, next_expiry);
        self.set_unbonding_set(&set)
    }

    // -- assets --

    pub fn balance(&self, owner: &Address, currency: &Currency) -> AssetValue {
        self.world.balance(owner, currency)
    }

    pub fn transfer(&mut self, from: &Address, to: &Address, value: &AssetValue) -> Result<()> {
        self.world.transfer(from, to, value)?;
        Ok(())
    }
}
