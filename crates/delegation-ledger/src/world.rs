//! State store and asset capability interfaces
//!
//! The ledger never owns storage. It reads and writes through [`StateStore`]
//! (raw records under `(account, address)`) and moves tokens through
//! [`AssetLedger`]. A [`World`] is a cheap-to-clone snapshot: an action works
//! on its own copy and hands it back only on success, so a failed action
//! leaves the caller's snapshot untouched.
//!
//! [`InMemoryWorld`] backs tests and the replay tool.

use crate::address::Address;
use crate::asset::{AssetError, AssetValue, Currency};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Versioned key-value state, partitioned into accounts
pub trait StateStore {
    fn get_state(&self, account: &Address, address: &Address) -> Option<Vec<u8>>;

    fn set_state(&mut self, account: Address, address: Address, value: Vec<u8>);

    fn remove_state(&mut self, account: &Address, address: &Address);
}

/// Fungible asset balances
pub trait AssetLedger {
    fn balance(&self, owner: &Address, currency: &Currency) -> AssetValue;

    /// Move `value` from `from` to `to`; fails on insufficient balance
    fn transfer(&mut self, from: &Address, to: &Address, value: &AssetValue)
        -> Result<(), AssetError>;

    /// Create `value` at `to`; `signer` must be a minter of the currency
    fn mint(&mut self, signer: &Address, to: &Address, value: &AssetValue)
        -> Result<(), AssetError>;

    /// Destroy `value` held by `from`; `signer` must be a minter of the currency
    fn burn(&mut self, signer: &Address, from: &Address, value: &AssetValue)
        -> Result<(), AssetError>;
}

/// Snapshot the ledger executes against
pub trait World: StateStore + AssetLedger + Clone {}

impl<T: StateStore + AssetLedger + Clone> World for T {}

/// Ordered in-memory world
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryWorld {
    states: BTreeMap<Address, BTreeMap<Address, Vec<u8>>>,
    balances: BTreeMap<(Address, Currency), u128>,
}

impl InMemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit without minting authority (genesis allocation)
    pub fn with_balance(mut self, owner: Address, value: &AssetValue) -> Self {
        *self
            .balances
            .entry((owner, value.currency().clone()))
            .or_insert(0) += value.raw();
        self
    }

    /// Number of records stored under `account`
    pub fn record_count(&self, account: &Address) -> usize {
        self.states.get(account).map_or(0, |m| m.len())
    }

    /// Commitment to the whole snapshot
    ///
    /// Iteration is over ordered maps, so equal snapshots hash equally.
    pub fn state_root(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for (account, records) in &self.states {
            hasher.update(account.as_bytes());
            for (address, value) in records {
                hasher.update(address.as_bytes());
                hasher.update((value.len() as u64).to_le_bytes());
                hasher.update(value);
            }
        }
        for ((owner, currency), raw) in &self.balances {
            hasher.update(owner.as_bytes());
            hasher.update(currency.id().as_bytes());
            hasher.update(raw.to_le_bytes());
        }
        hasher.finalize().into()
    }

    fn credit(&mut self, owner: &Address, value: &AssetValue) -> Result<(), AssetError> {
        let slot = self
            .balances
            .entry((*owner, value.currency().clone()))
            .or_insert(0);
        *slot = slot.checked_add(value.raw()).ok_or(AssetError::Overflow)?;
        Ok(())
    }

    fn debit(&mut self, owner: &Address, value: &AssetValue) -> Result<(), AssetError> {
        let key = (*owner, value.currency().clone());
        let balance = self.balances.get(&key).copied().unwrap_or(0);
        if balance < value.raw() {
            return Err(AssetError::InsufficientBalance {
                address: *owner,
                balance: AssetValue::new(value.currency().clone(), balance).to_string(),
                requested: value.to_string(),
            });
        }
        let remaining = balance - value.raw();
        if remaining == 0 {
            self.balances.remove(&key);
        } else {
            self.balances.insert(key, remaining);
        }
        Ok(())
    }
}

impl StateStore for InMemoryWorld {
    fn get_state(&self, account: &Address, address: &Address) -> Option<Vec<u8>> {
        self.states.get(account)?.get(address).cloned()
    }

    fn set_state(&mut self, account: Address, address: Address, value: Vec<u8>) {
        self.states.entry(account).or_default().insert(address, value);
    }

    fn remove_state(&mut self, account: &Address, address: &Address) {
        if let Some(records) = self.states.get_mut(account) {
            records.remove(address);
            if records.is_empty() {
                self.states.remove(account);
            }
        }
    }
}

impl AssetLedger for InMemoryWorld {
    fn balance(&self, owner: &Address, currency: &Currency) -> AssetValue {
        let raw = self
            .balances
            .get(&(*owner, currency.clone()))
            .copied()
            .unwrap_or(0);
        AssetValue::new(currency.clone(), raw)
    }

    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        value: &AssetValue,
    ) -> Result<(), AssetError> {
        if value.is_zero() || from == to {
            return Ok(());
        }
        self.debit(from, value)?;
        self.credit(to, value)
    }

    fn mint(
        &mut self,
        signer: &Address,
        to: &Address,
        value: &AssetValue,
    ) -> Result<(), AssetError> {
        if !value.currency().can_mint(signer) {
            return Err(AssetError::NoMintingAuthority {
                signer: *signer,
                currency: value.currency().to_string(),
            });
        }
        self.credit(to, value)
    }

    fn burn(
        &mut self,
        signer: &Address,
        from: &Address,
        value: &AssetValue,
    ) -> Result<(), AssetError> {
        if !value.currency().can_mint(signer) {
            return Err(AssetError::NoMintingAuthority {
                signer: *signer,
                currency: value.currency().to_string(),
            });
        }
        self.debit(from, value)
    }
}
