//! UnbondLockIn: time-locked pending withdrawals of one (delegator, delegatee)
//!
//! ## Entry lifecycle
//!
//! ```text
//! Pending (expire > now) ──► Matured (expire <= now) ──► Released (removed,
//!                                                         tokens transferred)
//! ```
//!
//! Entries are kept sorted by expire height. Because every entry expires at
//! `creation + unbonding_period` and creation heights never decrease, this
//! is also insertion order.

use crate::address::Address;
use crate::asset::{AssetValue, Currency};
use crate::codec::{CodecError, FieldReader, Record, Value};
use crate::error::{DelegationError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnbondLockInEntry {
    /// Shares redeemed to create this entry
    pub share: AssetValue,
    /// Tokens released at maturity (reduced by slashing)
    pub amount: AssetValue,
    pub creation_height: u64,
    pub expire_height: u64,
}

impl UnbondLockInEntry {
    pub fn is_matured(&self, height: u64) -> bool {
        self.expire_height <= height
    }

    fn to_value(&self) -> Value {
        Value::List(vec![
            Value::from(&self.share),
            Value::from(&self.amount),
            Value::from(self.creation_height),
            Value::from(self.expire_height),
        ])
    }

    fn from_reader(fields: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            share: fields.asset("share")?,
            amount: fields.asset("amount")?,
            creation_height: fields.u64("creation_height")?,
            expire_height: fields.u64("expire_height")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnbondLockIn {
    address: Address,
    delegatee: Address,
    delegator: Address,
    share_currency: Currency,
    token_currency: Currency,
    max_entries: usize,
    entries: Vec<UnbondLockInEntry>,
}

impl UnbondLockIn {
    pub fn address_of(delegatee: &Address, delegator: &Address) -> Address {
        Address::derive("unbond_lock_in", &[delegatee.as_bytes(), delegator.as_bytes()])
    }

    pub fn new(
        delegatee: Address,
        delegator: Address,
        share_currency: Currency,
        token_currency: Currency,
        max_entries: usize,
    ) -> Self {
        Self {
            address: Self::address_of(&delegatee, &delegator),
            delegatee,
            delegator,
            share_currency,
            token_currency,
            max_entries,
            entries: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn delegatee(&self) -> Address {
        self.delegatee
    }

    pub fn delegator(&self) -> Address {
        self.delegator
    }

    pub fn entries(&self) -> &[UnbondLockInEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_entries
    }

    /// Earliest expire height among pending entries
    pub fn next_expiry(&self) -> Option<u64> {
        self.entries.first().map(|e| e.expire_height)
    }

    /// Sum of tokens still locked
    pub fn total_amount(&self) -> AssetValue {
        let raw = self.entries.iter().map(|e| e.amount.raw()).sum();
        AssetValue::new(self.token_currency.clone(), raw)
    }

    /// Queue a new entry
    pub fn lock(
        &mut self,
        share: AssetValue,
        amount: AssetValue,
        creation_height: u64,
        expire_height: u64,
    ) -> Result<()> {
        share.ensure_currency(&self.share_currency)?;
        amount.ensure_currency(&self.token_currency)?;
        if self.is_full() {
            return Err(DelegationError::ExceedEntries {
                ledger: "unbond lock-in",
                max: self.max_entries,
            });
        }
        if expire_height < creation_height {
            return Err(DelegationError::invalid_operation(
                "unbond lock-in cannot expire before it is created",
            ));
        }

        let entry = UnbondLockInEntry {
            share,
            amount,
            creation_height,
            expire_height,
        };
        let pos = self
            .entries
            .partition_point(|e| e.expire_height <= expire_height);
        self.entries.insert(pos, entry);
        Ok(())
    }

    /// Remove every matured entry, returning the tokens they held
    ///
    /// Entries are taken in ascending expire order. Calling this twice at the
    /// same height releases nothing the second time.
    pub fn release(&mut self, height: u64) -> AssetValue {
        let matured = self.entries.partition_point(|e| e.is_matured(height));
        let released: u128 = self.entries.drain(..matured).map(|e| e.amount.raw()).sum();
        AssetValue::new(self.token_currency.clone(), released)
    }

    /// Cut every pending entry by `penalty_bps`, returning the total cut
    ///
    /// Matured entries are already owed to the delegator and are left alone.
    pub fn slash(&mut self, penalty_bps: u64, height: u64) -> Result<AssetValue> {
        let mut total: u128 = 0;
        for entry in self.entries.iter_mut().filter(|e| !e.is_matured(height)) {
            let cut = entry.amount.bps(penalty_bps)?;
            entry.amount = entry.amount.checked_sub(&cut)?;
            total += cut.raw();
        }
        self.entries.retain(|e| !e.amount.is_zero());
        Ok(AssetValue::new(self.token_currency.clone(), total))
    }

    /// Take up to `amount` from pending entries, newest first
    ///
    /// Returns what was taken; it falls short only when the pending entries
    /// hold less than `amount`.
    pub fn seize(&mut self, amount: &AssetValue, height: u64) -> Result<AssetValue> {
        amount.ensure_currency(&self.token_currency)?;
        let mut left = amount.raw();
        for entry in self
            .entries
            .iter_mut()
            .rev()
            .filter(|e| !e.is_matured(height))
        {
            if left == 0 {
                break;
            }
            let cut = entry.amount.raw().min(left);
            entry.amount = AssetValue::new(self.token_currency.clone(), entry.amount.raw() - cut);
            left -= cut;
        }
        self.entries.retain(|e| !e.amount.is_zero());
        Ok(AssetValue::new(self.token_currency.clone(), amount.raw() - left))
    }
}

impl Record for UnbondLockIn {
    const TAG: &'static str = "unbond_lock_in";

    fn to_fields(&self) -> Vec<Value> {
        vec![
            Value::from(&self.delegatee),
            Value::from(&self.delegator),
            Value::from(&self.share_currency),
            Value::from(&self.token_currency),
            Value::from(self.max_entries),
            Value::List(self.entries.iter().map(|e| e.to_value()).collect()),
        ]
    }

    fn from_fields(fields: &mut FieldReader) -> Result<Self, CodecError> {
        let delegatee = fields.address("delegatee")?;
        let delegator = fields.address("delegator")?;
        let share_currency = fields.currency("share_currency")?;
        let token_currency = fields.currency("token_currency")?;
        let max_entries = fields.usize("max_entries")?;
        let entries = fields.records("entries", UnbondLockInEntry::from_reader)?;
        Ok(Self {
            address: Self::address_of(&delegatee, &delegator),
            delegatee,
            delegator,
            share_currency,
            token_currency,
            max_entries,
            entries,
        })
    }
}
