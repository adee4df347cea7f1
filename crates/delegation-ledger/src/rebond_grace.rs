//! Rebond grace: tokens that left a delegatee but stay slashable there
//!
//! When a redelegation is cancelled, its tokens leave the destination and are
//! rebonded at the source. For `rebond_grace_period` blocks the destination
//! can still be slashed for what happened while the tokens were bonded to
//! it; the entry remembers where the tokens went so the slash can claw them
//! back there.

use crate::address::Address;
use crate::asset::{AssetValue, Currency};
use crate::codec::{CodecError, FieldReader, Record, Value};
use crate::error::{DelegationError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebondGraceEntry {
    pub amount: AssetValue,
    /// Delegatee the tokens were rebonded to
    pub rebonded_to: Address,
    pub creation_height: u64,
    pub expire_height: u64,
}

impl RebondGraceEntry {
    pub fn is_expired(&self, height: u64) -> bool {
        self.expire_height <= height
    }

    fn to_value(&self) -> Value {
        Value::List(vec![
            Value::from(&self.amount),
            Value::from(&self.rebonded_to),
            Value::from(self.creation_height),
            Value::from(self.expire_height),
        ])
    }

    fn from_reader(fields: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            amount: fields.asset("amount")?,
            rebonded_to: fields.address("rebonded_to")?,
            creation_height: fields.u64("creation_height")?,
            expire_height: fields.u64("expire_height")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebondGrace {
    address: Address,
    delegatee: Address,
    delegator: Address,
    token_currency: Currency,
    max_entries: usize,
    entries: Vec<RebondGraceEntry>,
}

impl RebondGrace {
    pub fn address_of(delegatee: &Address, delegator: &Address) -> Address {
        Address::derive("rebond_grace", &[delegatee.as_bytes(), delegator.as_bytes()])
    }

    pub fn new(
        delegatee: Address,
        delegator: Address,
        token_currency: Currency,
        max_entries: usize,
    ) -> Self {
        Self {
            address: Self::address_of(&delegatee, &delegator),
            delegatee,
            delegator,
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

    pub fn entries(&self) -> &[RebondGraceEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut RebondGraceEntry> {
        self.entries.iter_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn next_expiry(&self) -> Option<u64> {
        self.entries.first().map(|e| e.expire_height)
    }

    pub fn total_amount(&self) -> AssetValue {
        let raw = self.entries.iter().map(|e| e.amount.raw()).sum();
        AssetValue::new(self.token_currency.clone(), raw)
    }

    /// Open a grace entry, or extend the one with the same target and expiry
    pub fn grace(
        &mut self,
        amount: AssetValue,
        rebonded_to: Address,
        creation_height: u64,
        expire_height: u64,
    ) -> Result<()> {
        amount.ensure_currency(&self.token_currency)?;

        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.rebonded_to == rebonded_to && e.expire_height == expire_height)
        {
            existing.amount = existing.amount.checked_add(&amount)?;
            return Ok(());
        }

        if self.entries.len() >= self.max_entries {
            return Err(DelegationError::ExceedEntries {
                ledger: "rebond grace",
                max: self.max_entries,
            });
        }

        let pos = self
            .entries
            .partition_point(|e| e.expire_height <= expire_height);
        self.entries.insert(
            pos,
            RebondGraceEntry {
                amount,
                rebonded_to,
                creation_height,
                expire_height,
            },
        );
        Ok(())
    }

    /// Drop expired entries and entries slashed down to zero
    pub fn prune_expired(&mut self, height: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| !e.is_expired(height) && !e.amount.is_zero());
        before - self.entries.len()
    }
}

impl Record for RebondGrace {
    const TAG: &'static str = "rebond_grace";

    fn to_fields(&self) -> Vec<Value> {
        vec![
            Value::from(&self.delegatee),
            Value::from(&self.delegator),
            Value::from(&self.token_currency),
            Value::from(self.max_entries),
            Value::List(self.entries.iter().map(|e| e.to_value()).collect()),
        ]
    }

    fn from_fields(fields: &mut FieldReader) -> Result<Self, CodecError> {
        let delegatee = fields.address("delegatee")?;
        let delegator = fields.address("delegator")?;
        let token_currency = fields.currency("token_currency")?;
        let max_entries = fields.usize("max_entries")?;
        let entries = fields.records("entries", RebondGraceEntry::from_reader)?;
        Ok(Self {
            address: Self::address_of(&delegatee, &delegator),
            delegatee,
            delegator,
            token_currency,
            max_entries,
            entries,
        })
    }
}
