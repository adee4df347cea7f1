//! Redelegation ledger: in-flight moves of stake out of one source delegatee
//!
//! ```text
//! Requested ──► Matured    (expire <= now: entry dropped, stake stays at dst)
//!      │
//!      └──────► Cancelled  (before expiry: dst shares burned, tokens rebonded
//!                           at src, rebond grace opened at dst)
//! ```
//!
//! An entry records both share amounts so a cancellation knows how many
//! destination shares to burn and a slash at the source knows how much to
//! claw back from the destination.

use crate::address::Address;
use crate::asset::{AssetValue, Currency};
use crate::codec::{CodecError, FieldReader, Record, Value};
use crate::error::{DelegationError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedelegationEntry {
    id: u64,
    source: Address,
    destination: Address,
    redelegating_share: AssetValue,
    unbonding_token: AssetValue,
    issued_share: AssetValue,
    creation_height: u64,
    expire_height: u64,
}

impl RedelegationEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        source: Address,
        destination: Address,
        redelegating_share: AssetValue,
        unbonding_token: AssetValue,
        issued_share: AssetValue,
        creation_height: u64,
        expire_height: u64,
    ) -> Result<Self> {
        if source == destination {
            return Err(DelegationError::invalid_operation(
                "redelegation source and destination are the same",
            ));
        }
        let decimals = unbonding_token.currency().decimal_places;
        redelegating_share.ensure_currency(&Currency::share_of(source, decimals))?;
        issued_share.ensure_currency(&Currency::share_of(destination, decimals))?;
        Ok(Self {
            id,
            source,
            destination,
            redelegating_share,
            unbonding_token,
            issued_share,
            creation_height,
            expire_height,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn source(&self) -> Address {
        self.source
    }

    pub fn destination(&self) -> Address {
        self.destination
    }

    pub fn redelegating_share(&self) -> &AssetValue {
        &self.redelegating_share
    }

    /// Tokens moved, as estimated at request time (reduced by slashing)
    pub fn unbonding_token(&self) -> &AssetValue {
        &self.unbonding_token
    }

    /// Shares issued at the destination (reduced by clawbacks)
    pub fn issued_share(&self) -> &AssetValue {
        &self.issued_share
    }

    pub fn creation_height(&self) -> u64 {
        self.creation_height
    }

    pub fn expire_height(&self) -> u64 {
        self.expire_height
    }

    pub fn is_matured(&self, height: u64) -> bool {
        self.expire_height <= height
    }

    pub fn set_unbonding_token(&mut self, value: AssetValue) -> Result<()> {
        value.ensure_currency(self.unbonding_token.currency())?;
        self.unbonding_token = value;
        Ok(())
    }

    pub fn set_issued_share(&mut self, value: AssetValue) -> Result<()> {
        value.ensure_currency(self.issued_share.currency())?;
        self.issued_share = value;
        Ok(())
    }

    fn to_value(&self) -> Value {
        Value::List(self.to_fields())
    }

    fn from_reader(fields: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            id: fields.u64("id")?,
            source: fields.address("source")?,
            destination: fields.address("destination")?,
            redelegating_share: fields.asset("redelegating_share")?,
            unbonding_token: fields.asset("unbonding_token")?,
            issued_share: fields.asset("issued_share")?,
            creation_height: fields.u64("creation_height")?,
            expire_height: fields.u64("expire_height")?,
        })
    }
}

impl Record for RedelegationEntry {
    const TAG: &'static str = "redelegation_entry";

    fn to_fields(&self) -> Vec<Value> {
        vec![
            Value::from(self.id),
            Value::from(&self.source),
            Value::from(&self.destination),
            Value::from(&self.redelegating_share),
            Value::from(&self.unbonding_token),
            Value::from(&self.issued_share),
            Value::from(self.creation_height),
            Value::from(self.expire_height),
        ]
    }

    fn from_fields(fields: &mut FieldReader) -> Result<Self, CodecError> {
        Self::from_reader(fields)
    }
}

/// Pending redelegations of one delegator out of one source delegatee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redelegation {
    address: Address,
    source: Address,
    delegator: Address,
    max_entries: usize,
    next_id: u64,
    entries: Vec<RedelegationEntry>,
}

impl Redelegation {
    pub fn address_of(source: &Address, delegator: &Address) -> Address {
        Address::derive("redelegation", &[source.as_bytes(), delegator.as_bytes()])
    }

    pub fn new(source: Address, delegator: Address, max_entries: usize) -> Self {
        Self {
            address: Self::address_of(&source, &delegator),
            source,
            delegator,
            max_entries,
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn source(&self) -> Address {
        self.source
    }

    pub fn delegator(&self) -> Address {
        self.delegator
    }

    pub fn entries(&self) -> &[RedelegationEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut RedelegationEntry> {
        self.entries.iter_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_entries
    }

    pub fn next_expiry(&self) -> Option<u64> {
        self.entries.iter().map(|e| e.expire_height).min()
    }

    /// Id the next pushed entry must carry
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn push(&mut self, entry: RedelegationEntry) -> Result<()> {
        if self.is_full() {
            return Err(DelegationError::ExceedEntries {
                ledger: "redelegation",
                max: self.max_entries,
            });
        }
        if entry.source != self.source {
            return Err(DelegationError::invalid_operation(format!(
                "redelegation entry source {} does not match ledger source {}",
                entry.source, self.source
            )));
        }
        if entry.id != self.next_id {
            return Err(DelegationError::invalid_operation(format!(
                "redelegation entry id {} is not the next id {}",
                entry.id, self.next_id
            )));
        }
        self.next_id += 1;
        self.entries.push(entry);
        Ok(())
    }

    /// Drop matured entries; the stake they describe is final at the destination
    pub fn prune_matured(&mut self, height: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !e.is_matured(height));
        before - self.entries.len()
    }

    /// Remove and return a pending entry
    pub fn take(&mut self, id: u64) -> Option<RedelegationEntry> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos))
    }
}

impl Record for Redelegation {
    const TAG: &'static str = "redelegation";

    fn to_fields(&self) -> Vec<Value> {
        vec![
            Value::from(&self.source),
            Value::from(&self.delegator),
            Value::from(self.max_entries),
            Value::from(self.next_id),
            Value::List(self.entries.iter().map(|e| e.to_value()).collect()),
        ]
    }

    fn from_fields(fields: &mut FieldReader) -> Result<Self, CodecError> {
        let source = fields.address("source")?;
        let delegator = fields.address("delegator")?;
        let max_entries = fields.usize("max_entries")?;
        let next_id = fields.u64("next_id")?;
        let entries = fields.records("entries", RedelegationEntry::from_reader)?;
        Ok(Self {
            address: Self::address_of(&source, &delegator),
            source,
            delegator,
            max_entries,
            next_id,
            entries,
        })
    }
}
