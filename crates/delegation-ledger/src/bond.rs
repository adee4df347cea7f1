//! Bond: a delegator's share balance at one delegatee

use crate::address::Address;
use crate::asset::{AssetValue, Currency};
use crate::codec::{CodecError, FieldReader, Record, Value};
use crate::error::{DelegationError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bond {
    address: Address,
    share: AssetValue,
    /// Reward record index this bond has been paid up to
    last_reward_index: Option<u64>,
}

impl Bond {
    /// Derived address of the bond of `delegator` at `delegatee`
    pub fn address_of(delegatee: &Address, delegator: &Address) -> Address {
        Address::derive("bond", &[delegatee.as_bytes(), delegator.as_bytes()])
    }

    /// Empty bond
    pub fn new(address: Address, share_currency: Currency) -> Self {
        Self {
            address,
            share: AssetValue::zero(share_currency),
            last_reward_index: None,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn share(&self) -> &AssetValue {
        &self.share
    }

    pub fn last_reward_index(&self) -> Option<u64> {
        self.last_reward_index
    }

    pub fn is_empty(&self) -> bool {
        self.share.is_zero()
    }

    /// Replace the share amount; the currency must match the bond's
    pub fn set_share(&mut self, share: AssetValue) -> Result<()> {
        share.ensure_currency(self.share.currency())?;
        self.share = share;
        Ok(())
    }

    pub fn add_share(&mut self, share: &AssetValue) -> Result<()> {
        self.share = self.share.checked_add(share)?;
        Ok(())
    }

    pub fn sub_share(&mut self, share: &AssetValue) -> Result<()> {
        share.ensure_currency(self.share.currency())?;
        if share.raw() > self.share.raw() {
            return Err(DelegationError::NotEnoughShare {
                requested: share.to_string(),
                available: self.share.to_string(),
            });
        }
        self.share = self.share.checked_sub(share)?;
        Ok(())
    }

    pub fn set_last_reward_index(&mut self, index: u64) {
        self.last_reward_index = Some(index);
    }
}

impl Record for Bond {
    const TAG: &'static str = "bond";

    fn to_fields(&self) -> Vec<Value> {
        vec![
            Value::from(&self.address),
            Value::from(&self.share),
            self.last_reward_index.map(Value::from).unwrap_or(Value::Null),
        ]
    }

    fn from_fields(fields: &mut FieldReader) -> Result<Self, CodecError> {
        let address = fields.address("address")?;
        let share = fields.asset("share")?;
        let last_reward_index = fields.optional_u64("last_reward_index")?;
        Ok(Self {
            address,
            share,
            last_reward_index,
        })
    }
}
