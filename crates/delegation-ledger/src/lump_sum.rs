//! Lump-sum reward records
//!
//! A delegatee's reward history is a chain of records indexed 0, 1, 2, ...
//! Each record covers a period during which the delegatee's total shares did
//! not change, so every reward that lands in it is split by one fixed
//! denominator:
//!
//! ```text
//! reward(delegator, record) = share * lump_sum / total_shares   (truncated)
//! ```
//!
//! Any change to total shares closes the current record and opens the next.
//! A claim walks records from the delegator's cursor to the latest one:
//! cost grows with the number of share changes since the last claim, never
//! with the number of blocks. Truncation remainders stay in the reward pool.

use crate::address::Address;
use crate::asset::{AssetValue, Currency};
use crate::codec::{CodecError, FieldReader, Record, Value};
use crate::error::{DelegationError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumpSumRewardsRecord {
    delegatee: Address,
    index: u64,
    start_height: u64,
    total_shares: AssetValue,
    /// One slot per reward currency, in the delegatee's reward currency order
    lump_sums: Vec<AssetValue>,
}

impl LumpSumRewardsRecord {
    pub fn address_of(delegatee: &Address, index: u64) -> Address {
        Address::derive(
            "lump_sum_rewards_record",
            &[delegatee.as_bytes(), &index.to_le_bytes()],
        )
    }

    pub fn new(
        delegatee: Address,
        index: u64,
        start_height: u64,
        total_shares: AssetValue,
        reward_currencies: &[Currency],
    ) -> Self {
        Self {
            delegatee,
            index,
            start_height,
            total_shares,
            lump_sums: reward_currencies.iter().map(Currency::zero).collect(),
        }
    }

    pub fn address(&self) -> Address {
        Self::address_of(&self.delegatee, self.index)
    }

    pub fn delegatee(&self) -> Address {
        self.delegatee
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn start_height(&self) -> u64 {
        self.start_height
    }

    pub fn total_shares(&self) -> &AssetValue {
        &self.total_shares
    }

    pub fn lump_sums(&self) -> &[AssetValue] {
        &self.lump_sums
    }

    /// No reward has landed in this record yet
    pub fn is_empty(&self) -> bool {
        self.lump_sums.iter().all(AssetValue::is_zero)
    }

    /// Restart an empty record with a new share total
    pub fn reset(&mut self, start_height: u64, total_shares: AssetValue) -> Result<()> {
        if !self.is_empty() {
            return Err(DelegationError::invalid_operation(
                "cannot reset a reward record that already holds rewards",
            ));
        }
        total_shares.ensure_currency(self.total_shares.currency())?;
        self.start_height = start_height;
        self.total_shares = total_shares;
        Ok(())
    }

    /// Add a reward; its currency must be one of the record's reward currencies
    pub fn add(&mut self, reward: &AssetValue) -> Result<()> {
        let slot = self
            .lump_sums
            .iter_mut()
            .find(|v| v.currency() == reward.currency())
            .ok_or_else(|| DelegationError::InvalidCurrency {
                expected: "reward currency".into(),
                actual: reward.currency().to_string(),
            })?;
        *slot = slot.checked_add(reward)?;
        Ok(())
    }

    /// Rewards owed to a holder of `share` for this record
    pub fn rewards_for(&self, share: &AssetValue) -> Result<Vec<AssetValue>> {
        share.ensure_currency(self.total_shares.currency())?;
        let total = self.total_shares.raw();
        if total == 0 {
            return Ok(self.lump_sums.iter().map(|v| v.currency().zero()).collect());
        }
        if share.raw() > total {
            return Err(DelegationError::NotEnoughShare {
                requested: share.to_string(),
                available: self.total_shares.to_string(),
            });
        }
        self.lump_sums
            .iter()
            .map(|lump| Ok(lump.mul_div(share.raw(), total)?))
            .collect()
    }
}

impl Record for LumpSumRewardsRecord {
    const TAG: &'static str = "lump_sum_rewards_record";

    fn to_fields(&self) -> Vec<Value> {
        vec![
            Value::from(&self.delegatee),
            Value::from(self.index),
            Value::from(self.start_height),
            Value::from(&self.total_shares),
            Value::List(self.lump_sums.iter().map(Value::from).collect()),
        ]
    }

    fn from_fields(fields: &mut FieldReader) -> Result<Self, CodecError> {
        let delegatee = fields.address("delegatee")?;
        let index = fields.u64("index")?;
        let start_height = fields.u64("start_height")?;
        let total_shares = fields.asset("total_shares")?;
        let lump_sums = fields.records("lump_sums", |item| {
            let currency = item.currency("currency")?;
            let raw = item.integer("raw")?;
            Ok(AssetValue::new(currency, raw))
        })?;
        Ok(Self {
            delegatee,
            index,
            start_height,
            total_shares,
            lump_sums,
        })
    }
}
