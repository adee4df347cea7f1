//! Delegatee: bonded-token pool that issues and redeems shares
//!
//! ## Exchange rate
//!
//! ```text
//! shares = tokens * total_shares / total_delegated    (tokens when no shares exist)
//! tokens = shares * total_delegated / total_shares
//! ```
//!
//! Both directions truncate, so the tokens-per-share rate never falls
//! through bonding or unbonding; only a slash lowers it.
//!
//! ## Token custody
//!
//! Bonded tokens and pending unbondings sit in the delegation pool
//! (`delegatee/delegation_pool`). Rewards sit in the reward pool
//! (`delegatee/reward_pool`) until claimed. Slashed tokens move to the
//! kind's slashed pool.
//!
//! ## Rewards
//!
//! Every change of one delegator's shares first pays that delegator's
//! pending rewards, then opens a new reward period with the new share
//! total (see [`crate::lump_sum`]).

use crate::address::Address;
use crate::asset::{mul_div, AssetError, AssetValue, Currency, BPS_DENOMINATOR};
use crate::bond::Bond;
use crate::codec::{CodecError, FieldReader, Record, Value};
use crate::config::{DelegateeKind, DelegateeParams};
use crate::error::{DelegationError, Result};
use crate::lump_sum::LumpSumRewardsRecord;
use crate::redelegation::{Redelegation, RedelegationEntry};
use crate::repository::DelegationRepository;
use crate::unbond_lock_in::UnbondLockInEntry;
use crate::unbonding_set::UnbondingKind;
use crate::world::World;
use std::collections::BTreeSet;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegatee {
    address: Address,
    kind: DelegateeKind,
    params: DelegateeParams,
    total_delegated: AssetValue,
    total_shares: AssetValue,
    latest_reward_index: u64,
    jailed: bool,
    delegators: BTreeSet<Address>,
}

impl Delegatee {
    pub fn new(address: Address, kind: DelegateeKind, params: DelegateeParams) -> Self {
        let share_currency =
            Currency::share_of(address, params.delegation_currency.decimal_places);
        Self {
            address,
            kind,
            total_delegated: params.delegation_currency.zero(),
            total_shares: share_currency.zero(),
            params,
            latest_reward_index: 0,
            jailed: false,
            delegators: BTreeSet::new(),
        }
    }

    /// Holder of bonded and unbonding tokens
    pub fn delegation_pool_of(delegatee: &Address) -> Address {
        delegatee.derive_child("delegation_pool")
    }

    /// Holder of undistributed rewards
    pub fn reward_pool_of(delegatee: &Address) -> Address {
        delegatee.derive_child("reward_pool")
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn kind(&self) -> DelegateeKind {
        self.kind
    }

    pub fn params(&self) -> &DelegateeParams {
        &self.params
    }

    pub fn delegation_currency(&self) -> &Currency {
        &self.params.delegation_currency
    }

    pub fn share_currency(&self) -> &Currency {
        self.total_shares.currency()
    }

    pub fn reward_currencies(&self) -> &[Currency] {
        &self.params.reward_currencies
    }

    pub fn delegation_pool(&self) -> Address {
        Self::delegation_pool_of(&self.address)
    }

    pub fn reward_pool(&self) -> Address {
        Self::reward_pool_of(&self.address)
    }

    pub fn total_delegated(&self) -> &AssetValue {
        &self.total_delegated
    }

    pub fn total_shares(&self) -> &AssetValue {
        &self.total_shares
    }

    pub fn latest_reward_index(&self) -> u64 {
        self.latest_reward_index
    }

    pub fn is_jailed(&self) -> bool {
        self.jailed
    }

    pub fn set_jailed(&mut self, jailed: bool) {
        self.jailed = jailed;
    }

    /// Delegators currently holding shares
    pub fn delegators(&self) -> &BTreeSet<Address> {
        &self.delegators
    }

    pub fn set_total_delegated(&mut self, value: AssetValue) -> Result<()> {
        value.ensure_currency(self.delegation_currency())?;
        self.total_delegated = value;
        Ok(())
    }

    pub fn set_total_shares(&mut self, value: AssetValue) -> Result<()> {
        value.ensure_currency(self.share_currency())?;
        self.total_shares = value;
        Ok(())
    }

    /// Reject new bonds while jailed
    pub fn ensure_bondable(&self) -> Result<()> {
        if self.jailed {
            return Err(DelegationError::invalid_operation(format!(
                "delegatee {} is jailed",
                self.address
            )));
        }
        Ok(())
    }

    /// Shares `tokens` would buy at the current rate
    pub fn shares_for_tokens(&self, tokens: &AssetValue) -> Result<AssetValue> {
        tokens.ensure_currency(self.delegation_currency())?;
        if self.total_shares.is_zero() {
            return Ok(self.share_currency().value(tokens.raw()));
        }
        if self.total_delegated.is_zero() {
            return Err(DelegationError::invalid_operation(format!(
                "delegatee {} has shares but no bonded tokens",
                self.address
            )));
        }
        let raw = mul_div(
            tokens.raw(),
            self.total_shares.raw(),
            self.total_delegated.raw(),
        )
        .ok_or(AssetError::Overflow)?;
        Ok(self.share_currency().value(raw))
    }

    /// Tokens `shares` redeem for at the current rate
    pub fn tokens_for_shares(&self, shares: &AssetValue) -> Result<AssetValue> {
        shares.ensure_currency(self.share_currency())?;
        if shares.raw() > self.total_shares.raw() {
            return Err(DelegationError::NotEnoughShare {
                requested: shares.to_string(),
                available: self.total_shares.to_string(),
            });
        }
        if self.total_shares.is_zero() {
            return Ok(self.delegation_currency().zero());
        }
        Ok(self
            .total_delegated
            .mul_div(shares.raw(), self.total_shares.raw())?)
    }

    fn issue(&mut self, tokens: &AssetValue) -> Result<AssetValue> {
        let shares = self.shares_for_tokens(tokens)?;
        if shares.is_zero() {
            return Err(DelegationError::invalid_operation(format!(
                "{} buys no shares of {}",
                tokens, self.address
            )));
        }
        self.total_delegated = self.total_delegated.checked_add(tokens)?;
        self.total_shares = self.total_shares.checked_add(&shares)?;
        Ok(shares)
    }

    fn redeem(&mut self, shares: &AssetValue) -> Result<AssetValue> {
        let tokens = self.tokens_for_shares(shares)?;
        self.total_shares = self.total_shares.checked_sub(shares)?;
        self.total_delegated = self.total_delegated.checked_sub(&tokens)?;
        Ok(tokens)
    }

    /// Apply a share change to one delegator's bond
    ///
    /// Pays the delegator's pending rewards, runs `change`, opens a new reward
    /// period, then writes the bond, this delegatee and the delegator's
    /// delegatee set. Returns the rewards paid alongside `change`'s output.
    fn change_bond<W: World, T>(
        &mut self,
        repo: &mut DelegationRepository<W>,
        delegator: &Address,
        change: impl FnOnce(&mut Self, &mut Bond) -> Result<T>,
    ) -> Result<(Vec<AssetValue>, T)> {
        let mut bond = repo.get_bond(self, delegator)?;
        let rewards = self.pay_rewards(repo, &bond, delegator)?;

        let out = change(self, &mut bond)?;

        self.start_new_reward_period(repo)?;
        let bonded = !bond.is_empty();
        if bonded {
            bond.set_last_reward_index(self.latest_reward_index);
            self.delegators.insert(*delegator);
        } else {
            self.delegators.remove(delegator);
        }
        repo.set_bond(&bond)?;
        repo.set_delegatee(self)?;

        if let Some(mut record) = repo.try_get_delegator(delegator)? {
            record.track(self.address, bonded);
            repo.set_delegator(&record)?;
        }
        Ok((rewards, out))
    }

    /// Issue shares for `tokens` already moved into the delegation pool
    pub fn bond<W: World>(
        &mut self,
        repo: &mut DelegationRepository<W>,
        delegator: &Address,
        tokens: &AssetValue,
    ) -> Result<AssetValue> {
        self.ensure_bondable()?;
        tokens.ensure_currency(self.delegation_currency())?;

        let (_, shares) = self.change_bond(repo, delegator, |this, bond| {
            let shares = this.issue(tokens)?;
            bond.add_share(&shares)?;
            Ok(shares)
        })?;

        debug!(delegatee = %self.address, %delegator, %tokens, %shares, "bond");
        Ok(shares)
    }

    /// Redeem shares without queueing the tokens anywhere
    ///
    /// The tokens stay in the delegation pool; the caller decides where they go.
    pub fn withdraw<W: World>(
        &mut self,
        repo: &mut DelegationRepository<W>,
        delegator: &Address,
        shares: &AssetValue,
    ) -> Result<AssetValue> {
        shares.ensure_currency(self.share_currency())?;
        if shares.is_zero() {
            return Err(DelegationError::invalid_operation("cannot redeem zero shares"));
        }
        let (_, tokens) = self.change_bond(repo, delegator, |this, bond| {
            bond.sub_share(shares)?;
            this.redeem(shares)
        })?;
        Ok(tokens)
    }

    /// Redeem shares into a new unbond lock-in entry
    pub fn unbond<W: World>(
        &mut self,
        repo: &mut DelegationRepository<W>,
        delegator: &Address,
        shares: &AssetValue,
    ) -> Result<UnbondLockInEntry> {
        let height = repo.block_index();
        let mut ledger = repo.get_unbond_lock_in(self, delegator)?;
        if ledger.is_full() {
            return Err(DelegationError::ExceedEntries {
                ledger: "unbond lock-in",
                max: self.params.max_unbond_lock_in_entries,
            });
        }

        let expire_height = expiry(height, self.params.unbonding_period)?;

        let tokens = self.withdraw(repo, delegator, shares)?;
        let entry = UnbondLockInEntry {
            share: shares.clone(),
            amount: tokens,
            creation_height: height,
            expire_height,
        };
        ledger.lock(
            entry.share.clone(),
            entry.amount.clone(),
            entry.creation_height,
            entry.expire_height,
        )?;
        repo.set_unbond_lock_in(&ledger)?;

        debug!(
            delegatee = %self.address,
            %delegator,
            shares = %entry.share,
            tokens = %entry.amount,
            expire = entry.expire_height,
            "unbond"
        );
        Ok(entry)
    }

    /// Move `shares` worth of stake from this delegatee to `destination`
    pub fn redelegate<W: World>(
        &mut self,
        repo: &mut DelegationRepository<W>,
        delegator: &Address,
        destination: &mut Delegatee,
        shares: &AssetValue,
    ) -> Result<RedelegationEntry> {
        if destination.address == self.address {
            return Err(DelegationError::invalid_operation(
                "cannot redelegate to the same delegatee",
            ));
        }
        destination.ensure_bondable()?;

        let height = repo.block_index();
        let mut ledger = repo.get_redelegation(self, delegator)?;
        if ledger.is_full() {
            return Err(DelegationError::ExceedEntries {
                ledger: "redelegation",
                max: self.params.max_redelegation_entries,
            });
        }

        let expire_height = expiry(height, self.params.unbonding_period)?;

        let tokens = self.withdraw(repo, delegator, shares)?;
        repo.transfer(&self.delegation_pool(), &destination.delegation_pool(), &tokens)?;
        let issued = destination.bond(repo, delegator, &tokens)?;

        let entry = RedelegationEntry::new(
            ledger.next_id(),
            self.address,
            destination.address,
            shares.clone(),
            tokens,
            issued,
            height,
            expire_height,
        )?;
        ledger.push(entry.clone())?;
        repo.set_redelegation(&ledger)?;

        debug!(
            source = %self.address,
            destination = %destination.address,
            %delegator,
            id = entry.id(),
            tokens = %entry.unbonding_token(),
            "redelegate"
        );
        Ok(entry)
    }

    /// Roll back a pending redelegation out of this delegatee
    ///
    /// Burns the shares the redelegation issued at `destination` (or what is
    /// left of them), rebonds their tokens here and opens a rebond grace
    /// entry at `destination`. Returns the rebonded tokens.
    pub fn cancel_redelegation<W: World>(
        &mut self,
        repo: &mut DelegationRepository<W>,
        delegator: &Address,
        destination: &mut Delegatee,
        id: u64,
    ) -> Result<AssetValue> {
        self.ensure_bondable()?;
        let height = repo.block_index();

        let mut ledger = repo
            .try_get_redelegation(&self.address, delegator)?
            .ok_or_else(|| {
                DelegationError::not_found(
                    "redelegation",
                    Redelegation::address_of(&self.address, delegator),
                )
            })?;
        let entry = ledger.take(id).ok_or_else(|| {
            DelegationError::invalid_operation(format!("no pending redelegation {}", id))
        })?;
        if entry.destination() != destination.address {
            return Err(DelegationError::invalid_operation(format!(
                "redelegation {} went to {}, not {}",
                id,
                entry.destination(),
                destination.address
            )));
        }
        if entry.is_matured(height) {
            return Err(DelegationError::invalid_operation(format!(
                "redelegation {} matured at {}",
                id,
                entry.expire_height()
            )));
        }

        let grace_expiry = expiry(height, destination.params.rebond_grace_period)?;
        let bond = repo.get_bond(destination, delegator)?;
        let shares = entry.issued_share().min(bond.share())?;
        if shares.is_zero() {
            return Err(DelegationError::invalid_operation(format!(
                "redelegation {} has no shares left at {}",
                id, destination.address
            )));
        }

        let tokens = destination.withdraw(repo, delegator, &shares)?;
        repo.transfer(&destination.delegation_pool(), &self.delegation_pool(), &tokens)?;
        self.bond(repo, delegator, &tokens)?;

        let mut grace = repo.get_rebond_grace(destination, delegator)?;
        grace.grace(
            tokens.clone(),
            self.address,
            height,
            grace_expiry,
        )?;
        repo.set_rebond_grace(&grace)?;
        repo.set_redelegation(&ledger)?;

        debug!(
            source = %self.address,
            destination = %destination.address,
            %delegator,
            id,
            %tokens,
            "cancel redelegation"
        );
        Ok(tokens)
    }

    /// Split a reward between commission and the reward pool
    ///
    /// `source` pays. The commission goes to the delegatee's own address; the
    /// rest lands in the current reward record.
    pub fn distribute_reward<W: World>(
        &mut self,
        repo: &mut DelegationRepository<W>,
        source: &Address,
        reward: &AssetValue,
    ) -> Result<()> {
        if !self.reward_currencies().contains(reward.currency()) {
            return Err(DelegationError::InvalidCurrency {
                expected: "reward currency".into(),
                actual: reward.currency().to_string(),
            });
        }
        if self.total_shares.is_zero() {
            return Err(DelegationError::invalid_operation(format!(
                "delegatee {} has no shares to reward",
                self.address
            )));
        }

        let commission = reward.bps(self.params.commission_bps)?;
        let pooled = reward.checked_sub(&commission)?;
        repo.transfer(source, &self.address, &commission)?;
        repo.transfer(source, &self.reward_pool(), &pooled)?;

        let mut record = repo.get_lump_sum(&self.address, self.latest_reward_index)?;
        record.add(&pooled)?;
        repo.set_lump_sum(&record)?;

        info!(
            delegatee = %self.address,
            %reward,
            %commission,
            index = self.latest_reward_index,
            "distribute reward"
        );
        Ok(())
    }

    /// Pay out a delegator's pending rewards
    pub fn claim_reward<W: World>(
        &mut self,
        repo: &mut DelegationRepository<W>,
        delegator: &Address,
    ) -> Result<Vec<AssetValue>> {
        let bond = repo.get_bond(self, delegator)?;
        if bond.is_empty() {
            return Ok(self.reward_currencies().iter().map(Currency::zero).collect());
        }
        let (rewards, ()) = self.change_bond(repo, delegator, |_, _| Ok(()))?;
        debug!(delegatee = %self.address, %delegator, ?rewards, "claim reward");
        Ok(rewards)
    }

    /// Rewards owed to `bond` from its cursor through the latest record
    pub fn pending_rewards<W: World>(
        &self,
        repo: &DelegationRepository<W>,
        bond: &Bond,
    ) -> Result<Vec<AssetValue>> {
        let mut totals: Vec<AssetValue> =
            self.reward_currencies().iter().map(Currency::zero).collect();
        let cursor = match bond.last_reward_index() {
            Some(cursor) if !bond.is_empty() => cursor,
            _ => return Ok(totals),
        };

        for index in cursor..=self.latest_reward_index {
            let record = repo.get_lump_sum(&self.address, index)?;
            for (total, reward) in totals.iter_mut().zip(record.rewards_for(bond.share())?) {
                *total = total.checked_add(&reward)?;
            }
        }
        Ok(totals)
    }

    fn pay_rewards<W: World>(
        &self,
        repo: &mut DelegationRepository<W>,
        bond: &Bond,
        recipient: &Address,
    ) -> Result<Vec<AssetValue>> {
        let rewards = self.pending_rewards(repo, bond)?;
        for reward in rewards.iter().filter(|r| !r.is_zero()) {
            repo.transfer(&self.reward_pool(), recipient, reward)?;
        }
        Ok(rewards)
    }

    /// Close the current reward record and open one for the current share total
    ///
    /// An empty current record is reused instead of closed.
    pub fn start_new_reward_period<W: World>(
        &mut self,
        repo: &mut DelegationRepository<W>,
    ) -> Result<()> {
        let height = repo.block_index();
        let record = match repo.try_get_lump_sum(&self.address, self.latest_reward_index)? {
            Some(mut current) if current.is_empty() => {
                current.reset(height, self.total_shares.clone())?;
                current
            }
            Some(_) => {
                self.latest_reward_index += 1;
                self.new_reward_record(height)
            }
            None => self.new_reward_record(height),
        };
        repo.set_lump_sum(&record)
    }

    fn new_reward_record(&self, height: u64) -> LumpSumRewardsRecord {
        LumpSumRewardsRecord::new(
            self.address,
            self.latest_reward_index,
            height,
            self.total_shares.clone(),
            self.reward_currencies(),
        )
    }

    /// Cut bonded and in-flight stake by `penalty_bps`
    ///
    /// Reaches bonded tokens, unmatured unbond lock-ins, unmatured
    /// redelegations out of this delegatee (clawed back at their destination)
    /// and unexpired rebond grace entries (clawed back where the tokens were
    /// rebonded). Returns the total moved to the slashed pool.
    pub fn slash<W: World>(
        &mut self,
        repo: &mut DelegationRepository<W>,
        penalty_bps: u64,
    ) -> Result<AssetValue> {
        if penalty_bps > BPS_DENOMINATOR {
            return Err(DelegationError::invalid_operation(format!(
                "penalty {} bps exceeds 100%",
                penalty_bps
            )));
        }
        let height = repo.block_index();
        let slashed_pool = repo.accounts().slashed_pool;
        let pool = self.delegation_pool();

        let bonded_cut = self.total_delegated.bps(penalty_bps)?;
        self.total_delegated = self.total_delegated.checked_sub(&bonded_cut)?;
        repo.transfer(&pool, &slashed_pool, &bonded_cut)?;
        repo.set_delegatee(self)?;
        let mut slashed = bonded_cut;

        for r in repo.get_unbonding_set()?.of_delegatee(&self.address) {
            match r.kind {
                UnbondingKind::UnbondLockIn => {
                    let Some(mut ledger) = repo.try_get_unbond_lock_in(&r.delegatee, &r.delegator)?
                    else {
                        continue;
                    };
                    let cut = ledger.slash(penalty_bps, height)?;
                    repo.transfer(&pool, &slashed_pool, &cut)?;
                    repo.set_unbond_lock_in(&ledger)?;
                    slashed = slashed.checked_add(&cut)?;
                }
                UnbondingKind::Redelegation => {
                    let Some(mut ledger) = repo.try_get_redelegation(&r.delegatee, &r.delegator)?
                    else {
                        continue;
                    };
                    for entry in ledger.entries_mut().filter(|e| !e.is_matured(height)) {
                        let cut = entry.unbonding_token().bps(penalty_bps)?;
                        if cut.is_zero() {
                            continue;
                        }
                        let (burned, taken) = Self::clawback(
                            repo,
                            &entry.destination(),
                            &r.delegator,
                            &cut,
                            Some(entry.issued_share()),
                        )?;
                        let left = entry.unbonding_token().checked_sub(&taken)?;
                        entry.set_unbonding_token(left)?;
                        if let Some(burned) = burned {
                            let left = entry.issued_share().checked_sub(&burned)?;
                            entry.set_issued_share(left)?;
                        }
                        slashed = slashed.checked_add(&taken)?;
                    }
                    repo.set_redelegation(&ledger)?;
                }
                UnbondingKind::RebondGrace => {
                    let Some(mut grace) = repo.try_get_rebond_grace(&r.delegatee, &r.delegator)?
                    else {
                        continue;
                    };
                    for entry in grace.entries_mut().filter(|e| !e.is_expired(height)) {
                        let cut = entry.amount.bps(penalty_bps)?;
                        if cut.is_zero() {
                            continue;
                        }
                        let (_, taken) =
                            Self::clawback(repo, &entry.rebonded_to, &r.delegator, &cut, None)?;
                        entry.amount = entry.amount.checked_sub(&taken)?;
                        slashed = slashed.checked_add(&taken)?;
                    }
                    grace.prune_expired(height);
                    repo.set_rebond_grace(&grace)?;
                }
            }
        }

        info!(
            delegatee = %self.address,
            penalty_bps,
            %slashed,
            total_delegated = %self.total_delegated,
            "slash"
        );
        Ok(slashed)
    }

    /// Take up to `tokens` of `delegator`'s stake at `target`
    ///
    /// Shares are burned first, capped by the bond and by `cap`. Whatever the
    /// bond cannot cover comes out of the delegator's pending unbond lock-ins
    /// at `target`. Returns the shares burned (`None` when none were) and the
    /// tokens moved to the slashed pool.
    fn clawback<W: World>(
        repo: &mut DelegationRepository<W>,
        target: &Address,
        delegator: &Address,
        tokens: &AssetValue,
        cap: Option<&AssetValue>,
    ) -> Result<(Option<AssetValue>, AssetValue)> {
        let height = repo.block_index();
        let mut burned = None;
        let mut taken = tokens.currency().zero();

        if let Some(mut delegatee) = repo.try_get_delegatee(target)? {
            let bond = repo.get_bond(&delegatee, delegator)?;
            if !bond.is_empty() && !delegatee.total_delegated.is_zero() {
                let mut shares = delegatee.shares_for_tokens(tokens)?.min(bond.share())?;
                if let Some(cap) = cap {
                    shares = shares.min(cap)?;
                }
                if !shares.is_zero() {
                    taken = delegatee.withdraw(repo, delegator, &shares)?;
                    burned = Some(shares);
                }
            }
        }

        let rest = tokens.saturating_sub(&taken)?;
        if !rest.is_zero() {
            if let Some(mut ledger) = repo.try_get_unbond_lock_in(target, delegator)? {
                let seized = ledger.seize(&rest, height)?;
                repo.set_unbond_lock_in(&ledger)?;
                taken = taken.checked_add(&seized)?;
            }
        }

        let slashed_pool = repo.accounts().slashed_pool;
        repo.transfer(&Self::delegation_pool_of(target), &slashed_pool, &taken)?;
        if !taken.is_zero() {
            debug!(delegatee = %target, %delegator, ?burned, %taken, "clawback");
        }
        Ok((burned, taken))
    }

    /// Delete this delegatee and its reward history; requires zero shares
    pub fn remove<W: World>(self, repo: &mut DelegationRepository<W>) -> Result<()> {
        if !self.total_shares.is_zero() {
            return Err(DelegationError::invalid_operation(format!(
                "delegatee {} still has {} outstanding",
                self.address, self.total_shares
            )));
        }
        for index in 0..=self.latest_reward_index {
            repo.remove_lump_sum(&self.address, index);
        }
        repo.remove_delegatee(&self.address);
        info!(delegatee = %self.address, "removed");
        Ok(())
    }
}

/// Block at which something started at `height` ends after `period` blocks
fn expiry(height: u64, period: u64) -> Result<u64> {
    height.checked_add(period).ok_or_else(|| {
        DelegationError::invalid_operation(format!(
            "period of {} blocks from block {} overflows",
            period, height
        ))
    })
}

impl Record for Delegatee {
    const TAG: &'static str = "delegatee";

    fn to_fields(&self) -> Vec<Value> {
        let p = &self.params;
        vec![
            Value::from(&self.address),
            Value::Text(self.kind.label().to_string()),
            Value::from(&p.delegation_currency),
            Value::List(p.reward_currencies.iter().map(Value::from).collect()),
            Value::from(p.unbonding_period),
            Value::from(p.max_unbond_lock_in_entries),
            Value::from(p.max_redelegation_entries),
            Value::from(p.max_rebond_grace_entries),
            Value::from(p.rebond_grace_period),
            Value::from(p.commission_bps),
            Value::from(&self.total_delegated),
            Value::from(&self.total_shares),
            Value::from(self.latest_reward_index),
            Value::Bool(self.jailed),
            Value::from(&self.delegators),
        ]
    }

    fn from_fields(fields: &mut FieldReader) -> Result<Self, CodecError> {
        let address = fields.address("address")?;
        let kind = match fields.text("kind")?.as_str() {
            "validator" => DelegateeKind::Validator,
            "guild" => DelegateeKind::Guild,
            other => {
                return Err(CodecError::Invalid {
                    field: "kind",
                    reason: format!("unknown delegatee kind {}", other),
                })
            }
        };
        let params = DelegateeParams {
            delegation_currency: fields.currency("delegation_currency")?,
            reward_currencies: fields.currencies("reward_currencies")?,
            unbonding_period: fields.u64("unbonding_period")?,
            max_unbond_lock_in_entries: fields.usize("max_unbond_lock_in_entries")?,
            max_redelegation_entries: fields.usize("max_redelegation_entries")?,
            max_rebond_grace_entries: fields.usize("max_rebond_grace_entries")?,
            rebond_grace_period: fields.u64("rebond_grace_period")?,
            commission_bps: fields.u64("commission_bps")?,
        };
        Ok(Self {
            address,
            kind,
            params,
            total_delegated: fields.asset("total_delegated")?,
            total_shares: fields.asset("total_shares")?,
            latest_reward_index: fields.u64("latest_reward_index")?,
            jailed: fields.bool("jailed")?,
            delegators: fields.address_set("delegators")?,
        })
    }
}
