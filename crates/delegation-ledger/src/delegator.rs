//! Delegator: an account holding shares in delegatees
//!
//! A delegator is signed for by its owner (the delegator address) or by an
//! agent the owner appoints. Tokens always come from and return to the owner
//! address.
//!
//! The delegatee set is maintained by bond changes in [`Delegatee`]; reload
//! the delegator after an operation to observe it.

use crate::address::Address;
use crate::asset::AssetValue;
use crate::codec::{CodecError, FieldReader, Record, Value};
use crate::delegatee::Delegatee;
use crate::error::{DelegationError, Result};
use crate::redelegation::RedelegationEntry;
use crate::repository::DelegationRepository;
use crate::unbond_lock_in::UnbondLockInEntry;
use crate::unbonding_set::{UnbondingKind, UnbondingRef};
use crate::world::World;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegator {
    address: Address,
    agent: Option<Address>,
    delegatees: BTreeSet<Address>,
}

impl Delegator {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            agent: None,
            delegatees: BTreeSet::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn agent(&self) -> Option<Address> {
        self.agent
    }

    pub fn set_agent(&mut self, agent: Option<Address>) {
        self.agent = agent;
    }

    /// Delegatees this delegator holds shares with
    pub fn delegatees(&self) -> &BTreeSet<Address> {
        &self.delegatees
    }

    pub(crate) fn track(&mut self, delegatee: Address, bonded: bool) {
        if bonded {
            self.delegatees.insert(delegatee);
        } else {
            self.delegatees.remove(&delegatee);
        }
    }

    pub fn is_authorized(&self, signer: &Address) -> bool {
        *signer == self.address || self.agent.as_ref() == Some(signer)
    }

    pub fn ensure_authorized(&self, signer: &Address) -> Result<()> {
        if self.is_authorized(signer) {
            Ok(())
        } else {
            Err(DelegationError::invalid_operation(format!(
                "{} may not sign for delegator {}",
                signer, self.address
            )))
        }
    }

    /// Share balance at `delegatee` (zero when no bond exists)
    pub fn get_bond<W: World>(
        &self,
        repo: &DelegationRepository<W>,
        delegatee: &Delegatee,
    ) -> Result<AssetValue> {
        Ok(repo.get_bond(delegatee, &self.address)?.share().clone())
    }

    /// Move `tokens` from the owner into `delegatee` and bond them
    pub fn delegate<W: World>(
        &self,
        repo: &mut DelegationRepository<W>,
        delegatee: &Address,
        tokens: &AssetValue,
    ) -> Result<AssetValue> {
        let mut target = repo.get_or_create_delegatee(delegatee)?;
        target.ensure_bondable()?;
        tokens.ensure_currency(target.delegation_currency())?;

        repo.transfer(&self.address, &target.delegation_pool(), tokens)?;
        target.bond(repo, &self.address, tokens)
    }

    pub fn undelegate<W: World>(
        &self,
        repo: &mut DelegationRepository<W>,
        delegatee: &Address,
        share: u128,
    ) -> Result<UnbondLockInEntry> {
        let mut target = repo.get_delegatee(delegatee)?;
        let shares = target.share_currency().value(share);
        target.unbond(repo, &self.address, &shares)
    }

    pub fn redelegate<W: World>(
        &self,
        repo: &mut DelegationRepository<W>,
        source: &Address,
        destination: &Address,
        share: u128,
    ) -> Result<RedelegationEntry> {
        let mut src = repo.get_delegatee(source)?;
        let mut dst = repo.get_or_create_delegatee(destination)?;
        let shares = src.share_currency().value(share);
        src.redelegate(repo, &self.address, &mut dst, &shares)
    }

    pub fn cancel_redelegation<W: World>(
        &self,
        repo: &mut DelegationRepository<W>,
        source: &Address,
        id: u64,
    ) -> Result<AssetValue> {
        let destination = repo
            .try_get_redelegation(source, &self.address)?
            .and_then(|ledger| {
                ledger
                    .entries()
                    .iter()
                    .find(|e| e.id() == id)
                    .map(|e| e.destination())
            })
            .ok_or_else(|| {
                DelegationError::invalid_operation(format!("no pending redelegation {}", id))
            })?;

        let mut src = repo.get_delegatee(source)?;
        let mut dst = repo.get_delegatee(&destination)?;
        src.cancel_redelegation(repo, &self.address, &mut dst, id)
    }

    pub fn claim_reward<W: World>(
        &self,
        repo: &mut DelegationRepository<W>,
        delegatee: &Address,
    ) -> Result<Vec<AssetValue>> {
        let mut target = repo.get_delegatee(delegatee)?;
        target.claim_reward(repo, &self.address)
    }

    /// Settle this delegator's matured entries at `delegatee`
    ///
    /// Releases matured unbond lock-ins to the owner and drops matured
    /// redelegations and expired rebond grace entries. Returns the tokens
    /// released.
    pub fn release_unbondings<W: World>(
        &self,
        repo: &mut DelegationRepository<W>,
        delegatee: &Address,
    ) -> Result<Option<AssetValue>> {
        let mut released = None;
        for kind in [
            UnbondingKind::UnbondLockIn,
            UnbondingKind::Redelegation,
            UnbondingKind::RebondGrace,
        ] {
            let r = UnbondingRef::new(*delegatee, kind, self.address);
            if let Some(amount) = release_unbonding(repo, &r)? {
                released = Some(amount);
            }
        }
        Ok(released)
    }
}

/// Settle one referenced ledger at the repository's block index
///
/// Returns the tokens released when the reference is an unbond lock-in.
pub fn release_unbonding<W: World>(
    repo: &mut DelegationRepository<W>,
    r: &UnbondingRef,
) -> Result<Option<AssetValue>> {
    let height = repo.block_index();
    match r.kind {
        UnbondingKind::UnbondLockIn => {
            let Some(mut ledger) = repo.try_get_unbond_lock_in(&r.delegatee, &r.delegator)? else {
                return Ok(None);
            };
            let amount = ledger.release(height);
            let pool = Delegatee::delegation_pool_of(&r.delegatee);
            repo.transfer(&pool, &r.delegator, &amount)?;
            repo.set_unbond_lock_in(&ledger)?;
            if !amount.is_zero() {
                debug!(delegatee = %r.delegatee, delegator = %r.delegator, %amount, "release");
            }
            Ok(Some(amount))
        }
        UnbondingKind::Redelegation => {
            if let Some(mut ledger) = repo.try_get_redelegation(&r.delegatee, &r.delegator)? {
                ledger.prune_matured(height);
                repo.set_redelegation(&ledger)?;
            }
            Ok(None)
        }
        UnbondingKind::RebondGrace => {
            if let Some(mut grace) = repo.try_get_rebond_grace(&r.delegatee, &r.delegator)? {
                grace.prune_expired(height);
                repo.set_rebond_grace(&grace)?;
            }
            Ok(None)
        }
    }
}

/// End-of-block sweep: settle every ledger with an entry due at this block
///
/// Returns the number of ledgers visited.
pub fn release_due_unbondings<W: World>(repo: &mut DelegationRepository<W>) -> Result<usize> {
    let due = repo.get_unbonding_set()?.due(repo.block_index());
    for r in &due {
        release_unbonding(repo, r)?;
    }
    Ok(due.len())
}

impl Record for Delegator {
    const TAG: &'static str = "delegator";

    fn to_fields(&self) -> Vec<Value> {
        vec![
            Value::from(&self.address),
            Value::from(&self.delegatees),
            self.agent.as_ref().map(Value::from).unwrap_or(Value::Null),
        ]
    }

    fn from_fields(fields: &mut FieldReader) -> Result<Self, CodecError> {
        let address = fields.address("address")?;
        let delegatees = fields.address_set("delegatees")?;
        let agent = match fields.optional() {
            Some(Value::Bytes(bytes)) => Some(
                Address::try_from(bytes.as_slice()).map_err(|_| CodecError::OutOfRange("agent"))?,
            ),
            Some(other) => {
                return Err(CodecError::UnexpectedKind {
                    field: "agent",
                    expected: "bytes",
                    actual: other.kind(),
                })
            }
            None => None,
        };
        Ok(Self {
            address,
            agent,
            delegatees,
        })
    }
}
