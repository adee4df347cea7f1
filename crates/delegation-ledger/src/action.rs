//! Signed ledger actions
//!
//! An action runs against a snapshot and returns a new one. The snapshot is
//! cloned up front, so on error the caller still holds the untouched input.
//!
//! Authorization:
//!
//! | action                                   | signer                          |
//! |------------------------------------------|---------------------------------|
//! | Delegate                                 | owner, or agent once it exists  |
//! | Undelegate, Redelegate, CancelRedelegation, ClaimReward, ReleaseUnbondings | owner or agent |
//! | SetAgent                                 | owner                           |
//! | DistributeReward, Slash, Jail, Unjail, RemoveDelegatee, ReleaseAllUnbondings | operator |

use crate::address::Address;
use crate::asset::AssetValue;
use crate::config::{DelegateeKind, LedgerConfig};
use crate::delegator::{release_due_unbondings, Delegator};
use crate::error::{DelegationError, Result};
use crate::repository::DelegationRepository;
use crate::world::World;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Per-action context supplied by the enclosing pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionContext {
    pub signer: Address,
    pub block_index: u64,
}

impl ActionContext {
    pub fn new(signer: Address, block_index: u64) -> Self {
        Self {
            signer,
            block_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DelegationAction {
    Delegate {
        kind: DelegateeKind,
        delegatee: Address,
        amount: AssetValue,
        #[serde(default)]
        on_behalf_of: Option<Address>,
    },
    Undelegate {
        kind: DelegateeKind,
        delegatee: Address,
        share: u128,
        #[serde(default)]
        on_behalf_of: Option<Address>,
    },
    Redelegate {
        kind: DelegateeKind,
        source: Address,
        destination: Address,
        share: u128,
        #[serde(default)]
        on_behalf_of: Option<Address>,
    },
    CancelRedelegation {
        kind: DelegateeKind,
        source: Address,
        id: u64,
        #[serde(default)]
        on_behalf_of: Option<Address>,
    },
    ClaimReward {
        kind: DelegateeKind,
        delegatee: Address,
        #[serde(default)]
        on_behalf_of: Option<Address>,
    },
    ReleaseUnbondings {
        kind: DelegateeKind,
        delegatee: Address,
        #[serde(default)]
        on_behalf_of: Option<Address>,
    },
    SetAgent {
        kind: DelegateeKind,
        agent: Option<Address>,
    },
    DistributeReward {
        kind: DelegateeKind,
        delegatee: Address,
        reward: AssetValue,
    },
    Slash {
        kind: DelegateeKind,
        delegatee: Address,
        penalty_bps: u64,
    },
    Jail {
        kind: DelegateeKind,
        delegatee: Address,
    },
    Unjail {
        kind: DelegateeKind,
        delegatee: Address,
    },
    RemoveDelegatee {
        kind: DelegateeKind,
        delegatee: Address,
    },
    ReleaseAllUnbondings {
        kind: DelegateeKind,
    },
}

impl DelegationAction {
    pub fn kind(&self) -> DelegateeKind {
        match self {
            Self::Delegate { kind, .. }
            | Self::Undelegate { kind, .. }
            | Self::Redelegate { kind, .. }
            | Self::CancelRedelegation { kind, .. }
            | Self::ClaimReward { kind, .. }
            | Self::ReleaseUnbondings { kind, .. }
            | Self::SetAgent { kind, .. }
            | Self::DistributeReward { kind, .. }
            | Self::Slash { kind, .. }
            | Self::Jail { kind, .. }
            | Self::Unjail { kind, .. }
            | Self::RemoveDelegatee { kind, .. }
            | Self::ReleaseAllUnbondings { kind } => *kind,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Delegate { .. } => "delegate",
            Self::Undelegate { .. } => "undelegate",
            Self::Redelegate { .. } => "redelegate",
            Self::CancelRedelegation { .. } => "cancel_redelegation",
            Self::ClaimReward { .. } => "claim_reward",
            Self::ReleaseUnbondings { .. } => "release_unbondings",
            Self::SetAgent { .. } => "set_agent",
            Self::DistributeReward { .. } => "distribute_reward",
            Self::Slash { .. } => "slash",
            Self::Jail { .. } => "jail",
            Self::Unjail { .. } => "unjail",
            Self::RemoveDelegatee { .. } => "remove_delegatee",
            Self::ReleaseAllUnbondings { .. } => "release_all_unbondings",
        }
    }

    /// Delegatees this action names
    pub fn delegatees(&self) -> Vec<Address> {
        match self {
            Self::Delegate { delegatee, .. }
            | Self::Undelegate { delegatee, .. }
            | Self::ClaimReward { delegatee, .. }
            | Self::ReleaseUnbondings { delegatee, .. }
            | Self::DistributeReward { delegatee, .. }
            | Self::Slash { delegatee, .. }
            | Self::Jail { delegatee, .. }
            | Self::Unjail { delegatee, .. }
            | Self::RemoveDelegatee { delegatee, .. } => vec![*delegatee],
            Self::Redelegate {
                source,
                destination,
                ..
            } => vec![*source, *destination],
            Self::CancelRedelegation { source, .. } => vec![*source],
            Self::SetAgent { .. } | Self::ReleaseAllUnbondings { .. } => vec![],
        }
    }

    /// Run against `world`, returning the new snapshot
    pub fn execute<W: World>(
        &self,
        ctx: &ActionContext,
        world: &W,
        config: &LedgerConfig,
    ) -> Result<W> {
        let kind = self.kind();
        let mut repo = DelegationRepository::new(
            world.clone(),
            ctx.block_index,
            kind,
            config.params(kind).clone(),
        );
        debug!(
            action = self.name(),
            kind = kind.label(),
            signer = %ctx.signer,
            block = ctx.block_index,
            "execute"
        );

        match self {
            Self::Delegate {
                delegatee,
                amount,
                on_behalf_of,
                ..
            } => {
                let owner = on_behalf_of.unwrap_or(ctx.signer);
                let delegator = match repo.try_get_delegator(&owner)? {
                    Some(existing) => {
                        existing.ensure_authorized(&ctx.signer)?;
                        existing
                    }
                    None if owner == ctx.signer => {
                        let created = Delegator::new(owner);
                        repo.set_delegator(&created)?;
                        created
                    }
                    None => {
                        return Err(DelegationError::invalid_operation(format!(
                            "only {} can open its own delegator",
                            owner
                        )))
                    }
                };
                let shares = delegator.delegate(&mut repo, delegatee, amount)?;
                info!(%delegatee, delegator = %owner, %amount, %shares, "delegate");
            }
            Self::Undelegate {
                delegatee,
                share,
                on_behalf_of,
                ..
            } => {
                let delegator = authorized(&repo, ctx, on_behalf_of)?;
                let entry = delegator.undelegate(&mut repo, delegatee, *share)?;
                info!(
                    %delegatee,
                    delegator = %delegator.address(),
                    tokens = %entry.amount,
                    expire = entry.expire_height,
                    "undelegate"
                );
            }
            Self::Redelegate {
                source,
                destination,
                share,
                on_behalf_of,
                ..
            } => {
                let delegator = authorized(&repo, ctx, on_behalf_of)?;
                let entry = delegator.redelegate(&mut repo, source, destination, *share)?;
                info!(
                    %source,
                    %destination,
                    delegator = %delegator.address(),
                    id = entry.id(),
                    tokens = %entry.unbonding_token(),
                    "redelegate"
                );
            }
            Self::CancelRedelegation {
                source,
                id,
                on_behalf_of,
                ..
            } => {
                let delegator = authorized(&repo, ctx, on_behalf_of)?;
                let tokens = delegator.cancel_redelegation(&mut repo, source, *id)?;
                info!(%source, delegator = %delegator.address(), id, %tokens, "cancel redelegation");
            }
            Self::ClaimReward {
                delegatee,
                on_behalf_of,
                ..
            } => {
                let delegator = authorized(&repo, ctx, on_behalf_of)?;
                let rewards = delegator.claim_reward(&mut repo, delegatee)?;
                info!(%delegatee, delegator = %delegator.address(), ?rewards, "claim reward");
            }
            Self::ReleaseUnbondings {
                delegatee,
                on_behalf_of,
                ..
            } => {
                let delegator = authorized(&repo, ctx, on_behalf_of)?;
                let released = delegator.release_unbondings(&mut repo, delegatee)?;
                info!(%delegatee, delegator = %delegator.address(), ?released, "release unbondings");
            }
            Self::SetAgent { agent, .. } => {
                let mut delegator = repo.get_or_create_delegator(&ctx.signer)?;
                if agent.as_ref() == Some(&ctx.signer) {
                    return Err(DelegationError::invalid_operation(
                        "a delegator cannot be its own agent",
                    ));
                }
                delegator.set_agent(*agent);
                repo.set_delegator(&delegator)?;
                info!(delegator = %ctx.signer, ?agent, "set agent");
            }
            Self::DistributeReward {
                delegatee, reward, ..
            } => {
                ensure_operator(config, ctx)?;
                let mut target = repo.get_delegatee(delegatee)?;
                target.distribute_reward(&mut repo, &ctx.signer, reward)?;
            }
            Self::Slash {
                delegatee,
                penalty_bps,
                ..
            } => {
                ensure_operator(config, ctx)?;
                let mut target = repo.get_delegatee(delegatee)?;
                target.slash(&mut repo, *penalty_bps)?;
            }
            Self::Jail { delegatee, .. } | Self::Unjail { delegatee, .. } => {
                ensure_operator(config, ctx)?;
                let jailed = matches!(self, Self::Jail { .. });
                let mut target = repo.get_delegatee(delegatee)?;
                if target.is_jailed() == jailed {
                    return Err(DelegationError::invalid_operation(format!(
                        "delegatee {} is already {}",
                        delegatee,
                        if jailed { "jailed" } else { "unjailed" }
                    )));
                }
                target.set_jailed(jailed);
                repo.set_delegatee(&target)?;
                info!(%delegatee, jailed, "jail status");
            }
            Self::RemoveDelegatee { delegatee, .. } => {
                ensure_operator(config, ctx)?;
                repo.get_delegatee(delegatee)?.remove(&mut repo)?;
            }
            Self::ReleaseAllUnbondings { .. } => {
                ensure_operator(config, ctx)?;
                let visited = release_due_unbondings(&mut repo)?;
                debug!(visited, block = ctx.block_index, "release all unbondings");
            }
        }

        Ok(repo.into_world())
    }
}

fn authorized<W: World>(
    repo: &DelegationRepository<W>,
    ctx: &ActionContext,
    on_behalf_of: &Option<Address>,
) -> Result<Delegator> {
    let owner = on_behalf_of.unwrap_or(ctx.signer);
    let delegator = repo.get_delegator(&owner)?;
    delegator.ensure_authorized(&ctx.signer)?;
    Ok(delegator)
}

fn ensure_operator(config: &LedgerConfig, ctx: &ActionContext) -> Result<()> {
    if config.is_operator(&ctx.signer) {
        Ok(())
    } else {
        Err(DelegationError::invalid_operation(format!(
            "{} is not an operator",
            ctx.signer
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "type": "undelegate",
            "kind": "guild",
            "delegatee": "0x0101010101010101010101010101010101010101",
            "share": 400
        }"#;
        let action: DelegationAction = serde_json::from_str(json).unwrap();
        assert_eq!(action.name(), "undelegate");
        assert_eq!(action.kind(), DelegateeKind::Guild);
        assert_eq!(action.delegatees(), vec![Address::new([1u8; 20])]);
    }

    #[test]
    fn test_delegate_json_carries_currency() {
        let json = r#"{
            "type": "delegate",
            "kind": "validator",
            "delegatee": "0x0101010101010101010101010101010101010101",
            "amount": { "currency": { "ticker": "GT", "decimal_places": 0 }, "raw": 1000 }
        }"#;
        match serde_json::from_str::<DelegationAction>(json).unwrap() {
            DelegationAction::Delegate {
                amount,
                on_behalf_of,
                ..
            } => {
                assert_eq!(amount.raw(), 1000);
                assert_eq!(amount.currency().ticker, "GT");
                assert_eq!(on_behalf_of, None);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }
}
