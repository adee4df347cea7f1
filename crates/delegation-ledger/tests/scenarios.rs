//! End-to-end ledger scenarios driven through signed actions

mod common;

use common::*;
use delegation_ledger::{
    DelegateeKind, DelegationAction, DelegationError, UnbondingKind, UnbondingRef,
};

const ALICE: u8 = 0xa1;
const BOB: u8 = 0xb0;
const GUILD_A: u8 = 0x0a;
const GUILD_B: u8 = 0x0b;

fn ledger() -> Ledger {
    Ledger::new(config())
        .fund(addr(ALICE), gt().value(10_000))
        .fund(addr(BOB), gt().value(10_000))
        .fund(addr(OPERATOR), ncg().value(1_000_000))
}

#[test]
fn test_first_delegation_is_one_to_one() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();

    let d = l.delegatee(addr(GUILD_A));
    assert_eq!(d.total_delegated().raw(), 1000);
    assert_eq!(d.total_shares().raw(), 1000);
    assert_eq!(l.share(addr(GUILD_A), addr(ALICE)), 1000);
    assert_eq!(l.balance(addr(ALICE), &gt()), 9000);
    assert_eq!(l.balance(d.delegation_pool(), &gt()), 1000);

    let repo = l.repo(1);
    let delegator = repo.get_delegator(&addr(ALICE)).unwrap();
    assert!(delegator.delegatees().contains(&addr(GUILD_A)));
    assert_eq!(delegator.get_bond(&repo, &d).unwrap().raw(), 1000);

    let untouched = repo.get_or_create_delegatee(&addr(GUILD_B)).unwrap();
    assert!(delegator.get_bond(&repo, &untouched).unwrap().is_zero());
}

#[test]
fn test_undelegate_locks_tokens() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();
    l.undelegate(addr(ALICE), 10, addr(GUILD_A), 400).unwrap();

    let d = l.delegatee(addr(GUILD_A));
    assert_eq!(d.total_delegated().raw(), 600);
    assert_eq!(d.total_shares().raw(), 600);
    assert_eq!(l.share(addr(GUILD_A), addr(ALICE)), 600);

    let lock_in = l
        .repo(10)
        .try_get_unbond_lock_in(&addr(GUILD_A), &addr(ALICE))
        .unwrap()
        .unwrap();
    assert_eq!(lock_in.entries().len(), 1);
    assert_eq!(lock_in.entries()[0].amount.raw(), 400);
    assert_eq!(lock_in.entries()[0].expire_height, 110);
}

#[test]
fn test_release_at_maturity_is_idempotent() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();
    l.undelegate(addr(ALICE), 10, addr(GUILD_A), 400).unwrap();

    l.release(addr(ALICE), 109, addr(GUILD_A)).unwrap();
    assert_eq!(l.balance(addr(ALICE), &gt()), 9000);

    l.release(addr(ALICE), 110, addr(GUILD_A)).unwrap();
    assert_eq!(l.balance(addr(ALICE), &gt()), 9400);

    let root = l.world.state_root();
    l.release(addr(ALICE), 110, addr(GUILD_A)).unwrap();
    assert_eq!(l.balance(addr(ALICE), &gt()), 9400);
    assert_eq!(l.world.state_root(), root);
}

#[test]
fn test_cancel_redelegation_opens_rebond_grace() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();
    l.redelegate(addr(ALICE), 10, addr(GUILD_A), addr(GUILD_B), 300)
        .unwrap();

    assert_eq!(l.share(addr(GUILD_A), addr(ALICE)), 700);
    assert_eq!(l.share(addr(GUILD_B), addr(ALICE)), 300);

    l.cancel(addr(ALICE), 20, addr(GUILD_A), 0).unwrap();

    assert_eq!(l.share(addr(GUILD_A), addr(ALICE)), 1000);
    assert_eq!(l.share(addr(GUILD_B), addr(ALICE)), 0);

    let repo = l.repo(20);
    let grace = repo
        .try_get_rebond_grace(&addr(GUILD_B), &addr(ALICE))
        .unwrap()
        .unwrap();
    assert_eq!(grace.entries().len(), 1);
    assert_eq!(grace.entries()[0].amount.raw(), 300);
    assert_eq!(grace.entries()[0].expire_height, 70);
    assert_eq!(grace.entries()[0].rebonded_to, addr(GUILD_A));

    let set = repo.get_unbonding_set().unwrap();
    let grace_ref = UnbondingRef::new(addr(GUILD_B), UnbondingKind::RebondGrace, addr(ALICE));
    assert_eq!(set.expiry(&grace_ref), Some(70));
    let redelegation_ref =
        UnbondingRef::new(addr(GUILD_A), UnbondingKind::Redelegation, addr(ALICE));
    assert_eq!(set.expiry(&redelegation_ref), None);

    let delegator = repo.get_delegator(&addr(ALICE)).unwrap();
    assert!(!delegator.delegatees().contains(&addr(GUILD_B)));
}

#[test]
fn test_cancel_after_maturity_rejected() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();
    l.redelegate(addr(ALICE), 10, addr(GUILD_A), addr(GUILD_B), 300)
        .unwrap();

    let err = l.cancel(addr(ALICE), 110, addr(GUILD_A), 0).unwrap_err();
    assert!(matches!(err, DelegationError::InvalidOperation(_)));
    assert!(l.cancel(addr(ALICE), 109, addr(GUILD_A), 7).is_err());
}

#[test]
fn test_slash_halves_bonded_and_pending() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();
    l.undelegate(addr(ALICE), 10, addr(GUILD_A), 400).unwrap();
    l.slash(20, addr(GUILD_A), 5000).unwrap();

    let d = l.delegatee(addr(GUILD_A));
    assert_eq!(d.total_delegated().raw(), 300);
    assert_eq!(d.total_shares().raw(), 600);

    let lock_in = l
        .repo(20)
        .try_get_unbond_lock_in(&addr(GUILD_A), &addr(ALICE))
        .unwrap()
        .unwrap();
    assert_eq!(lock_in.total_amount().raw(), 200);

    assert_eq!(l.slashed_pool(), 500);
    assert_eq!(l.balance(d.delegation_pool(), &gt()), 500);

    // the halved lock-in is what gets released
    l.release(addr(ALICE), 110, addr(GUILD_A)).unwrap();
    assert_eq!(l.balance(addr(ALICE), &gt()), 9200);
}

#[test]
fn test_slash_claws_back_redelegated_stake() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();
    l.redelegate(addr(ALICE), 10, addr(GUILD_A), addr(GUILD_B), 300)
        .unwrap();
    l.slash(20, addr(GUILD_A), 5000).unwrap();

    assert_eq!(l.delegatee(addr(GUILD_A)).total_delegated().raw(), 350);
    assert_eq!(l.delegatee(addr(GUILD_B)).total_delegated().raw(), 150);
    assert_eq!(l.share(addr(GUILD_B), addr(ALICE)), 150);
    assert_eq!(l.slashed_pool(), 500);

    let ledger = l
        .repo(20)
        .try_get_redelegation(&addr(GUILD_A), &addr(ALICE))
        .unwrap()
        .unwrap();
    assert_eq!(ledger.entries()[0].unbonding_token().raw(), 150);
    assert_eq!(ledger.entries()[0].issued_share().raw(), 150);
}

#[test]
fn test_slash_reaches_redelegated_stake_already_unbonding() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();
    l.redelegate(addr(ALICE), 10, addr(GUILD_A), addr(GUILD_B), 300)
        .unwrap();
    l.undelegate(addr(ALICE), 11, addr(GUILD_B), 300).unwrap();
    l.slash(12, addr(GUILD_A), 5000).unwrap();

    assert_eq!(l.slashed_pool(), 500);

    let lock_in = l
        .repo(12)
        .try_get_unbond_lock_in(&addr(GUILD_B), &addr(ALICE))
        .unwrap()
        .unwrap();
    assert_eq!(lock_in.total_amount().raw(), 150);

    let ledger = l
        .repo(12)
        .try_get_redelegation(&addr(GUILD_A), &addr(ALICE))
        .unwrap()
        .unwrap();
    assert_eq!(ledger.entries()[0].unbonding_token().raw(), 150);

    l.release(addr(ALICE), 111, addr(GUILD_B)).unwrap();
    assert_eq!(l.balance(addr(ALICE), &gt()), 9150);
}

#[test]
fn test_slash_reaches_rebonded_stake_already_unbonding() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();
    l.redelegate(addr(ALICE), 10, addr(GUILD_A), addr(GUILD_B), 300)
        .unwrap();
    l.cancel(addr(ALICE), 20, addr(GUILD_A), 0).unwrap();
    l.undelegate(addr(ALICE), 21, addr(GUILD_A), 1000).unwrap();

    l.slash(30, addr(GUILD_B), 5000).unwrap();
    assert_eq!(l.slashed_pool(), 150);

    let grace = l
        .repo(30)
        .try_get_rebond_grace(&addr(GUILD_B), &addr(ALICE))
        .unwrap()
        .unwrap();
    assert_eq!(grace.total_amount().raw(), 150);

    l.release(addr(ALICE), 121, addr(GUILD_A)).unwrap();
    assert_eq!(l.balance(addr(ALICE), &gt()), 9850);
}

#[test]
fn test_slash_claws_back_through_rebond_grace() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();
    l.redelegate(addr(ALICE), 10, addr(GUILD_A), addr(GUILD_B), 300)
        .unwrap();
    l.cancel(addr(ALICE), 20, addr(GUILD_A), 0).unwrap();

    l.slash(30, addr(GUILD_B), 5000).unwrap();

    assert_eq!(l.share(addr(GUILD_A), addr(ALICE)), 850);
    assert_eq!(l.delegatee(addr(GUILD_A)).total_delegated().raw(), 850);
    assert_eq!(l.slashed_pool(), 150);

    let grace = l
        .repo(30)
        .try_get_rebond_grace(&addr(GUILD_B), &addr(ALICE))
        .unwrap()
        .unwrap();
    assert_eq!(grace.total_amount().raw(), 150);

    // after expiry the grace entry no longer reaches anything
    l.release_all(70).unwrap();
    assert!(l
        .repo(70)
        .try_get_rebond_grace(&addr(GUILD_B), &addr(ALICE))
        .unwrap()
        .is_none());
}

#[test]
fn test_rewards_split_by_share() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 700).unwrap();
    l.delegate(addr(BOB), 2, addr(GUILD_A), 300).unwrap();
    l.distribute(3, addr(GUILD_A), 1000).unwrap();

    l.claim(addr(ALICE), 4, addr(GUILD_A)).unwrap();
    l.claim(addr(BOB), 4, addr(GUILD_A)).unwrap();

    assert_eq!(l.balance(addr(ALICE), &ncg()), 700);
    assert_eq!(l.balance(addr(BOB), &ncg()), 300);

    // nothing left to claim
    l.claim(addr(ALICE), 5, addr(GUILD_A)).unwrap();
    assert_eq!(l.balance(addr(ALICE), &ncg()), 700);
}

#[test]
fn test_rewards_follow_share_changes() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 700).unwrap();
    l.delegate(addr(BOB), 2, addr(GUILD_A), 300).unwrap();
    l.distribute(5, addr(GUILD_A), 1000).unwrap();

    // bonding more pays out what was owed first
    l.delegate(addr(BOB), 6, addr(GUILD_A), 300).unwrap();
    assert_eq!(l.balance(addr(BOB), &ncg()), 300);

    l.distribute(7, addr(GUILD_A), 1300).unwrap();
    l.claim(addr(ALICE), 8, addr(GUILD_A)).unwrap();
    l.claim(addr(BOB), 8, addr(GUILD_A)).unwrap();

    assert_eq!(l.balance(addr(ALICE), &ncg()), 1400);
    assert_eq!(l.balance(addr(BOB), &ncg()), 900);
}

#[test]
fn test_reward_dust_stays_in_pool() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1).unwrap();
    l.delegate(addr(BOB), 2, addr(GUILD_A), 2).unwrap();
    l.distribute(3, addr(GUILD_A), 100).unwrap();

    l.claim(addr(ALICE), 4, addr(GUILD_A)).unwrap();
    l.claim(addr(BOB), 4, addr(GUILD_A)).unwrap();

    let pool = l.delegatee(addr(GUILD_A)).reward_pool();
    assert_eq!(l.balance(addr(ALICE), &ncg()), 33);
    assert_eq!(l.balance(addr(BOB), &ncg()), 66);
    assert_eq!(l.balance(pool, &ncg()), 1);
}

#[test]
fn test_validator_commission() {
    let mut l = ledger();
    l.kind = DelegateeKind::Validator;
    l.config.validator.commission_bps = 1000;

    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();
    l.distribute(2, addr(GUILD_A), 1000).unwrap();
    l.claim(addr(ALICE), 3, addr(GUILD_A)).unwrap();

    assert_eq!(l.balance(addr(GUILD_A), &ncg()), 100);
    assert_eq!(l.balance(addr(ALICE), &ncg()), 900);
}

#[test]
fn test_wrong_currency_rejected() {
    let mut l = ledger().fund(addr(ALICE), ncg().value(1000));
    let err = l
        .exec(
            addr(ALICE),
            1,
            DelegationAction::Delegate {
                kind: DelegateeKind::Guild,
                delegatee: addr(GUILD_A),
                amount: ncg().value(1000),
                on_behalf_of: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, DelegationError::InvalidCurrency { .. }));

    l.delegate(addr(ALICE), 1, addr(GUILD_A), 10).unwrap();
    let err = l
        .exec(
            addr(OPERATOR),
            2,
            DelegationAction::DistributeReward {
                kind: DelegateeKind::Guild,
                delegatee: addr(GUILD_A),
                reward: gt().value(5),
            },
        )
        .unwrap_err();
    assert!(matches!(err, DelegationError::InvalidCurrency { .. }));
}

#[test]
fn test_insufficient_balance_and_share() {
    let mut l = ledger();
    let err = l.delegate(addr(ALICE), 1, addr(GUILD_A), 10_001).unwrap_err();
    assert!(matches!(err, DelegationError::InsufficientBalance { .. }));

    l.delegate(addr(ALICE), 1, addr(GUILD_A), 100).unwrap();
    let err = l.undelegate(addr(ALICE), 2, addr(GUILD_A), 101).unwrap_err();
    assert!(matches!(err, DelegationError::NotEnoughShare { .. }));
}

#[test]
fn test_exceed_entries_leaves_snapshot_untouched() {
    let mut config = config();
    config.guild.max_unbond_lock_in_entries = 2;
    let mut l = Ledger::new(config).fund(addr(ALICE), gt().value(1000));

    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();
    l.undelegate(addr(ALICE), 2, addr(GUILD_A), 10).unwrap();
    l.undelegate(addr(ALICE), 3, addr(GUILD_A), 10).unwrap();

    let root = l.world.state_root();
    let err = l.undelegate(addr(ALICE), 4, addr(GUILD_A), 10).unwrap_err();
    assert!(matches!(err, DelegationError::ExceedEntries { max: 2, .. }));
    assert_eq!(l.world.state_root(), root);
}

#[test]
fn test_missing_state_fails_to_load() {
    let mut l = ledger();
    let err = l.undelegate(addr(ALICE), 1, addr(GUILD_A), 1).unwrap_err();
    assert!(matches!(err, DelegationError::FailedLoadState { .. }));

    l.delegate(addr(ALICE), 1, addr(GUILD_A), 10).unwrap();
    let err = l.undelegate(addr(ALICE), 2, addr(GUILD_B), 1).unwrap_err();
    assert!(matches!(err, DelegationError::FailedLoadState { .. }));
}

#[test]
fn test_agent_may_sign_for_owner() {
    let agent = addr(0xa9);
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();

    let undelegate = DelegationAction::Undelegate {
        kind: DelegateeKind::Guild,
        delegatee: addr(GUILD_A),
        share: 100,
        on_behalf_of: Some(addr(ALICE)),
    };
    let err = l.exec(agent, 2, undelegate.clone()).unwrap_err();
    assert!(matches!(err, DelegationError::InvalidOperation(_)));

    l.exec(
        addr(ALICE),
        2,
        DelegationAction::SetAgent {
            kind: DelegateeKind::Guild,
            agent: Some(agent),
        },
    )
    .unwrap();
    l.exec(agent, 3, undelegate).unwrap();
    assert_eq!(l.share(addr(GUILD_A), addr(ALICE)), 900);

    // nobody opens a delegator for someone else
    let err = l
        .exec(
            agent,
            4,
            DelegationAction::Delegate {
                kind: DelegateeKind::Guild,
                delegatee: addr(GUILD_A),
                amount: gt().value(1),
                on_behalf_of: Some(addr(BOB)),
            },
        )
        .unwrap_err();
    assert!(matches!(err, DelegationError::InvalidOperation(_)));
}

#[test]
fn test_operator_only_actions() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();

    let err = l
        .exec(
            addr(ALICE),
            2,
            DelegationAction::Slash {
                kind: DelegateeKind::Guild,
                delegatee: addr(GUILD_A),
                penalty_bps: 5000,
            },
        )
        .unwrap_err();
    assert!(matches!(err, DelegationError::InvalidOperation(_)));
    assert_eq!(l.delegatee(addr(GUILD_A)).total_delegated().raw(), 1000);
}

#[test]
fn test_jailed_delegatee_blocks_new_bonds_only() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();
    l.exec(
        addr(OPERATOR),
        2,
        DelegationAction::Jail {
            kind: DelegateeKind::Guild,
            delegatee: addr(GUILD_A),
        },
    )
    .unwrap();

    assert!(matches!(
        l.delegate(addr(BOB), 3, addr(GUILD_A), 10),
        Err(DelegationError::InvalidOperation(_))
    ));
    assert!(l
        .redelegate(addr(ALICE), 3, addr(GUILD_A), addr(GUILD_B), 100)
        .is_ok());
    assert!(l
        .redelegate(addr(ALICE), 3, addr(GUILD_B), addr(GUILD_A), 50)
        .is_err());
    l.undelegate(addr(ALICE), 4, addr(GUILD_A), 100).unwrap();

    l.exec(
        addr(OPERATOR),
        5,
        DelegationAction::Unjail {
            kind: DelegateeKind::Guild,
            delegatee: addr(GUILD_A),
        },
    )
    .unwrap();
    l.delegate(addr(BOB), 6, addr(GUILD_A), 10).unwrap();
}

#[test]
fn test_remove_delegatee_requires_no_shares() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();

    let remove = DelegationAction::RemoveDelegatee {
        kind: DelegateeKind::Guild,
        delegatee: addr(GUILD_A),
    };
    assert!(l.exec(addr(OPERATOR), 2, remove.clone()).is_err());

    l.undelegate(addr(ALICE), 3, addr(GUILD_A), 1000).unwrap();
    l.exec(addr(OPERATOR), 4, remove).unwrap();
    assert!(l.repo(4).try_get_delegatee(&addr(GUILD_A)).unwrap().is_none());

    // pending unbonding still pays out from the pool
    l.release(addr(ALICE), 103, addr(GUILD_A)).unwrap();
    assert_eq!(l.balance(addr(ALICE), &gt()), 10_000);
}

#[test]
fn test_release_all_sweeps_due_entries() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();
    l.delegate(addr(BOB), 1, addr(GUILD_A), 1000).unwrap();
    l.undelegate(addr(ALICE), 10, addr(GUILD_A), 100).unwrap();
    l.undelegate(addr(BOB), 20, addr(GUILD_A), 200).unwrap();

    l.release_all(110).unwrap();
    assert_eq!(l.balance(addr(ALICE), &gt()), 9100);
    assert_eq!(l.balance(addr(BOB), &gt()), 9000);

    l.release_all(120).unwrap();
    assert_eq!(l.balance(addr(BOB), &gt()), 9200);
    assert!(l.repo(120).get_unbonding_set().unwrap().is_empty());
}

#[test]
fn test_replay_is_deterministic() {
    fn run() -> [u8; 32] {
        let mut l = ledger();
        l.delegate(addr(ALICE), 1, addr(GUILD_A), 700).unwrap();
        l.delegate(addr(BOB), 2, addr(GUILD_B), 300).unwrap();
        l.redelegate(addr(ALICE), 3, addr(GUILD_A), addr(GUILD_B), 200)
            .unwrap();
        l.distribute(4, addr(GUILD_B), 999).unwrap();
        l.slash(5, addr(GUILD_A), 1234).unwrap();
        l.undelegate(addr(BOB), 6, addr(GUILD_B), 100).unwrap();
        l.claim(addr(ALICE), 7, addr(GUILD_B)).unwrap();
        l.world.state_root()
    }
    assert_eq!(run(), run());
}

#[test]
fn test_kinds_are_isolated() {
    let mut l = ledger();
    l.delegate(addr(ALICE), 1, addr(GUILD_A), 1000).unwrap();

    l.kind = DelegateeKind::Validator;
    assert!(l.repo(1).try_get_delegatee(&addr(GUILD_A)).unwrap().is_none());
    assert_eq!(l.share(addr(GUILD_A), addr(ALICE)), 0);
}
