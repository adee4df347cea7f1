//! Shared fixtures for ledger integration tests

#![allow(dead_code)]

use delegation_ledger::{
    ActionContext, Address, AssetValue, Currency, DelegateeKind, DelegationAction,
    DelegationRepository, Delegatee, InMemoryWorld, LedgerConfig, Result, AssetLedger,
};

pub const OPERATOR: u8 = 0xee;

pub fn addr(b: u8) -> Address {
    Address::new([b; 20])
}

pub fn gt() -> Currency {
    Currency::new("GT", 0)
}

pub fn ncg() -> Currency {
    Currency::new("NCG", 2)
}

/// Guild params: unbonding 100 blocks, grace 50 blocks, no commission
pub fn config() -> LedgerConfig {
    let mut config = LedgerConfig::default_for(gt(), vec![ncg()]).with_operator(addr(OPERATOR));
    for kind in [DelegateeKind::Guild, DelegateeKind::Validator] {
        let params = config.params_mut(kind);
        params.unbonding_period = 100;
        params.rebond_grace_period = 50;
    }
    config
}

pub struct Ledger {
    pub world: InMemoryWorld,
    pub config: LedgerConfig,
    pub kind: DelegateeKind,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            world: InMemoryWorld::new(),
            config,
            kind: DelegateeKind::Guild,
        }
    }

    pub fn fund(mut self, owner: Address, value: AssetValue) -> Self {
        self.world = self.world.with_balance(owner, &value);
        self
    }

    /// Execute and keep the new snapshot only on success
    pub fn exec(&mut self, signer: Address, block: u64, action: DelegationAction) -> Result<()> {
        let ctx = ActionContext::new(signer, block);
        self.world = action.execute(&ctx, &self.world, &self.config)?;
        Ok(())
    }

    pub fn repo(&self, block: u64) -> DelegationRepository<InMemoryWorld> {
        DelegationRepository::new(
            self.world.clone(),
            block,
            self.kind,
            self.config.params(self.kind).clone(),
        )
    }

    pub fn delegatee(&self, address: Address) -> Delegatee {
        self.repo(0).get_delegatee(&address).unwrap()
    }

    pub fn share(&self, delegatee: Address, delegator: Address) -> u128 {
        let repo = self.repo(0);
        match repo.try_get_delegatee(&delegatee).unwrap() {
            Some(d) => repo.get_bond(&d, &delegator).unwrap().share().raw(),
            None => 0,
        }
    }

    pub fn balance(&self, owner: Address, currency: &Currency) -> u128 {
        self.world.balance(&owner, currency).raw()
    }

    pub fn slashed_pool(&self) -> u128 {
        self.balance(self.kind.accounts().slashed_pool, &gt())
    }

    // -- action shorthands --

    pub fn delegate(&mut self, who: Address, block: u64, to: Address, amount: u128) -> Result<()> {
        let kind = self.kind;
        self.exec(
            who,
            block,
            DelegationAction::Delegate {
                kind,
                delegatee: to,
                amount: gt().value(amount),
                on_behalf_of: None,
            },
        )
    }

    pub fn undelegate(&mut self, who: Address, block: u64, from: Address, share: u128) -> Result<()> {
        let kind = self.kind;
        self.exec(
            who,
            block,
            DelegationAction::Undelegate {
                kind,
                delegatee: from,
                share,
                on_behalf_of: None,
            },
        )
    }

    pub fn redelegate(
        &mut self,
        who: Address,
        block: u64,
        source: Address,
        destination: Address,
        share: u128,
    ) -> Result<()> {
        let kind = self.kind;
        self.exec(
            who,
            block,
            DelegationAction::Redelegate {
                kind,
                source,
                destination,
                share,
                on_behalf_of: None,
            },
        )
    }

    pub fn cancel(&mut self, who: Address, block: u64, source: Address, id: u64) -> Result<()> {
        let kind = self.kind;
        self.exec(
            who,
            block,
            DelegationAction::CancelRedelegation {
                kind,
                source,
                id,
                on_behalf_of: None,
            },
        )
    }

    pub fn release(&mut self, who: Address, block: u64, delegatee: Address) -> Result<()> {
        let kind = self.kind;
        self.exec(
            who,
            block,
            DelegationAction::ReleaseUnbondings {
                kind,
                delegatee,
                on_behalf_of: None,
            },
        )
    }

    pub fn claim(&mut self, who: Address, block: u64, delegatee: Address) -> Result<()> {
        let kind = self.kind;
        self.exec(
            who,
            block,
            DelegationAction::ClaimReward {
                kind,
                delegatee,
                on_behalf_of: None,
            },
        )
    }

    pub fn distribute(&mut self, block: u64, delegatee: Address, amount: u128) -> Result<()> {
        let kind = self.kind;
        self.exec(
            addr(OPERATOR),
            block,
            DelegationAction::DistributeReward {
                kind,
                delegatee,
                reward: ncg().value(amount),
            },
        )
    }

    pub fn slash(&mut self, block: u64, delegatee: Address, penalty_bps: u64) -> Result<()> {
        let kind = self.kind;
        self.exec(
            addr(OPERATOR),
            block,
            DelegationAction::Slash {
                kind,
                delegatee,
                penalty_bps,
            },
        )
    }

    pub fn release_all(&mut self, block: u64) -> Result<()> {
        let kind = self.kind;
        self.exec(
            addr(OPERATOR),
            block,
            DelegationAction::ReleaseAllUnbondings { kind },
        )
    }
}
