//! Unbonding set: registry of every ledger holding time-locked entries
//!
//! One record per delegatee kind. Each reference points at an UnbondLockIn,
//! Redelegation or RebondGrace ledger and carries that ledger's earliest
//! expiry. Two walks use it:
//!
//! - end-of-block release: every reference with `expiry <= height`
//! - slashing: every reference of one delegatee (references sort by
//!   delegatee first, so this is a range scan)

use crate::address::Address;
use crate::codec::{CodecError, FieldReader, Record, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnbondingKind {
    UnbondLockIn,
    Redelegation,
    RebondGrace,
}

impl UnbondingKind {
    fn code(&self) -> u64 {
        match self {
            UnbondingKind::UnbondLockIn => 0,
            UnbondingKind::Redelegation => 1,
            UnbondingKind::RebondGrace => 2,
        }
    }

    fn from_code(code: u64) -> Result<Self, CodecError> {
        match code {
            0 => Ok(UnbondingKind::UnbondLockIn),
            1 => Ok(UnbondingKind::Redelegation),
            2 => Ok(UnbondingKind::RebondGrace),
            _ => Err(CodecError::OutOfRange("unbonding kind")),
        }
    }
}

/// Reference to one time-locked ledger
///
/// `delegatee` is the delegatee whose slash reaches the ledger: the unbonding
/// delegatee, the redelegation source, or the delegatee a rebond left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnbondingRef {
    pub delegatee: Address,
    pub kind: UnbondingKind,
    pub delegator: Address,
}

impl UnbondingRef {
    pub fn new(delegatee: Address, kind: UnbondingKind, delegator: Address) -> Self {
        Self {
            delegatee,
            kind,
            delegator,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnbondingSet {
    refs: BTreeMap<UnbondingRef, u64>,
}

impl UnbondingSet {
    /// Fixed address inside the kind's unbonding-set account
    pub fn address() -> Address {
        Address::derive("unbonding_set", &[])
    }

    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn expiry(&self, r: &UnbondingRef) -> Option<u64> {
        self.refs.get(r).copied()
    }

    /// Track `r` with its earliest expiry, or forget it when `None`
    pub fn update(&mut self, r: UnbondingRef, next_expiry: Option<u64>) {
        match next_expiry {
            Some(expiry) => {
                self.refs.insert(r, expiry);
            }
            None => {
                self.refs.remove(&r);
            }
        }
    }

    /// References with an entry due at or before `height`, in reference order
    pub fn due(&self, height: u64) -> Vec<UnbondingRef> {
        self.refs
            .iter()
            .filter(|(_, expiry)| **expiry <= height)
            .map(|(r, _)| *r)
            .collect()
    }

    /// References reachable by a slash of `delegatee`, in reference order
    pub fn of_delegatee(&self, delegatee: &Address) -> Vec<UnbondingRef> {
        let start = UnbondingRef::new(*delegatee, UnbondingKind::UnbondLockIn, Address::ZERO);
        self.refs
            .range(start..)
            .map(|(r, _)| *r)
            .take_while(|r| r.delegatee == *delegatee)
            .collect()
    }
}

impl Record for UnbondingSet {
    const TAG: &'static str = "unbonding_set";

    fn to_fields(&self) -> Vec<Value> {
        vec![Value::List(
            self.refs
                .iter()
                .map(|(r, expiry)| {
                    Value::List(vec![
                        Value::from(&r.delegatee),
                        Value::from(r.kind.code()),
                        Value::from(&r.delegator),
                        Value::from(*expiry),
                    ])
                })
                .collect(),
        )]
    }

    fn from_fields(fields: &mut FieldReader) -> Result<Self, CodecError> {
        let pairs = fields.records("refs", |item| {
            let delegatee = item.address("delegatee")?;
            let kind = UnbondingKind::from_code(item.u64("kind")?)?;
            let delegator = item.address("delegator")?;
            let expiry = item.u64("expiry")?;
            Ok((UnbondingRef::new(delegatee, kind, delegator), expiry))
        })?;
        Ok(Self {
            refs: pairs.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    #[test]
    fn test_due_and_update() {
        let mut set = UnbondingSet::new();
        let a = UnbondingRef::new(addr(1), UnbondingKind::UnbondLockIn, addr(9));
        let b = UnbondingRef::new(addr(2), UnbondingKind::RebondGrace, addr(9));
        set.update(a, Some(110));
        set.update(b, Some(70));

        assert_eq!(set.due(69), vec![]);
        assert_eq!(set.due(70), vec![b]);
        assert_eq!(set.due(110), vec![a, b]);

        set.update(b, None);
        assert_eq!(set.expiry(&b), None);
        assert_eq!(set.due(110), vec![a]);
    }

    #[test]
    fn test_of_delegatee_range() {
        let mut set = UnbondingSet::new();
        for (d, kind) in [
            (1, UnbondingKind::Redelegation),
            (1, UnbondingKind::UnbondLockIn),
            (2, UnbondingKind::UnbondLockIn),
            (0, UnbondingKind::RebondGrace),
        ] {
            set.update(UnbondingRef::new(addr(d), kind, addr(7)), Some(5));
        }

        let refs = set.of_delegatee(&addr(1));
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|r| r.delegatee == addr(1)));
        assert_eq!(refs[0].kind, UnbondingKind::UnbondLockIn);
    }

    #[test]
    fn test_roundtrip() {
        let mut set = UnbondingSet::new();
        set.update(
            UnbondingRef::new(addr(1), UnbondingKind::Redelegation, addr(2)),
            Some(42),
        );
        let decoded: UnbondingSet = decode(&encode(&set).unwrap()).unwrap();
        assert_eq!(decoded, set);
    }
}
