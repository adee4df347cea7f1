use crate::address::Address;
use crate::asset::AssetError;
use crate::codec::CodecError;

/// Ledger error taxonomy
///
/// Every variant aborts the whole action. The caller keeps the snapshot it
/// passed in; nothing is retried here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DelegationError {
    #[error("invalid currency: expected {expected}, got {actual}")]
    InvalidCurrency { expected: String, actual: String },

    #[error("not enough share: requested {requested}, bonded {available}")]
    NotEnoughShare { requested: String, available: String },

    #[error("insufficient balance of {address}: has {balance}, needs {requested}")]
    InsufficientBalance {
        address: Address,
        balance: String,
        requested: String,
    },

    #[error("{ledger} is full ({max} entries)")]
    ExceedEntries { ledger: &'static str, max: usize },

    #[error("failed to load {entity} at {address}: {reason}")]
    FailedLoadState {
        entity: &'static str,
        address: Address,
        reason: String,
    },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to encode {entity} at {address}: {source}")]
    Codec {
        entity: &'static str,
        address: Address,
        source: CodecError,
    },

    #[error("asset: {0}")]
    Asset(AssetError),
}

impl DelegationError {
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn not_found(entity: &'static str, address: Address) -> Self {
        Self::FailedLoadState {
            entity,
            address,
            reason: "not found".into(),
        }
    }
}

impl From<AssetError> for DelegationError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::CurrencyMismatch { expected, actual } => {
                Self::InvalidCurrency { expected, actual }
            }
            AssetError::InsufficientBalance {
                address,
                balance,
                requested,
            } => Self::InsufficientBalance {
                address,
                balance,
                requested,
            },
            other => Self::Asset(other),
        }
    }
}

pub type Result<T, E = DelegationError> = std::result::Result<T, E>;
