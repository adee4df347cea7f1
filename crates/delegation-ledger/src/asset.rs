//! Currencies and asset values
//!
//! An asset value is always a `(currency, minor units)` pair. Arithmetic on
//! two values of different currencies is an error, never a silent mix, which
//! is what keeps shares and bonded tokens from being confused.

use crate::address::Address;
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

/// Basis points denominator (10000 = 100%)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Ticker used for every delegatee's share currency
pub const SHARE_TICKER: &str = "SHARE";

/// Currency identity: ticker, decimal precision, optional minter set
///
/// Two currencies are equal only if all three match.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Currency {
    pub ticker: String,
    pub decimal_places: u8,
    #[serde(default)]
    pub minters: Option<BTreeSet<Address>>,
}

impl Currency {
    /// Currency anyone may mint
    pub fn new(ticker: impl Into<String>, decimal_places: u8) -> Self {
        Self {
            ticker: ticker.into(),
            decimal_places,
            minters: None,
        }
    }

    /// Currency with a fixed minter set
    pub fn with_minters(
        ticker: impl Into<String>,
        decimal_places: u8,
        minters: impl IntoIterator<Item = Address>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            decimal_places,
            minters: Some(minters.into_iter().collect()),
        }
    }

    /// Share currency of a specific delegatee
    ///
    /// The delegatee address is the sole minter, so shares of two different
    /// delegatees are distinct currencies.
    pub fn share_of(delegatee: Address, decimal_places: u8) -> Self {
        Self::with_minters(SHARE_TICKER, decimal_places, [delegatee])
    }

    /// Whether `address` may mint or burn this currency
    pub fn can_mint(&self, address: &Address) -> bool {
        match &self.minters {
            None => true,
            Some(minters) => minters.contains(address),
        }
    }

    /// Stable hash of the currency identity (hex, 8 bytes)
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.ticker.as_bytes());
        hasher.update([self.decimal_places]);
        if let Some(minters) = &self.minters {
            for minter in minters {
                hasher.update(minter.as_bytes());
            }
        }
        hex::encode(&hasher.finalize()[..8])
    }

    pub fn zero(&self) -> AssetValue {
        AssetValue::zero(self.clone())
    }

    pub fn value(&self, raw: u128) -> AssetValue {
        AssetValue::new(self.clone(), raw)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ticker == SHARE_TICKER {
            write!(f, "{}#{}", self.ticker, self.id())
        } else {
            f.write_str(&self.ticker)
        }
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency({}, {})", self, self.decimal_places)
    }
}

/// Amount of a single currency in minor units
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetValue {
    currency: Currency,
    raw: u128,
}

impl AssetValue {
    pub fn new(currency: Currency, raw: u128) -> Self {
        Self { currency, raw }
    }

    pub fn zero(currency: Currency) -> Self {
        Self { currency, raw: 0 }
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn raw(&self) -> u128 {
        self.raw
    }

    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Fail unless this value is denominated in `expected`
    pub fn ensure_currency(&self, expected: &Currency) -> Result<(), AssetError> {
        if &self.currency == expected {
            Ok(())
        } else {
            Err(AssetError::CurrencyMismatch {
                expected: expected.to_string(),
                actual: self.currency.to_string(),
            })
        }
    }

    pub fn checked_add(&self, other: &AssetValue) -> Result<AssetValue, AssetError> {
        other.ensure_currency(&self.currency)?;
        let raw = self.raw.checked_add(other.raw).ok_or(AssetError::Overflow)?;
        Ok(Self::new(self.currency.clone(), raw))
    }

    /// Subtract, failing if `other` exceeds `self`
    pub fn checked_sub(&self, other: &AssetValue) -> Result<AssetValue, AssetError> {
        other.ensure_currency(&self.currency)?;
        let raw = self
            .raw
            .checked_sub(other.raw)
            .ok_or_else(|| AssetError::InsufficientAmount {
                available: self.to_string(),
                requested: other.to_string(),
            })?;
        Ok(Self::new(self.currency.clone(), raw))
    }

    /// Subtract, flooring at zero
    pub fn saturating_sub(&self, other: &AssetValue) -> Result<AssetValue, AssetError> {
        other.ensure_currency(&self.currency)?;
        Ok(Self::new(self.currency.clone(), self.raw.saturating_sub(other.raw)))
    }

    /// `self * numerator / denominator`, truncated toward zero
    pub fn mul_div(&self, numerator: u128, denominator: u128) -> Result<AssetValue, AssetError> {
        let raw = mul_div(self.raw, numerator, denominator).ok_or(AssetError::Overflow)?;
        Ok(Self::new(self.currency.clone(), raw))
    }

    /// Portion of this value given in basis points, truncated
    pub fn bps(&self, bps: u64) -> Result<AssetValue, AssetError> {
        self.mul_div(bps as u128, BPS_DENOMINATOR as u128)
    }

    pub fn min(&self, other: &AssetValue) -> Result<AssetValue, AssetError> {
        other.ensure_currency(&self.currency)?;
        Ok(Self::new(self.currency.clone(), self.raw.min(other.raw)))
    }
}

impl fmt::Display for AssetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.raw, self.currency)
    }
}

impl fmt::Debug for AssetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetValue({})", self)
    }
}

/// `a * b / c` without intermediate overflow, truncated toward zero
///
/// Returns `None` when `c == 0` or the result does not fit in `u128`.
pub fn mul_div(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    match a.checked_mul(b) {
        Some(product) => Some(product / c),
        None => {
            let wide = BigUint::from(a) * BigUint::from(b) / BigUint::from(c);
            wide.to_u128()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error("currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: String, actual: String },

    #[error("insufficient balance of {address}: has {balance}, needs {requested}")]
    InsufficientBalance {
        address: Address,
        balance: String,
        requested: String,
    },

    #[error("insufficient amount: {available} < {requested}")]
    InsufficientAmount { available: String, requested: String },

    #[error("{signer} has no minting authority over {currency}")]
    NoMintingAuthority { signer: Address, currency: String },

    #[error("arithmetic overflow")]
    Overflow,
}
