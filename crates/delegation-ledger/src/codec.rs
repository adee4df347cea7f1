//! Self-describing record encoding
//!
//! Records are stored as `List[Text(tag), field0, field1, ...]` built from
//! [`Value`] and serialized with bincode. Because every field carries its own
//! type, readers can:
//!
//! - ignore extra trailing fields written by a newer schema
//! - default missing optional trailing fields written by an older schema
//!
//! Field order is part of the format. Append new fields, never reorder.

use crate::address::Address;
use crate::asset::{AssetValue, Currency};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Encoded field tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(u128),
    Bytes(Vec<u8>),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::List(_) => "list",
        }
    }
}

/// Entity with a persisted form
pub trait Record: Sized {
    /// Record type tag, first element of the encoded list
    const TAG: &'static str;

    fn to_fields(&self) -> Vec<Value>;

    fn from_fields(fields: &mut FieldReader) -> Result<Self, CodecError>;
}

pub fn encode<R: Record>(record: &R) -> Result<Vec<u8>, CodecError> {
    let mut list = Vec::with_capacity(8);
    list.push(Value::Text(R::TAG.to_string()));
    list.extend(record.to_fields());
    bincode::serialize(&Value::List(list)).map_err(|e| CodecError::Bincode(e.to_string()))
}

pub fn decode<R: Record>(bytes: &[u8]) -> Result<R, CodecError> {
    let value: Value =
        bincode::deserialize(bytes).map_err(|e| CodecError::Bincode(e.to_string()))?;
    let items = match value {
        Value::List(items) => items,
        other => return Err(unexpected("root", "list", &other)),
    };

    let mut reader = FieldReader::new(items);
    let tag = reader.text("tag")?;
    if tag != R::TAG {
        return Err(CodecError::TagMismatch {
            expected: R::TAG,
            actual: tag,
        });
    }
    R::from_fields(&mut reader)
}

/// Sequential reader over the fields of one list
pub struct FieldReader {
    items: std::vec::IntoIter<Value>,
}

impl FieldReader {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }

    fn next(&mut self, field: &'static str) -> Result<Value, CodecError> {
        self.items.next().ok_or(CodecError::MissingField(field))
    }

    /// Next field, or `None` if absent or `Null` (optional trailing fields)
    pub fn optional(&mut self) -> Option<Value> {
        match self.items.next() {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }

    /// Optional trailing integer that must fit in `u64`
    pub fn optional_u64(&mut self, field: &'static str) -> Result<Option<u64>, CodecError> {
        match self.optional() {
            Some(Value::Integer(n)) => u64::try_from(n)
                .map(Some)
                .map_err(|_| CodecError::OutOfRange(field)),
            Some(other) => Err(unexpected(field, "integer", &other)),
            None => Ok(None),
        }
    }

    pub fn integer(&mut self, field: &'static str) -> Result<u128, CodecError> {
        match self.next(field)? {
            Value::Integer(n) => Ok(n),
            other => Err(unexpected(field, "integer", &other)),
        }
    }

    pub fn u64(&mut self, field: &'static str) -> Result<u64, CodecError> {
        let n = self.integer(field)?;
        u64::try_from(n).map_err(|_| CodecError::OutOfRange(field))
    }

    pub fn usize(&mut self, field: &'static str) -> Result<usize, CodecError> {
        let n = self.integer(field)?;
        usize::try_from(n).map_err(|_| CodecError::OutOfRange(field))
    }

    pub fn bool(&mut self, field: &'static str) -> Result<bool, CodecError> {
        match self.next(field)? {
            Value::Bool(b) => Ok(b),
            other => Err(unexpected(field, "bool", &other)),
        }
    }

    pub fn text(&mut self, field: &'static str) -> Result<String, CodecError> {
        match self.next(field)? {
            Value::Text(s) => Ok(s),
            other => Err(unexpected(field, "text", &other)),
        }
    }

    pub fn list(&mut self, field: &'static str) -> Result<Vec<Value>, CodecError> {
        match self.next(field)? {
            Value::List(items) => Ok(items),
            other => Err(unexpected(field, "list", &other)),
        }
    }

    pub fn address(&mut self, field: &'static str) -> Result<Address, CodecError> {
        let value = self.next(field)?;
        address_from_value(field, value)
    }

    pub fn currency(&mut self, field: &'static str) -> Result<Currency, CodecError> {
        let items = self.list(field)?;
        currency_from_fields(field, items)
    }

    pub fn asset(&mut self, field: &'static str) -> Result<AssetValue, CodecError> {
        let items = self.list(field)?;
        asset_from_fields(field, items)
    }

    pub fn currencies(&mut self, field: &'static str) -> Result<Vec<Currency>, CodecError> {
        self.list(field)?
            .into_iter()
            .map(|item| match item {
                Value::List(inner) => currency_from_fields(field, inner),
                other => Err(unexpected(field, "list", &other)),
            })
            .collect()
    }

    /// Nested record list, each element decoded with `decode_item`
    pub fn records<T>(
        &mut self,
        field: &'static str,
        mut decode_item: impl FnMut(&mut FieldReader) -> Result<T, CodecError>,
    ) -> Result<Vec<T>, CodecError> {
        self.list(field)?
            .into_iter()
            .map(|item| match item {
                Value::List(inner) => decode_item(&mut FieldReader::new(inner)),
                other => Err(unexpected(field, "list", &other)),
            })
            .collect()
    }

    pub fn address_set(&mut self, field: &'static str) -> Result<BTreeSet<Address>, CodecError> {
        self.list(field)?
            .into_iter()
            .map(|v| address_from_value(field, v))
            .collect()
    }
}

fn unexpected(field: &'static str, expected: &'static str, actual: &Value) -> CodecError {
    CodecError::UnexpectedKind {
        field,
        expected,
        actual: actual.kind(),
    }
}

fn address_from_value(field: &'static str, value: Value) -> Result<Address, CodecError> {
    match value {
        Value::Bytes(bytes) => {
            Address::try_from(bytes.as_slice()).map_err(|_| CodecError::OutOfRange(field))
        }
        other => Err(unexpected(field, "bytes", &other)),
    }
}

fn currency_from_fields(field: &'static str, items: Vec<Value>) -> Result<Currency, CodecError> {
    let mut reader = FieldReader::new(items);
    let ticker = reader.text(field)?;
    let decimal_places =
        u8::try_from(reader.integer(field)?).map_err(|_| CodecError::OutOfRange(field))?;
    let minters = match reader.optional() {
        Some(Value::List(list)) => Some(
            list.into_iter()
                .map(|v| address_from_value(field, v))
                .collect::<Result<BTreeSet<_>, _>>()?,
        ),
        Some(other) => return Err(unexpected(field, "list", &other)),
        None => None,
    };
    Ok(Currency {
        ticker,
        decimal_places,
        minters,
    })
}

fn asset_from_fields(field: &'static str, items: Vec<Value>) -> Result<AssetValue, CodecError> {
    let mut reader = FieldReader::new(items);
    let currency = reader.currency(field)?;
    let raw = reader.integer(field)?;
    Ok(AssetValue::new(currency, raw))
}

impl From<&Address> for Value {
    fn from(address: &Address) -> Self {
        Value::Bytes(address.as_bytes().to_vec())
    }
}

impl From<&Currency> for Value {
    fn from(currency: &Currency) -> Self {
        let minters = match &currency.minters {
            Some(set) => Value::List(set.iter().map(Value::from).collect()),
            None => Value::Null,
        };
        Value::List(vec![
            Value::Text(currency.ticker.clone()),
            Value::Integer(currency.decimal_places as u128),
            minters,
        ])
    }
}

impl From<&AssetValue> for Value {
    fn from(value: &AssetValue) -> Self {
        Value::List(vec![Value::from(value.currency()), Value::Integer(value.raw())])
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Integer(n as u128)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Integer(n as u128)
    }
}

impl From<&BTreeSet<Address>> for Value {
    fn from(set: &BTreeSet<Address>) -> Self {
        Value::List(set.iter().map(Value::from).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("bincode: {0}")]
    Bincode(String),

    #[error("record tag mismatch: expected {expected}, got {actual}")]
    TagMismatch { expected: &'static str, actual: String },

    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("field {field}: expected {expected}, got {actual}")]
    UnexpectedKind {
        field: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("field {0} out of range")]
    OutOfRange(&'static str),

    #[error("field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
