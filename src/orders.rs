// src/orders.rs

//! Decoding of order-id lists from the wire.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

pub type OrderId = u32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderSetError {
    #[error("order list is missing")]
    Missing,

    #[error("order list is empty")]
    Empty,

    #[error("order list must be an array, got {0}")]
    NotAnArray(&'static str),

    #[error("order list element {index} is not a u32: {value}")]
    InvalidElement { index: usize, value: String },
}

/// Owned, non-empty list of order ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderIdSet(Vec<OrderId>);

impl OrderIdSet {
    /// Decode the `orders` parameter of an RPC request.
    ///
    /// `None` and JSON `null` are both treated as a missing list.
    pub fn decode(value: Option<&Value>) -> Result<Self, OrderSetError> {
        let items = match value {
            None | Some(Value::Null) => return Err(OrderSetError::Missing),
            Some(Value::Array(items)) => items,
            Some(other) => return Err(OrderSetError::NotAnArray(json_kind(other))),
        };

        let ids = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_u64()
                    .and_then(|v| OrderId::try_from(v).ok())
                    .ok_or_else(|| OrderSetError::InvalidElement {
                        index,
                        value: item.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::try_from(ids)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = OrderId> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[OrderId] {
        &self.0
    }

    /// Ids joined by single spaces, as passed on a command line.
    pub fn to_args(&self) -> String {
        self.to_string()
    }
}

impl TryFrom<Vec<OrderId>> for OrderIdSet {
    type Error = OrderSetError;

    fn try_from(ids: Vec<OrderId>) -> Result<Self, Self::Error> {
        if ids.is_empty() {
            return Err(OrderSetError::Empty);
        }
        Ok(Self(ids))
    }
}

impl fmt::Display for OrderIdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
