use crate::calldata::{CalldataEncodeError, CalldataValue};
use alloy::primitives::hex;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Largest integer magnitude that survives a round trip through an IEEE-754
/// double, `2^53 - 1`.
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

fn int_to_json(i: &BigInt) -> Value {
    match i.to_i64() {
        Some(small) if small.unsigned_abs() <= MAX_SAFE_INTEGER as u64 => Value::from(small),
        _ => Value::String(i.to_string()),
    }
}

impl CalldataValue {
    /// Convert the value into plain JSON.
    ///
    /// Integers inside the safe double range become JSON numbers and larger
    /// ones become decimal strings. Bytes and addresses become lowercase `0x`
    /// hex strings, and method markers become their name.
    pub fn to_json_safe(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => int_to_json(i),
            Self::String(s) | Self::Method(s) => Value::String(s.clone()),
            Self::Bytes(b) => Value::String(hex::encode_prefixed(b)),
            Self::Address(a) => Value::String(hex::encode_prefixed(a)),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json_safe).collect()),
            Self::Map(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json_safe())).collect::<Map<_, _>>(),
            ),
        }
    }
}

impl Serialize for CalldataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_safe().serialize(serializer)
    }
}

impl TryFrom<Value> for CalldataValue {
    type Error = CalldataEncodeError;

    /// Lift plain JSON into calldata. Strings stay strings (no hex sniffing),
    /// and non-integral numbers are rejected.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Ok(match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::from(i)
                } else if let Some(u) = n.as_u64() {
                    Self::from(u)
                } else {
                    return Err(CalldataEncodeError::UnsupportedType("float"));
                }
            }
            Value::String(s) => Self::String(s),
            Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::try_from).collect::<Result<_, _>>()?)
            }
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| Self::try_from(v).map(|v| (k, v)))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}
