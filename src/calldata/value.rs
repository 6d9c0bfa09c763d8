use crate::calldata::CalldataEncodeError;
use alloy::primitives::{Address, Bytes, I256, U256};
use num_bigint::{BigInt, Sign};
use std::collections::BTreeMap;

/// A self-describing calldata value.
///
/// This is the value tree that the calldata codec operates on. Every variant
/// encodes to a tagged byte sequence that can be decoded without any external
/// type information.
///
/// Maps are keyed by strings and kept in a [`BTreeMap`], so iteration order is
/// the canonical (UTF-8 byte) order used on the wire. Two maps with the same
/// entries always compare equal and always encode to the same bytes,
/// regardless of the order in which the entries were inserted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CalldataValue {
    /// The null sentinel.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// An arbitrary-precision signed integer.
    Int(BigInt),
    /// A UTF-8 string.
    String(String),
    /// A raw byte string.
    Bytes(Bytes),
    /// A 20-byte account address.
    Address(Address),
    /// An ordered, possibly heterogeneous, list of values.
    Array(Vec<CalldataValue>),
    /// A string-keyed map of values.
    Map(BTreeMap<String, CalldataValue>),
    /// A method marker. When it is the first element of an [`Array`], the
    /// array is a call of the named method with the remaining elements as
    /// arguments.
    ///
    /// [`Array`]: CalldataValue::Array
    Method(String),
}

impl CalldataValue {
    /// Instantiate an address value from a byte slice, failing if the slice
    /// is not exactly 20 bytes long.
    pub fn address_from_slice(bytes: &[u8]) -> Result<Self, CalldataEncodeError> {
        if bytes.len() != Address::len_bytes() {
            return Err(CalldataEncodeError::InvalidAddressLength(bytes.len()));
        }
        Ok(Self::Address(Address::from_slice(bytes)))
    }

    /// Instantiate a method marker.
    pub fn method(name: impl Into<String>) -> Self {
        Self::Method(name.into())
    }

    /// Instantiate a method call: an array whose first element is the method
    /// marker, followed by the positional arguments.
    pub fn call<I>(method: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Self>,
    {
        let args = args.into_iter().map(Into::into);
        Self::Array(std::iter::once(Self::method(method)).chain(args).collect())
    }

    /// Get a short name for the variant, used in error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Address(_) => "address",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Method(_) => "method",
        }
    }

    /// True if the value is [`CalldataValue::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the boolean, if the value is a bool.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the integer, if the value is an int.
    pub const fn as_int(&self) -> Option<&BigInt> {
        match self {
            Self::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Get the string, if the value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the bytes, if the value is a byte string.
    pub const fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get the address, if the value is an address.
    pub const fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(a) => Some(*a),
            _ => None,
        }
    }

    /// Get the elements, if the value is an array.
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get the entries, if the value is a map.
    pub const fn as_map(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Get the method name, if the value is a method marker.
    pub fn as_method(&self) -> Option<&str> {
        match self {
            Self::Method(name) => Some(name),
            _ => None,
        }
    }

    /// If the value is a method call (an array led by a method marker),
    /// return the method name and the arguments.
    pub fn as_call(&self) -> Option<(&str, &[Self])> {
        let (first, rest) = self.as_array()?.split_first()?;
        first.as_method().map(|name| (name, rest))
    }
}

/// Build the map-shaped call object deployed contracts expect.
///
/// The object contains `method` when a method name is given, `args` when
/// there are positional arguments, and `kwargs` when there are keyword
/// arguments. Constructor calls pass `None` for the method.
pub fn make_calldata_object(
    method: Option<&str>,
    args: Vec<CalldataValue>,
    kwargs: BTreeMap<String, CalldataValue>,
) -> CalldataValue {
    let mut obj = BTreeMap::new();
    if let Some(method) = method {
        obj.insert("method".to_owned(), CalldataValue::String(method.to_owned()));
    }
    if !args.is_empty() {
        obj.insert("args".to_owned(), CalldataValue::Array(args));
    }
    if !kwargs.is_empty() {
        obj.insert("kwargs".to_owned(), CalldataValue::Map(kwargs));
    }
    CalldataValue::Map(obj)
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for CalldataValue {
                fn from(value: $t) -> Self {
                    Self::Int(BigInt::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl From<BigInt> for CalldataValue {
    fn from(value: BigInt) -> Self {
        Self::Int(value)
    }
}

impl From<U256> for CalldataValue {
    fn from(value: U256) -> Self {
        Self::Int(BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>()))
    }
}

impl From<I256> for CalldataValue {
    fn from(value: I256) -> Self {
        let (sign, abs) = value.into_sign_and_abs();
        let magnitude = BigInt::from_bytes_be(Sign::Plus, &abs.to_be_bytes::<32>());
        Self::Int(if sign.is_negative() { -magnitude } else { magnitude })
    }
}

impl From<bool> for CalldataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for CalldataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for CalldataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Bytes> for CalldataValue {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for CalldataValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value.into())
    }
}

impl From<Address> for CalldataValue {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<Vec<Self>> for CalldataValue {
    fn from(value: Vec<Self>) -> Self {
        Self::Array(value)
    }
}

impl From<BTreeMap<String, Self>> for CalldataValue {
    fn from(value: BTreeMap<String, Self>) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for CalldataValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl FromIterator<Self> for CalldataValue {
    fn from_iter<I: IntoIterator<Item = Self>>(iter: I) -> Self {
        Self::Array(iter.into_iter().collect())
    }
}

impl<K: Into<String>> FromIterator<(K, Self)> for CalldataValue {
    fn from_iter<I: IntoIterator<Item = (K, Self)>>(iter: I) -> Self {
        Self::Map(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn address_length_is_enforced() {
        assert_eq!(
            CalldataValue::address_from_slice(&[0xaa; 19]),
            Err(CalldataEncodeError::InvalidAddressLength(19))
        );
        assert_eq!(
            CalldataValue::address_from_slice(&[0xaa; 20]),
            Ok(CalldataValue::Address(Address::repeat_byte(0xaa)))
        );
    }

    #[test]
    fn wide_ints_convert() {
        let max = CalldataValue::from(U256::MAX);
        assert_eq!(max.as_int().unwrap().bits(), 256);

        let min = CalldataValue::from(I256::MIN);
        let expected = -(BigInt::from(1u8) << 255u32);
        assert_eq!(min, CalldataValue::Int(expected));
    }

    #[test]
    fn call_shape() {
        let call = CalldataValue::call("transfer", [CalldataValue::from(1u8)]);
        let (name, args) = call.as_call().unwrap();
        assert_eq!(name, "transfer");
        assert_eq!(args, &[CalldataValue::from(1u8)]);

        assert!(CalldataValue::Array(vec![]).as_call().is_none());
        assert!(CalldataValue::from(vec![CalldataValue::from("transfer")]).as_call().is_none());
    }

    #[test]
    fn calldata_object_omits_empty_parts() {
        let ctor = make_calldata_object(None, vec![], BTreeMap::new());
        assert_eq!(ctor, CalldataValue::Map(BTreeMap::new()));

        let obj = make_calldata_object(Some("get"), vec![5u8.into()], BTreeMap::new());
        let map = obj.as_map().unwrap();
        assert_eq!(map.get("method"), Some(&CalldataValue::from("get")));
        assert_eq!(map.get("args"), Some(&CalldataValue::Array(vec![5u8.into()])));
        assert!(!map.contains_key("kwargs"));
    }
}
