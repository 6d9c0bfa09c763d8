use crate::calldata::CalldataValue;
use alloy::{
    primitives::{Address, Bytes},
    rlp::{Buf, BufMut},
};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::ToPrimitive;
use std::collections::BTreeMap;

type Result<T, E = CalldataDecodeError> = std::result::Result<T, E>;

// Value types, stored in the low 3 bits of every header
const TYPE_SPECIAL: u8 = 0;
const TYPE_PINT: u8 = 1;
const TYPE_NINT: u8 = 2;
const TYPE_BYTES: u8 = 3;
const TYPE_STR: u8 = 4;
const TYPE_ARR: u8 = 5;
const TYPE_MAP: u8 = 6;

const TYPE_BITS: u32 = 3;
const TYPE_MASK: u8 = 0b111;

// Special headers
const SPECIAL_NULL: u8 = 0 << TYPE_BITS;
const SPECIAL_FALSE: u8 = 1 << TYPE_BITS;
const SPECIAL_TRUE: u8 = 2 << TYPE_BITS;
const SPECIAL_ADDR: u8 = 3 << TYPE_BITS;
const SPECIAL_METHOD: u8 = 4 << TYPE_BITS;

// Headers whose payload no longer fits a u64 once shifted.
const SMALL_PAYLOAD_LIMIT: u64 = 1 << (64 - TYPE_BITS);

/// Maximum nesting of arrays and maps accepted by the decoder.
pub const MAX_DECODE_DEPTH: usize = 256;

/// Coarse classification of a [`CalldataDecodeError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DecodeErrorReason {
    /// The input ended before the value did.
    Truncated,
    /// A header carried an unknown type or special value.
    BadTag,
    /// A declared length is unusable, or bytes remain after the value.
    BadLength,
    /// A string or map key is not valid UTF-8.
    InvalidUtf8,
}

impl DecodeErrorReason {
    /// Get the reason as a static string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Truncated => "truncated",
            Self::BadTag => "bad-tag",
            Self::BadLength => "bad-length",
            Self::InvalidUtf8 => "invalid-utf8",
        }
    }
}

impl core::fmt::Display for DecodeErrorReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error decoding calldata.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CalldataDecodeError {
    /// The buffer does not contain enough data to decode the value.
    #[error("buffer overrun while decoding {ty_name}. Expected {expected} bytes, but only {remaining} bytes remain")]
    Overrun {
        /// The name of the type being decoded.
        ty_name: &'static str,
        /// The number of bytes required to decode the type.
        expected: usize,
        /// The number of bytes remaining in the buffer.
        remaining: usize,
    },

    /// Invalid header while decoding a value.
    #[error("invalid tag while decoding calldata: header {header}")]
    InvalidTag {
        /// The full header that was decoded.
        header: BigUint,
    },

    /// A declared length does not fit in memory.
    #[error("length {len} of {ty_name} does not fit in usize")]
    LengthOverflow {
        /// The name of the type being decoded.
        ty_name: &'static str,
        /// The declared length.
        len: BigUint,
    },

    /// Arrays and maps are nested deeper than [`MAX_DECODE_DEPTH`].
    #[error("calldata nested deeper than {MAX_DECODE_DEPTH} levels")]
    TooDeep,

    /// Bytes remain after a complete value.
    #[error("{remaining} trailing bytes after calldata value")]
    TrailingBytes {
        /// The number of bytes left over.
        remaining: usize,
    },

    /// A string or map key is not valid UTF-8.
    #[error("invalid utf-8 while decoding {ty_name}: {source}")]
    InvalidUtf8 {
        /// The name of the type being decoded.
        ty_name: &'static str,
        /// The underlying error.
        #[source]
        source: std::str::Utf8Error,
    },
}

impl CalldataDecodeError {
    /// Get the coarse reason for this error.
    pub const fn reason(&self) -> DecodeErrorReason {
        match self {
            Self::Overrun { .. } => DecodeErrorReason::Truncated,
            Self::InvalidTag { .. } => DecodeErrorReason::BadTag,
            Self::LengthOverflow { .. } | Self::TooDeep | Self::TrailingBytes { .. } => {
                DecodeErrorReason::BadLength
            }
            Self::InvalidUtf8 { .. } => DecodeErrorReason::InvalidUtf8,
        }
    }
}

/// Error building calldata values.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CalldataEncodeError {
    /// An address was built from a slice of the wrong length.
    #[error("invalid address length: expected 20 bytes, got {0}")]
    InvalidAddressLength(usize),
    /// The host value has no calldata representation.
    #[error("unsupported value type: {0}")]
    UnsupportedType(&'static str),
}

macro_rules! check_len {
    ($buf:ident, $ty_name:expr, $len:expr) => {
        let rem = $buf.remaining();
        if rem < $len {
            return Err(CalldataDecodeError::Overrun {
                ty_name: $ty_name,
                expected: $len,
                remaining: rem,
            });
        }
    };
}

/// Number of bytes in the LEB128 encoding of a value with `bits` significant
/// bits.
const fn leb_len(bits: u64) -> usize {
    if bits == 0 {
        1
    } else {
        bits.div_ceil(7) as usize
    }
}

/// Number of bytes in a header whose payload has `payload_bits` significant
/// bits.
const fn header_len(payload_bits: u64) -> usize {
    if payload_bits == 0 {
        1
    } else {
        leb_len(payload_bits + TYPE_BITS as u64)
    }
}

const fn usize_bits(n: usize) -> u64 {
    (usize::BITS - n.leading_zeros()) as u64
}

fn write_leb(buf: &mut dyn BufMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

fn write_big_leb(buf: &mut dyn BufMut, value: &BigUint) {
    let digits = value.to_radix_le(128);
    let last = digits.len().saturating_sub(1);
    for (i, digit) in digits.into_iter().enumerate() {
        buf.put_u8(if i == last { digit } else { digit | 0x80 });
    }
}

fn write_header(buf: &mut dyn BufMut, ty: u8, payload: u64) {
    if payload < SMALL_PAYLOAD_LIMIT {
        write_leb(buf, (payload << TYPE_BITS) | ty as u64);
    } else {
        write_big_leb(buf, &((BigUint::from(payload) << TYPE_BITS) | BigUint::from(ty)));
    }
}

fn write_big_header(buf: &mut dyn BufMut, ty: u8, payload: &BigUint) {
    match payload.to_u64() {
        Some(small) => write_header(buf, ty, small),
        None => write_big_leb(buf, &((payload << TYPE_BITS) | BigUint::from(ty))),
    }
}

/// Split an integer into its wire type and the header payload.
fn int_parts(value: &BigInt) -> (u8, BigUint) {
    match value.sign() {
        Sign::Minus => (TYPE_NINT, value.magnitude() - 1u32),
        _ => (TYPE_PINT, value.magnitude().clone()),
    }
}

fn read_leb(buf: &mut &[u8], ty_name: &'static str) -> Result<BigUint> {
    let mut small = 0u64;
    let mut big: Option<BigUint> = None;
    let mut shift = 0u64;
    loop {
        check_len!(buf, ty_name, 1);
        let byte = buf.get_u8();
        let chunk = u64::from(byte & 0x7f);
        if big.is_none() && shift > 56 {
            big = Some(BigUint::from(small));
        }
        match big.as_mut() {
            Some(big) => *big |= BigUint::from(chunk) << shift,
            None => small |= chunk << shift,
        }
        shift += 7;
        if byte & 0x80 == 0 {
            break;
        }
    }
    Ok(big.unwrap_or_else(|| BigUint::from(small)))
}

fn read_len(buf: &mut &[u8], ty_name: &'static str) -> Result<usize> {
    let len = read_leb(buf, ty_name)?;
    len.to_usize().ok_or(CalldataDecodeError::LengthOverflow { ty_name, len })
}

fn read_str(buf: &mut &[u8], ty_name: &'static str, len: usize) -> Result<String> {
    check_len!(buf, ty_name, len);
    let s = std::str::from_utf8(&buf[..len])
        .map_err(|source| CalldataDecodeError::InvalidUtf8 { ty_name, source })?
        .to_owned();
    buf.advance(len);
    Ok(s)
}

fn payload_len(payload: BigUint, ty_name: &'static str) -> Result<usize> {
    payload.to_usize().ok_or(CalldataDecodeError::LengthOverflow { ty_name, len: payload })
}

impl CalldataValue {
    /// Return the serialized size of the value, in bytes.
    pub fn serialized_size(&self) -> usize {
        match self {
            Self::Null | Self::Bool(_) => 1,
            Self::Address(_) => 1 + Address::len_bytes(),
            Self::Int(i) => header_len(int_parts(i).1.bits()),
            Self::Bytes(b) => header_len(usize_bits(b.len())) + b.len(),
            Self::String(s) => header_len(usize_bits(s.len())) + s.len(),
            Self::Method(name) => 1 + leb_len(usize_bits(name.len())) + name.len(),
            Self::Array(items) => {
                header_len(usize_bits(items.len()))
                    + items.iter().map(Self::serialized_size).sum::<usize>()
            }
            Self::Map(map) => {
                header_len(usize_bits(map.len()))
                    + map
                        .iter()
                        .map(|(k, v)| leb_len(usize_bits(k.len())) + k.len() + v.serialized_size())
                        .sum::<usize>()
            }
        }
    }

    /// Encode the value into the buffer.
    pub fn encode(&self, buf: &mut dyn BufMut) {
        match self {
            Self::Null => buf.put_u8(SPECIAL_NULL),
            Self::Bool(false) => buf.put_u8(SPECIAL_FALSE),
            Self::Bool(true) => buf.put_u8(SPECIAL_TRUE),
            Self::Address(addr) => {
                buf.put_u8(SPECIAL_ADDR);
                buf.put_slice(addr.as_slice());
            }
            Self::Method(name) => {
                buf.put_u8(SPECIAL_METHOD);
                write_leb(buf, name.len() as u64);
                buf.put_slice(name.as_bytes());
            }
            Self::Int(i) => {
                let (ty, payload) = int_parts(i);
                write_big_header(buf, ty, &payload);
            }
            Self::Bytes(b) => {
                write_header(buf, TYPE_BYTES, b.len() as u64);
                buf.put_slice(b);
            }
            Self::String(s) => {
                write_header(buf, TYPE_STR, s.len() as u64);
                buf.put_slice(s.as_bytes());
            }
            Self::Array(items) => {
                write_header(buf, TYPE_ARR, items.len() as u64);
                items.iter().for_each(|item| item.encode(buf));
            }
            Self::Map(map) => {
                write_header(buf, TYPE_MAP, map.len() as u64);
                for (key, value) in map {
                    write_leb(buf, key.len() as u64);
                    buf.put_slice(key.as_bytes());
                    value.encode(buf);
                }
            }
        }
    }

    /// Shortcut to encode the value into a new vec.
    pub fn encoded(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.serialized_size());
        self.encode(&mut buf);
        buf
    }

    /// Decode one value from the front of the buffer, advancing it past the
    /// consumed bytes. Trailing bytes are left in the buffer.
    pub fn decode(buf: &mut &[u8]) -> Result<Self> {
        Self::decode_at_depth(buf, 0)
    }

    fn decode_at_depth(buf: &mut &[u8], depth: usize) -> Result<Self> {
        check_len!(buf, "CalldataValue", 1);
        let ty = buf[0] & TYPE_MASK;
        let header = read_leb(buf, "CalldataValue")?;
        let payload = &header >> TYPE_BITS;

        match ty {
            TYPE_SPECIAL => match header.to_u8() {
                Some(SPECIAL_NULL) => Ok(Self::Null),
                Some(SPECIAL_FALSE) => Ok(Self::Bool(false)),
                Some(SPECIAL_TRUE) => Ok(Self::Bool(true)),
                Some(SPECIAL_ADDR) => {
                    check_len!(buf, "Address", Address::len_bytes());
                    let addr = Address::from_slice(&buf[..Address::len_bytes()]);
                    buf.advance(Address::len_bytes());
                    Ok(Self::Address(addr))
                }
                Some(SPECIAL_METHOD) => {
                    let len = read_len(buf, "Method")?;
                    read_str(buf, "Method", len).map(Self::Method)
                }
                _ => Err(CalldataDecodeError::InvalidTag { header }),
            },
            TYPE_PINT => Ok(Self::Int(BigInt::from(payload))),
            TYPE_NINT => Ok(Self::Int(-BigInt::from(payload) - 1)),
            TYPE_BYTES => {
                let len = payload_len(payload, "Bytes")?;
                check_len!(buf, "Bytes", len);
                let bytes = Bytes::copy_from_slice(&buf[..len]);
                buf.advance(len);
                Ok(Self::Bytes(bytes))
            }
            TYPE_STR => {
                let len = payload_len(payload, "String")?;
                read_str(buf, "String", len).map(Self::String)
            }
            TYPE_ARR => {
                if depth >= MAX_DECODE_DEPTH {
                    return Err(CalldataDecodeError::TooDeep);
                }
                let len = payload_len(payload, "Array")?;
                // every element takes at least one byte
                check_len!(buf, "Array", len);
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(Self::decode_at_depth(buf, depth + 1)?);
                }
                Ok(Self::Array(items))
            }
            TYPE_MAP => {
                if depth >= MAX_DECODE_DEPTH {
                    return Err(CalldataDecodeError::TooDeep);
                }
                let len = payload_len(payload, "Map")?;
                let mut map = BTreeMap::new();
                for _ in 0..len {
                    let key_len = read_len(buf, "MapKey")?;
                    let key = read_str(buf, "MapKey", key_len)?;
                    let value = Self::decode_at_depth(buf, depth + 1)?;
                    map.insert(key, value);
                }
                Ok(Self::Map(map))
            }
            _ => Err(CalldataDecodeError::InvalidTag { header }),
        }
    }
}

/// Encode a calldata value.
pub fn encode(value: &CalldataValue) -> Vec<u8> {
    value.encoded()
}

/// Decode a calldata value that spans the whole input.
pub fn decode(data: &[u8]) -> Result<CalldataValue> {
    decode_prefix(data).and_then(|(value, consumed)| {
        if consumed == data.len() {
            Ok(value)
        } else {
            Err(CalldataDecodeError::TrailingBytes { remaining: data.len() - consumed })
        }
    })
}

/// Decode one calldata value from the front of the input, returning the value
/// and the number of bytes it occupied.
pub fn decode_prefix(data: &[u8]) -> Result<(CalldataValue, usize)> {
    let mut buf = data;
    let value = CalldataValue::decode(&mut buf)?;
    Ok((value, data.len() - buf.len()))
}
