//! The self-describing calldata format.
//!
//! Every value on the wire starts with a ULEB128 header. The low 3 bits of
//! the header select the type and the remaining bits carry a type-specific
//! payload:
//!
//! | type | name    | payload                                   |
//! |------|---------|-------------------------------------------|
//! | 0    | special | `0` null, `1` false, `2` true, `3` address (20 bytes follow), `4` method marker (ULEB length and UTF-8 name follow) |
//! | 1    | pint    | the non-negative integer `n`              |
//! | 2    | nint    | `-n - 1` for a negative integer `n`       |
//! | 3    | bytes   | byte length; the bytes follow             |
//! | 4    | str     | UTF-8 byte length; the bytes follow       |
//! | 5    | array   | element count; the elements follow        |
//! | 6    | map     | entry count; each entry is a ULEB key length, the UTF-8 key, then the value |
//!
//! Type 7 is reserved and rejected. Map entries are written in bytewise key
//! order so equal maps always encode identically.
//!
//! ```
//! use genlayer_core::calldata::{self, CalldataValue};
//!
//! let value: CalldataValue = [("x", CalldataValue::from(5u8))].into_iter().collect();
//! let bytes = calldata::encode(&value);
//! assert_eq!(bytes, [0x0e, 0x01, b'x', 0x29]);
//! assert_eq!(calldata::decode(&bytes).unwrap(), value);
//! ```

mod coder;
pub use coder::{
    decode, decode_prefix, encode, CalldataDecodeError, CalldataEncodeError, DecodeErrorReason,
    MAX_DECODE_DEPTH,
};

mod display;

mod json;
pub use json::MAX_SAFE_INTEGER;

pub mod schema;

mod value;
pub use value::{make_calldata_object, CalldataValue};
