use crate::calldata::{self, CalldataDecodeError, CalldataValue};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};

/// Status written as the first byte of an execution result blob.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResultCode {
    /// Successful return. The payload is calldata.
    Return = 0,
    /// The contract rolled back. The payload is a UTF-8 message.
    Rollback = 1,
    /// The contract raised an error. The payload is a UTF-8 message.
    ContractError = 2,
    /// The VM failed.
    Error = 3,
    /// No result.
    None = 4,
    /// No leader produced a result.
    NoLeaders = 5,
}

impl ResultCode {
    /// Look up a code by its byte value.
    pub const fn from_u8(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Return,
            1 => Self::Rollback,
            2 => Self::ContractError,
            3 => Self::Error,
            4 => Self::None,
            5 => Self::NoLeaders,
            _ => return None,
        })
    }

    /// The status name used in user-facing JSON.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Return => "return",
            Self::Rollback => "rollback",
            Self::ContractError => "contract_error",
            Self::Error => "error",
            Self::None => "none",
            Self::NoLeaders => "no_leaders",
        }
    }
}

/// Status name for result blobs with an unrecognized first byte.
pub const UNKNOWN_RESULT_STATUS: &str = "<unknown>";

/// Error decoding an execution result.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResultDecodeError {
    /// The result is not valid base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// A return payload is not valid calldata.
    #[error(transparent)]
    Calldata(#[from] CalldataDecodeError),
}

/// The payload following the status byte of a result blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultPayload {
    /// A returned value.
    Calldata(CalldataValue),
    /// A rollback or contract-error message.
    Message(String),
    /// Statuses that carry no payload.
    Empty,
}

/// A decoded execution result blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// The status, or `None` if the first byte is not a known code.
    pub code: Option<ResultCode>,
    /// The decoded payload.
    pub payload: ResultPayload,
}

impl ExecutionResult {
    /// The status name, or [`UNKNOWN_RESULT_STATUS`].
    pub fn status(&self) -> &'static str {
        self.code.as_ref().map_or(UNKNOWN_RESULT_STATUS, ResultCode::as_str)
    }
}

/// Decode an execution result blob: a status byte followed by the payload.
///
/// Return payloads are decoded as calldata, rollback and contract-error
/// payloads as (lossy) UTF-8 text. Every other status, and an empty blob,
/// has no payload.
pub fn decode_result_blob(blob: &[u8]) -> Result<ExecutionResult, CalldataDecodeError> {
    let code = blob.first().copied().and_then(ResultCode::from_u8);
    let rest = blob.get(1..).unwrap_or_default();

    let payload = match code {
        Some(ResultCode::Return) => ResultPayload::Calldata(calldata::decode(rest)?),
        Some(ResultCode::Rollback | ResultCode::ContractError) => {
            ResultPayload::Message(String::from_utf8_lossy(rest).into_owned())
        }
        _ => ResultPayload::Empty,
    };
    Ok(ExecutionResult { code, payload })
}

/// Render calldata bytes as `{raw, readable}`, where `raw` is the byte array
/// and `readable` is the display form of the decoded value.
pub fn calldata_to_user_friendly_json(data: &[u8]) -> Result<Value, CalldataDecodeError> {
    let value = calldata::decode(data)?;
    Ok(json!({
        "raw": data,
        "readable": value.to_string(),
    }))
}

/// Render an execution result blob as `{raw, status, payload}`. `raw` is
/// passed through as given.
pub fn result_blob_to_user_friendly_json(
    raw: &str,
    blob: &[u8],
) -> Result<Value, CalldataDecodeError> {
    let result = decode_result_blob(blob)?;
    let status = result.status();
    let payload = match result.payload {
        ResultPayload::Calldata(value) => json!({
            "raw": blob.get(1..).unwrap_or_default(),
            "readable": value.to_string(),
        }),
        ResultPayload::Message(message) => Value::String(message),
        ResultPayload::Empty => Value::Null,
    };

    Ok(json!({
        "raw": raw,
        "status": status,
        "payload": payload,
    }))
}

/// Decode a base64 execution result into `{raw, status, payload}`.
pub fn result_to_user_friendly_json(b64: &str) -> Result<Value, ResultDecodeError> {
    let blob = STANDARD.decode(b64)?;
    result_blob_to_user_friendly_json(b64, &blob).map_err(Into::into)
}
