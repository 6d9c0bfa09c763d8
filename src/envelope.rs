use crate::calldata::{self, CalldataDecodeError, CalldataValue};
use alloy::{
    primitives::{hex, Address, Bytes},
    rlp::{self, Decodable},
};
use serde::Serialize;

/// Leader-only flag as written in the envelope.
const LEADER_ONLY: &[u8] = &[0x01];

/// Flag for a transaction every validator executes.
const ALL_VALIDATORS: &[u8] = &[0x00];

/// Error unwrapping transaction input data.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The input is not an RLP list of byte strings.
    #[error("invalid RLP envelope: {0}")]
    Rlp(#[from] rlp::Error),
    /// The envelope has neither the call nor the deploy shape.
    #[error("unexpected envelope length {0}, expected 2 or 3 elements")]
    UnexpectedLength(usize),
    /// The embedded calldata is malformed.
    #[error(transparent)]
    Calldata(#[from] CalldataDecodeError),
}

/// A contract deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployData {
    /// The contract source.
    pub code: String,
    /// Decoded constructor arguments, if any were provided.
    pub constructor_args: Option<CalldataValue>,
    /// Whether only the leader executes the transaction.
    pub leader_only: bool,
    /// Address of the contract being deployed, taken from the transaction's
    /// recipient.
    pub contract_address: Address,
}

/// A contract call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallData {
    /// Decoded calldata, if any was provided.
    pub call_data: Option<CalldataValue>,
    /// Whether only the leader executes the transaction.
    pub leader_only: bool,
}

/// Decoded transaction input data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputData {
    /// A deployment: `[code, constructor_calldata, leader_only]`.
    Deploy(DeployData),
    /// A call: `[calldata, leader_only]`.
    Call(CallData),
}

impl InputData {
    /// Encode the input data back into its envelope.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Deploy(d) => {
                let args = d.constructor_args.as_ref();
                encode_deploy_envelope(d.code.as_bytes(), args, d.leader_only)
            }
            Self::Call(c) => encode_call_envelope(c.call_data.as_ref(), c.leader_only),
        }
    }

    /// The embedded calldata: constructor arguments for a deploy, or the call
    /// itself.
    pub const fn calldata(&self) -> Option<&CalldataValue> {
        match self {
            Self::Deploy(d) => d.constructor_args.as_ref(),
            Self::Call(c) => c.call_data.as_ref(),
        }
    }
}

fn optional_calldata(item: &[u8]) -> Result<Option<CalldataValue>, CalldataDecodeError> {
    if item.is_empty() {
        return Ok(None);
    }
    calldata::decode(item).map(Some)
}

fn flag(leader_only: bool) -> Bytes {
    if leader_only {
        Bytes::from_static(LEADER_ONLY)
    } else {
        Bytes::from_static(ALL_VALIDATORS)
    }
}

fn encoded_or_empty(value: Option<&CalldataValue>) -> Bytes {
    value.map(CalldataValue::encoded).unwrap_or_default().into()
}

/// Wrap a call into its envelope.
pub fn encode_call_envelope(call: Option<&CalldataValue>, leader_only: bool) -> Vec<u8> {
    rlp::encode(vec![encoded_or_empty(call), flag(leader_only)])
}

/// Wrap a deployment into its envelope.
pub fn encode_deploy_envelope(
    code: &[u8],
    constructor_args: Option<&CalldataValue>,
    leader_only: bool,
) -> Vec<u8> {
    rlp::encode(vec![
        Bytes::copy_from_slice(code),
        encoded_or_empty(constructor_args),
        flag(leader_only),
    ])
}

/// Unwrap transaction input data.
///
/// Returns `Ok(None)` when there is no input data. Otherwise the data must be
/// an RLP list of exactly 2 (call) or 3 (deploy) byte strings.
pub fn try_decode_input_data(
    data: &[u8],
    recipient: Address,
) -> Result<Option<InputData>, EnvelopeError> {
    if data.is_empty() {
        return Ok(None);
    }

    let mut buf = data;
    let items = Vec::<Bytes>::decode(&mut buf)?;
    if !buf.is_empty() {
        return Err(rlp::Error::UnexpectedLength.into());
    }

    match items.as_slice() {
        [code, args, leader_only] => Ok(Some(InputData::Deploy(DeployData {
            code: String::from_utf8_lossy(code).into_owned(),
            constructor_args: optional_calldata(args)?,
            leader_only: &leader_only[..] == LEADER_ONLY,
            contract_address: recipient,
        }))),
        [call, leader_only] => Ok(Some(InputData::Call(CallData {
            call_data: optional_calldata(call)?,
            leader_only: &leader_only[..] == LEADER_ONLY,
        }))),
        _ => Err(EnvelopeError::UnexpectedLength(items.len())),
    }
}

/// Unwrap transaction input data, logging and discarding any failure.
///
/// This never fails: absent data, a malformed envelope, and malformed
/// embedded calldata all produce `None`.
pub fn decode_input_data(data: Option<&[u8]>, recipient: Address) -> Option<InputData> {
    let data = match data {
        Some(data) if !data.is_empty() => data,
        _ => {
            tracing::debug!("no input data to decode");
            return None;
        }
    };

    match try_decode_input_data(data, recipient) {
        Ok(decoded) => decoded,
        Err(EnvelopeError::UnexpectedLength(len)) => {
            tracing::warn!(
                len,
                raw = %hex::encode_prefixed(data),
                "unexpected input data envelope length"
            );
            None
        }
        Err(error) => {
            tracing::error!(
                %error,
                raw = %hex::encode_prefixed(data),
                "failed to decode input data"
            );
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn contract() -> Address {
        Address::repeat_byte(0x42)
    }

    #[test]
    fn call_envelope() {
        let call = CalldataValue::call("get", [CalldataValue::from(1u8)]);
        let data = encode_call_envelope(Some(&call), true);

        let decoded = decode_input_data(Some(data.as_slice()), contract()).unwrap();
        assert_eq!(
            decoded,
            InputData::Call(CallData { call_data: Some(call), leader_only: true })
        );
        assert_eq!(decoded.encode(), data);
    }

    #[test]
    fn deploy_envelope() {
        let args: CalldataValue =
            [("args", CalldataValue::Array(vec![7u8.into()]))].into_iter().collect();
        let data = encode_deploy_envelope(b"class C: pass", Some(&args), false);

        let decoded = decode_input_data(Some(data.as_slice()), contract()).unwrap();
        assert_eq!(
            decoded,
            InputData::Deploy(DeployData {
                code: "class C: pass".to_owned(),
                constructor_args: Some(args),
                leader_only: false,
                contract_address: contract(),
            })
        );
    }

    #[test]
    fn empty_calldata_is_none() {
        let data = encode_deploy_envelope(b"code", None, true);
        let decoded = decode_input_data(Some(data.as_slice()), contract());
        let Some(InputData::Deploy(deploy)) = decoded else {
            panic!("expected deploy");
        };
        assert_eq!(deploy.constructor_args, None);
        assert!(deploy.leader_only);

        let data = encode_call_envelope(None, false);
        assert_eq!(
            decode_input_data(Some(data.as_slice()), contract()),
            Some(InputData::Call(CallData { call_data: None, leader_only: false }))
        );
    }

    #[test]
    fn flag_bytes() {
        let map: CalldataValue = [("x", CalldataValue::from(5u8))].into_iter().collect();
        assert_eq!(map.encoded(), [0x0e, 0x01, 0x78, 0x29]);

        let data = encode_call_envelope(Some(&map), false);
        assert_eq!(data, [0xc6, 0x84, 0x0e, 0x01, 0x78, 0x29, 0x00]);
        let data = encode_call_envelope(Some(&map), true);
        assert_eq!(data, [0xc6, 0x84, 0x0e, 0x01, 0x78, 0x29, 0x01]);

        let by_hand =
            rlp::encode(vec![Bytes::from(map.encoded()), Bytes::from_static(&[0x00])]);
        assert_eq!(
            try_decode_input_data(&by_hand, contract()).unwrap(),
            Some(InputData::Call(CallData { call_data: Some(map), leader_only: false }))
        );

        let data = encode_deploy_envelope(b"code", None, false);
        assert_eq!(data.last(), Some(&0x00));
    }

    #[test]
    fn absent_or_malformed() {
        assert_eq!(decode_input_data(None, contract()), None);
        assert_eq!(decode_input_data(Some(&[][..]), contract()), None);

        // not RLP
        assert_eq!(decode_input_data(Some(&[0xff, 0x00][..]), contract()), None);

        // wrong element count
        let data = rlp::encode(vec![Bytes::new(); 4]);
        assert_eq!(
            try_decode_input_data(&data, contract()),
            Err(EnvelopeError::UnexpectedLength(4))
        );
        assert_eq!(decode_input_data(Some(data.as_slice()), contract()), None);

        // bad calldata inside a well-formed envelope
        let data = rlp::encode(vec![Bytes::from_static(&[0x07]), Bytes::new()]);
        assert!(matches!(
            try_decode_input_data(&data, contract()),
            Err(EnvelopeError::Calldata(_))
        ));
        assert_eq!(decode_input_data(Some(data.as_slice()), contract()), None);
    }

    #[test]
    fn serializes_with_type_tag() {
        let data = InputData::Call(CallData { call_data: Some(5u8.into()), leader_only: false });
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            serde_json::json!({"type": "call", "callData": 5, "leaderOnly": false})
        );
    }
}
