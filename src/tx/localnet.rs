//! Decoding for transactions returned by a local development node.
//!
//! The local node serves transactions as JSON with base64-encoded calldata
//! and results, and a string status. These helpers rewrite those records in
//! the same shape a consensus-contract transaction decodes to.

use crate::{
    result::{calldata_to_user_friendly_json, result_to_user_friendly_json, ResultDecodeError},
    tx::TransactionStatus,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{Map, Value};

/// Status string the local node uses for freshly activated transactions.
const ACTIVATED: &str = "ACTIVATED";

fn decode_calldata_b64(b64: &str) -> Result<Value, ResultDecodeError> {
    let bytes = STANDARD.decode(b64)?;
    let mut out = Map::new();
    out.insert("base64".to_owned(), Value::String(b64.to_owned()));
    if let Value::Object(decoded) = calldata_to_user_friendly_json(&bytes)? {
        out.extend(decoded);
    }
    Ok(Value::Object(out))
}

fn decode_eq_outputs(outputs: &Map<String, Value>) -> Map<String, Value> {
    outputs
        .iter()
        .map(|(key, value)| {
            let decoded = match value {
                Value::Object(_) | Value::Array(_) => value.clone(),
                Value::String(s) => result_to_user_friendly_json(s).unwrap_or_else(|error| {
                    tracing::warn!(%key, %error, "failed to decode equivalence output");
                    value.clone()
                }),
                _ => {
                    tracing::warn!(%key, "equivalence output is not a base64 string");
                    value.clone()
                }
            };
            (key.clone(), decoded)
        })
        .collect()
}

fn decode_leader_receipt(receipt: &mut Value) -> Result<(), ResultDecodeError> {
    let Value::Object(receipt) = receipt else {
        return Ok(());
    };

    if let Some(Value::String(result)) = receipt.get("result") {
        let decoded = result_to_user_friendly_json(result)?;
        receipt.insert("result".to_owned(), decoded);
    }
    if let Some(Value::String(calldata)) = receipt.get("calldata") {
        let decoded = decode_calldata_b64(calldata)?;
        receipt.insert("calldata".to_owned(), decoded);
    }
    if let Some(Value::Object(outputs)) = receipt.get("eq_outputs") {
        let decoded = decode_eq_outputs(outputs);
        receipt.insert("eq_outputs".to_owned(), Value::Object(decoded));
    }
    Ok(())
}

fn decode_in_place(tx: &mut Value) -> Result<(), ResultDecodeError> {
    if let Some(receipt) = tx.pointer_mut("/consensus_data/leader_receipt") {
        match receipt {
            Value::Array(receipts) => receipts.iter_mut().try_for_each(decode_leader_receipt)?,
            receipt => decode_leader_receipt(receipt)?,
        }
    }

    if let Some(data) = tx.get_mut("data") {
        if let Some(Value::String(calldata)) = data.get("calldata") {
            let decoded = decode_calldata_b64(calldata)?;
            data["calldata"] = decoded;
        }
    }
    Ok(())
}

/// Decode the base64 payloads of a local node transaction.
///
/// String results become `{raw, status, payload}`, string calldata becomes
/// `{base64, raw, readable}`, and string equivalence outputs are decoded as
/// results (entries that fail to decode are kept as they are). Records
/// without `data` are returned as-is. If any payload fails to decode, the
/// error is logged and the record is returned unchanged.
pub fn decode_localnet_transaction(tx: Value) -> Value {
    if tx.get("data").is_none_or(Value::is_null) {
        return tx;
    }

    let mut decoded = tx.clone();
    match decode_in_place(&mut decoded) {
        Ok(()) => decoded,
        Err(error) => {
            tracing::error!(%error, "failed to decode local node transaction");
            tx
        }
    }
}

/// Rewrite a local node's string status into the numeric `status` and
/// `statusName` pair. `ACTIVATED` is reported as `PENDING`.
pub fn normalize_localnet_status(tx: &mut Value) {
    let status = match tx.get("status") {
        Some(Value::String(status)) => status.clone(),
        _ => return,
    };
    let name = if status == ACTIVATED { TransactionStatus::Pending.as_str() } else { &status };

    match TransactionStatus::from_name(name) {
        Some(status) => {
            tx["status"] = Value::from(status.code());
            tx["statusName"] = Value::from(status.as_str());
        }
        None => {
            tracing::debug!(status = %name, "unrecognized local node status");
            tx["statusName"] = Value::from(name);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::calldata::CalldataValue;
    use serde_json::json;

    fn b64(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    #[test]
    fn decodes_receipts_and_data() {
        let calldata = b64(&CalldataValue::call("ping", [CalldataValue::from(1u8)]).encoded());
        let mut result = vec![0];
        result.extend(CalldataValue::from("pong").encoded());
        let result = b64(&result);

        let tx = json!({
            "hash": "0xabc",
            "data": {"calldata": calldata},
            "consensus_data": {
                "leader_receipt": [{
                    "result": result,
                    "calldata": calldata,
                    "eq_outputs": {"0": b64(b"\x01oops"), "1": {"already": "decoded"}, "2": "%%%"},
                }],
            },
        });

        let out = decode_localnet_transaction(tx);
        assert_eq!(out["data"]["calldata"]["base64"], calldata);
        assert_eq!(out["data"]["calldata"]["readable"], "ping(1)");

        let receipt = &out["consensus_data"]["leader_receipt"][0];
        assert_eq!(receipt["result"]["status"], "return");
        assert_eq!(receipt["result"]["payload"]["readable"], r#""pong""#);
        assert_eq!(receipt["calldata"]["readable"], "ping(1)");
        assert_eq!(receipt["eq_outputs"]["0"]["status"], "rollback");
        assert_eq!(receipt["eq_outputs"]["0"]["payload"], "oops");
        assert_eq!(receipt["eq_outputs"]["1"], json!({"already": "decoded"}));
        assert_eq!(receipt["eq_outputs"]["2"], "%%%");
    }

    #[test]
    fn single_receipt_object() {
        let tx = json!({
            "data": {},
            "consensus_data": {"leader_receipt": {"result": b64(&[4])}},
        });
        let out = decode_localnet_transaction(tx);
        assert_eq!(out["consensus_data"]["leader_receipt"]["result"]["status"], "none");
    }

    #[test]
    fn failures_leave_record_unchanged() {
        let tx = json!({
            "data": {"calldata": "not base64!"},
            "consensus_data": {"leader_receipt": [{"result": b64(&[4])}]},
        });
        assert_eq!(decode_localnet_transaction(tx.clone()), tx);

        let no_data = json!({"consensus_data": {"leader_receipt": [{"result": b64(&[4])}]}});
        assert_eq!(decode_localnet_transaction(no_data.clone()), no_data);
    }

    #[test]
    fn normalizes_status() {
        let mut tx = json!({"status": "ACTIVATED"});
        normalize_localnet_status(&mut tx);
        assert_eq!(tx, json!({"status": 1, "statusName": "PENDING"}));

        let mut tx = json!({"status": "FINALIZED"});
        normalize_localnet_status(&mut tx);
        assert_eq!(tx, json!({"status": 7, "statusName": "FINALIZED"}));

        let mut tx = json!({"status": 5});
        normalize_localnet_status(&mut tx);
        assert_eq!(tx, json!({"status": 5}));
    }
}
