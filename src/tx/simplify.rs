use serde_json::{Map, Value};

/// Keys removed at every level of a receipt.
pub const FIELDS_TO_REMOVE: &[&str] = &[
    "raw",
    "contract_state",
    "base64",
    "consensus_history",
    "tx_data",
    "eq_blocks_outputs",
    "r",
    "s",
    "v",
    "created_timestamp",
    "current_timestamp",
    "tx_execution_hash",
    "random_seed",
    "states",
    "contract_code",
    "appeal_failed",
    "appeal_leader_timeout",
    "appeal_processing_time",
    "appeal_undetermined",
    "appealed",
    "timestamp_appeal",
    "config_rotation_rounds",
    "rotation_count",
    "queue_position",
    "queue_type",
    "leader_timeout_validators",
    "triggered_by",
    "num_of_initial_validators",
    "timestamp_awaiting_finalization",
    "last_vote_timestamp",
    "read_state_block_range",
    "tx_slot",
    "blockHash",
    "blockNumber",
    "to",
    "transactionIndex",
];

/// Keys renamed on output, matching the python client's field names.
pub const FIELD_NAME_MAPPINGS: &[(&str, &str)] =
    &[("statusName", "status_name"), ("typeHex", "type")];

/// Per-node execution fields kept inside consensus data.
const EXECUTION_FIELDS: &[&str] =
    &["execution_result", "genvm_result", "mode", "vote", "node_config"];

const CONSENSUS_DATA: &str = "consensus_data";

fn map_key(key: &str) -> &str {
    FIELD_NAME_MAPPINGS.iter().find(|(from, _)| *from == key).map_or(key, |&(_, to)| to)
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Containers are always truthy; scalars follow the usual JSON falsiness.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn execution_info(receipt: &Value) -> Map<String, Value> {
    let Value::Object(receipt) = receipt else {
        return Map::new();
    };
    EXECUTION_FIELDS
        .iter()
        .filter_map(|&field| receipt.get(field).map(|v| (field.to_owned(), v.clone())))
        .collect()
}

fn simplify_leader_receipt(receipt: &Value, path: &str) -> Value {
    let mut out = execution_info(receipt);

    if let Some(readable) = receipt.get("calldata").and_then(|c| c.get("readable")) {
        let mut calldata = Map::new();
        calldata.insert("readable".to_owned(), readable.clone());
        out.insert("calldata".to_owned(), Value::Object(calldata));
    }
    for field in ["eq_outputs", "result"] {
        if let Some(value) = receipt.get(field).filter(|v| is_truthy(v)) {
            out.insert(field.to_owned(), simplify(value, path));
        }
    }

    Value::Object(out)
}

fn simplify_consensus_data(consensus: &Map<String, Value>, path: &str) -> Map<String, Value> {
    let mut out = Map::new();

    if let Some(votes) = consensus.get("votes") {
        out.insert("votes".to_owned(), votes.clone());
    }

    if let Some(Value::Array(receipts)) = consensus.get("leader_receipt") {
        let receipts = receipts.iter().map(|r| simplify_leader_receipt(r, path)).collect();
        out.insert("leader_receipt".to_owned(), Value::Array(receipts));
    }

    if let Some(Value::Array(validators)) = consensus.get("validators") {
        let validators: Vec<_> = validators
            .iter()
            .map(execution_info)
            .filter(|v| !v.is_empty())
            .map(Value::Object)
            .collect();
        if !validators.is_empty() {
            out.insert("validators".to_owned(), Value::Array(validators));
        }
    }

    out
}

fn simplify_object(obj: &Map<String, Value>, path: &str) -> Map<String, Value> {
    let mut out = Map::new();

    for (key, value) in obj {
        if FIELDS_TO_REMOVE.contains(&key.as_str()) {
            continue;
        }
        // node configs only survive inside consensus data
        if key == "node_config" && !path.contains(CONSENSUS_DATA) {
            continue;
        }

        let current_path = if path.is_empty() { key.clone() } else { format!("{path}.{key}") };

        if key == CONSENSUS_DATA {
            if let Value::Object(consensus) = value {
                let simplified = simplify_consensus_data(consensus, &current_path);
                out.insert(key.clone(), Value::Object(simplified));
                continue;
            }
        }

        let simplified = simplify(value, &current_path);
        if !is_empty_container(&simplified) {
            out.insert(map_key(key).to_owned(), simplified);
        }
    }

    out
}

fn simplify(value: &Value, path: &str) -> Value {
    match value {
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| simplify(item, path)).collect())
        }
        Value::Object(obj) => Value::Object(simplify_object(obj, path)),
        scalar => scalar.clone(),
    }
}

/// Strip a transaction receipt down to the fields a user cares about.
///
/// - keys in [`FIELDS_TO_REMOVE`] are dropped at every depth
/// - `node_config` is dropped unless it sits under `consensus_data`
/// - `consensus_data` keeps its votes, the execution fields of each leader
///   receipt (plus readable calldata and simplified outputs), and the
///   execution fields of each validator
/// - objects and arrays left empty are dropped; scalars, including `0`,
///   `false`, `""` and `null`, are kept
/// - keys in [`FIELD_NAME_MAPPINGS`] are renamed
///
/// The input is not modified, and simplifying twice gives the same result as
/// simplifying once.
pub fn simplify_transaction_receipt(tx: &Value) -> Value {
    simplify(tx, "")
}
