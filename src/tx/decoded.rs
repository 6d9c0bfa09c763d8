use crate::{
    envelope::{decode_input_data, InputData},
    tx::{
        simplify_transaction_receipt, ConsensusVersion, LastRound, RawTransaction,
        ReadStateBlockRange,
    },
};
use alloy::primitives::{Address, Bytes, B256};
use serde::Serialize;
use serde_json::{Map, Value};

/// [`ReadStateBlockRange`] with decimal block numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedBlockRange {
    /// Block in which the transaction was activated.
    pub activation_block: String,
    /// Block in which processing started.
    pub processing_block: String,
    /// Block in which the leader proposed.
    pub proposal_block: String,
}

impl From<&ReadStateBlockRange> for DecodedBlockRange {
    fn from(range: &ReadStateBlockRange) -> Self {
        Self {
            activation_block: range.activation_block.to_string(),
            processing_block: range.processing_block.to_string(),
            proposal_block: range.proposal_block.to_string(),
        }
    }
}

/// [`LastRound`] with decimal counters and named votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedRound {
    /// Round number.
    pub round: String,
    /// Index of the leader among the round validators.
    pub leader_index: String,
    /// Number of committed votes.
    pub votes_committed: String,
    /// Number of revealed votes.
    pub votes_revealed: String,
    /// Bond posted by an appealer.
    pub appeal_bond: String,
    /// Leader rotations left.
    pub rotations_left: String,
    /// Round result code.
    pub result: u8,
    /// Validators taking part in the round.
    pub round_validators: Vec<Address>,
    /// Vote codes, one per validator.
    pub validator_votes: Vec<u8>,
    /// Vote commitment hashes.
    pub validator_votes_hash: Vec<B256>,
    /// Result hashes.
    pub validator_result_hash: Vec<B256>,
    /// Vote names, one per entry of `validator_votes`.
    pub validator_votes_name: Vec<&'static str>,
}

impl DecodedRound {
    fn new(round: &LastRound, version: ConsensusVersion) -> Self {
        Self {
            round: round.round.to_string(),
            leader_index: round.leader_index.to_string(),
            votes_committed: round.votes_committed.to_string(),
            votes_revealed: round.votes_revealed.to_string(),
            appeal_bond: round.appeal_bond.to_string(),
            rotations_left: round.rotations_left.to_string(),
            result: round.result,
            round_validators: round.round_validators.clone(),
            validator_votes: round.validator_votes.clone(),
            validator_votes_hash: round.validator_votes_hash.clone(),
            validator_result_hash: round.validator_result_hash.clone(),
            validator_votes_name: round
                .validator_votes
                .iter()
                .map(|&vote| version.vote_name(vote))
                .collect(),
        }
    }
}

/// A transaction with its numeric fields rendered for display and its input
/// data unwrapped.
///
/// Large counters are decimal strings, status and result codes carry their
/// names, and `txDataDecoded` holds the unwrapped envelope when it decodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedTransaction {
    /// Timestamp of the last state change.
    pub current_timestamp: String,
    /// Account that submitted the transaction.
    pub sender: Address,
    /// Target contract.
    pub recipient: Address,
    /// Validators in the first round.
    pub num_of_initial_validators: String,
    /// Slot in the recipient's queue.
    pub tx_slot: String,
    /// Submission timestamp.
    pub created_timestamp: String,
    /// Timestamp of the last vote.
    pub last_vote_timestamp: String,
    /// Seed used for validator selection.
    pub random_seed: B256,
    /// Round result code.
    pub result: u8,
    /// Name of `result`, or `UNKNOWN`.
    pub result_name: &'static str,
    /// RLP envelope as received.
    pub tx_data: Option<Bytes>,
    /// The unwrapped input data, if present and well-formed.
    pub tx_data_decoded: Option<InputData>,
    /// Receipt hash.
    pub tx_receipt: B256,
    /// Messages emitted by the execution.
    pub messages: Vec<Value>,
    /// Queue the transaction sits in.
    pub queue_type: u8,
    /// Position in that queue.
    pub queue_position: String,
    /// Account that activated the transaction.
    pub activator: Address,
    /// Leader of the last round.
    pub last_leader: Address,
    /// Status code.
    pub status: u8,
    /// Name of `status`, or `UNKNOWN`.
    pub status_name: &'static str,
    /// Transaction id.
    pub tx_id: B256,
    /// Consensus block markers.
    pub read_state_block_range: DecodedBlockRange,
    /// Rounds run so far.
    pub num_of_rounds: String,
    /// The most recent round.
    pub last_round: DecodedRound,
    /// Encoded equivalence-principle outputs.
    pub eq_blocks_outputs: Bytes,
    /// Fields passed through from the raw record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DecodedTransaction {
    /// Serialize into JSON.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Serialize into JSON and strip it down with
    /// [`simplify_transaction_receipt`].
    pub fn simplified(&self) -> Result<Value, serde_json::Error> {
        self.to_json().map(|json| simplify_transaction_receipt(&json))
    }
}

/// Decode a raw transaction using the current code tables.
pub fn decode_transaction(raw: &RawTransaction) -> DecodedTransaction {
    decode_transaction_with(raw, ConsensusVersion::default())
}

/// Decode a raw transaction using the code tables of `version`.
///
/// Never fails. Malformed input data leaves `tx_data_decoded` empty, and
/// unknown codes are named `UNKNOWN`.
pub fn decode_transaction_with(
    raw: &RawTransaction,
    version: ConsensusVersion,
) -> DecodedTransaction {
    DecodedTransaction {
        current_timestamp: raw.current_timestamp.to_string(),
        sender: raw.sender,
        recipient: raw.recipient,
        num_of_initial_validators: raw.num_of_initial_validators.to_string(),
        tx_slot: raw.tx_slot.to_string(),
        created_timestamp: raw.created_timestamp.to_string(),
        last_vote_timestamp: raw.last_vote_timestamp.to_string(),
        random_seed: raw.random_seed,
        result: raw.result,
        result_name: version.result_name(raw.result),
        tx_data: raw.tx_data.clone(),
        tx_data_decoded: decode_input_data(
            raw.tx_data.as_ref().map(|data| &data[..]),
            raw.recipient,
        ),
        tx_receipt: raw.tx_receipt,
        messages: raw.messages.clone(),
        queue_type: raw.queue_type,
        queue_position: raw.queue_position.to_string(),
        activator: raw.activator,
        last_leader: raw.last_leader,
        status: raw.status,
        status_name: version.status_name(raw.status),
        tx_id: raw.tx_id,
        read_state_block_range: (&raw.read_state_block_range).into(),
        num_of_rounds: raw.num_of_rounds.to_string(),
        last_round: DecodedRound::new(&raw.last_round, version),
        eq_blocks_outputs: raw.eq_blocks_outputs.clone(),
        extra: raw.extra.clone(),
    }
}

impl From<&RawTransaction> for DecodedTransaction {
    fn from(raw: &RawTransaction) -> Self {
        decode_transaction(raw)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{envelope::CallData, test_utils};
    use alloy::primitives::U256;
    use serde_json::json;

    #[test]
    fn stringifies_counters() {
        let mut raw = test_utils::raw_transaction();
        raw.current_timestamp = U256::MAX;
        raw.last_round.appeal_bond = U256::from(10).pow(U256::from(18));

        let decoded = decode_transaction(&raw);
        assert_eq!(decoded.current_timestamp, U256::MAX.to_string());
        assert_eq!(decoded.last_round.appeal_bond, "1000000000000000000");
        assert_eq!(decoded.queue_position, raw.queue_position.to_string());
    }

    #[test]
    fn names_codes() {
        let mut raw = test_utils::raw_transaction();
        raw.status = 7;
        raw.result = 6;
        raw.last_round.validator_votes = vec![1, 2, 9];

        let decoded = decode_transaction(&raw);
        assert_eq!(decoded.status_name, "FINALIZED");
        assert_eq!(decoded.result_name, "MAJORITY_AGREE");
        assert_eq!(decoded.last_round.validator_votes_name, ["AGREE", "DISAGREE", "UNKNOWN"]);

        raw.status = 200;
        assert_eq!(decode_transaction(&raw).status_name, "UNKNOWN");
    }

    #[test]
    fn unwraps_input_data() {
        let raw = test_utils::raw_transaction();
        let decoded = decode_transaction(&raw);
        let Some(InputData::Call(CallData { call_data: Some(call), .. })) = &decoded.tx_data_decoded
        else {
            panic!("expected call data");
        };
        assert_eq!(call.as_call().map(|(name, _)| name), Some("transfer"));

        let mut raw = raw;
        raw.tx_data = Some(Bytes::from_static(&[0xc0]));
        assert_eq!(decode_transaction(&raw).tx_data_decoded, None);
        raw.tx_data = None;
        assert_eq!(decode_transaction(&raw).tx_data_decoded, None);
    }

    #[test]
    fn json_shape() {
        let mut raw = test_utils::raw_transaction();
        raw.extra.insert("consensus_data".to_owned(), json!({"votes": {"0x1": "agree"}}));

        let json = decode_transaction(&raw).to_json().unwrap();
        assert_eq!(json["statusName"], "ACCEPTED");
        assert_eq!(json["numOfRounds"], "1");
        assert_eq!(json["readStateBlockRange"]["proposalBlock"], "12");
        assert_eq!(json["txDataDecoded"]["type"], "call");
        assert_eq!(json["consensus_data"]["votes"]["0x1"], "agree");
        assert!(json["lastRound"]["validatorVotesName"].is_array());
    }
}
