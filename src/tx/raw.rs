use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Blocks recorded while a transaction moved through consensus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadStateBlockRange {
    /// Block in which the transaction was activated.
    pub activation_block: U256,
    /// Block in which processing started.
    pub processing_block: U256,
    /// Block in which the leader proposed.
    pub proposal_block: U256,
}

/// The most recent consensus round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRound {
    /// Round number.
    pub round: U256,
    /// Index of the leader among the round validators.
    pub leader_index: U256,
    /// Number of committed votes.
    pub votes_committed: U256,
    /// Number of revealed votes.
    pub votes_revealed: U256,
    /// Bond posted by an appealer.
    pub appeal_bond: U256,
    /// Leader rotations left.
    pub rotations_left: U256,
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
}

/// A transaction record as returned by the consensus-data contract or a node.
///
/// Fields a node adds on top of the contract record (signature parts,
/// consensus data, ...) are kept in [`extra`] and pass through decoding
/// untouched.
///
/// [`extra`]: RawTransaction::extra
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    /// Timestamp of the last state change.
    pub current_timestamp: U256,
    /// Account that submitted the transaction.
    pub sender: Address,
    /// Target contract.
    pub recipient: Address,
    /// Validators in the first round.
    pub num_of_initial_validators: U256,
    /// Slot in the recipient's queue.
    pub tx_slot: U256,
    /// Submission timestamp.
    pub created_timestamp: U256,
    /// Timestamp of the last vote.
    pub last_vote_timestamp: U256,
    /// Seed used for validator selection.
    pub random_seed: B256,
    /// Round result code.
    pub result: u8,
    /// RLP envelope carrying the call or deployment.
    pub tx_data: Option<Bytes>,
    /// Receipt hash.
    pub tx_receipt: B256,
    /// Messages emitted by the execution.
    #[serde(default)]
    pub messages: Vec<Value>,
    /// Queue the transaction sits in.
    pub queue_type: u8,
    /// Position in that queue.
    pub queue_position: U256,
    /// Account that activated the transaction.
    pub activator: Address,
    /// Leader of the last round.
    pub last_leader: Address,
    /// Status code.
    pub status: u8,
    /// Transaction id.
    pub tx_id: B256,
    /// Consensus block markers.
    pub read_state_block_range: ReadStateBlockRange,
    /// Rounds run so far.
    pub num_of_rounds: U256,
    /// The most recent round.
    pub last_round: LastRound,
    /// Encoded equivalence-principle outputs.
    #[serde(default)]
    pub eq_blocks_outputs: Bytes,
    /// Fields not part of the contract record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
