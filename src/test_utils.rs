use crate::{
    calldata::CalldataValue,
    envelope::encode_call_envelope,
    tx::{LastRound, RawTransaction, ReadStateBlockRange},
};
use alloy::primitives::{Address, Bytes, B256, U256};

/// Sender of the fixture transaction.
pub const SENDER: Address = Address::repeat_byte(0x01);

/// Recipient of the fixture transaction.
pub const RECIPIENT: Address = Address::repeat_byte(0x02);

/// Argument of the fixture's `transfer` call.
pub const TRANSFER_TO: Address = Address::repeat_byte(0xaa);

/// The `transfer(TRANSFER_TO, 100)` call carried by the fixture.
pub fn transfer_call() -> CalldataValue {
    CalldataValue::call("transfer", [CalldataValue::from(TRANSFER_TO), CalldataValue::from(100u8)])
}

/// An accepted transaction, one round in, calling `transfer`.
pub fn raw_transaction() -> RawTransaction {
    RawTransaction {
        current_timestamp: U256::from(1_700_000_100u64),
        sender: SENDER,
        recipient: RECIPIENT,
        num_of_initial_validators: U256::from(5),
        tx_slot: U256::from(3),
        created_timestamp: U256::from(1_700_000_000u64),
        last_vote_timestamp: U256::from(1_700_000_050u64),
        random_seed: B256::repeat_byte(0x5e),
        result: 6,
        tx_data: Some(Bytes::from(encode_call_envelope(Some(&transfer_call()), false))),
        tx_receipt: B256::ZERO,
        messages: vec![],
        queue_type: 1,
        queue_position: U256::from(4),
        activator: Address::repeat_byte(0x03),
        last_leader: Address::repeat_byte(0x04),
        status: 5,
        tx_id: B256::repeat_byte(0x77),
        read_state_block_range: ReadStateBlockRange {
            activation_block: U256::from(10),
            processing_block: U256::from(11),
            proposal_block: U256::from(12),
        },
        num_of_rounds: U256::from(1),
        last_round: LastRound {
            round: U256::ZERO,
            leader_index: U256::ZERO,
            votes_committed: U256::from(5),
            votes_revealed: U256::from(5),
            appeal_bond: U256::ZERO,
            rotations_left: U256::from(3),
            result: 6,
            round_validators: vec![Address::repeat_byte(0x04), Address::repeat_byte(0x05)],
            validator_votes: vec![1, 1],
            validator_votes_hash: vec![B256::repeat_byte(0x10), B256::repeat_byte(0x11)],
            validator_result_hash: vec![B256::repeat_byte(0x20), B256::repeat_byte(0x21)],
        },
        eq_blocks_outputs: Bytes::new(),
        extra: Default::default(),
    }
}
