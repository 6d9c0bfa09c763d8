//! Transaction records: raw and decoded shapes, status tables, and the
//! receipt simplifier.

mod decoded;
pub use decoded::{
    decode_transaction, decode_transaction_with, DecodedBlockRange, DecodedRound,
    DecodedTransaction,
};

pub mod localnet;

mod raw;
pub use raw::{LastRound, RawTransaction, ReadStateBlockRange};

mod simplify;
pub use simplify::{simplify_transaction_receipt, FIELDS_TO_REMOVE, FIELD_NAME_MAPPINGS};

mod status;
pub use status::{
    is_decided_state, ConsensusVersion, TransactionHashVariant, TransactionResult,
    TransactionStatus, UnknownCode, VoteType, UNKNOWN,
};
