//! Events emitted by the consensus contract.
//!
//! Logs are matched on their first topic, so a log from any address whose
//! signature matches one of the events below is decoded.

use alloy::{
    primitives::{Log, LogData, B256},
    sol,
    sol_types::SolEvent,
};

sol! {
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    event NewTransaction(
        bytes32 indexed txId,
        address indexed recipient,
        address indexed activator
    );

    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    event TransactionAccepted(bytes32 indexed txId);

    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    event TransactionActivated(bytes32 indexed txId, address indexed leader);

    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    event TransactionUndetermined(bytes32 indexed txId);

    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    event TransactionLeaderTimeout(bytes32 indexed txId);

    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    event AppealStarted(
        bytes32 indexed txId,
        address indexed appellant,
        uint256 bond,
        address[] validators
    );
}

/// Error decoding a consensus contract log.
#[derive(thiserror::Error, Debug)]
pub enum EventDecodeError {
    /// The first topic is not a known consensus event.
    #[error("unknown event topic: {0:?}")]
    UnknownTopic(Option<B256>),
    /// The topic matched but the data did not decode.
    #[error(transparent)]
    Abi(#[from] alloy::sol_types::Error),
}

/// An event emitted by the consensus contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusEvent {
    /// A transaction was added to the queue.
    NewTransaction(NewTransaction),
    /// A transaction was accepted.
    TransactionAccepted(TransactionAccepted),
    /// A leader was selected for a transaction.
    TransactionActivated(TransactionActivated),
    /// Validators could not agree on a transaction.
    TransactionUndetermined(TransactionUndetermined),
    /// The leader did not produce a receipt in time.
    TransactionLeaderTimeout(TransactionLeaderTimeout),
    /// An appeal was submitted.
    AppealStarted(AppealStarted),
}

impl ConsensusEvent {
    /// Topic hashes of every known event.
    pub const SIGNATURE_HASHES: [B256; 6] = [
        NewTransaction::SIGNATURE_HASH,
        TransactionAccepted::SIGNATURE_HASH,
        TransactionActivated::SIGNATURE_HASH,
        TransactionUndetermined::SIGNATURE_HASH,
        TransactionLeaderTimeout::SIGNATURE_HASH,
        AppealStarted::SIGNATURE_HASH,
    ];

    /// Decode log data by its first topic.
    pub fn decode_log_data(data: &LogData) -> Result<Self, EventDecodeError> {
        let topic = data.topics().first().copied();
        let event = match topic {
            Some(NewTransaction::SIGNATURE_HASH) => {
                Self::NewTransaction(NewTransaction::decode_log_data(data)?)
            }
            Some(TransactionAccepted::SIGNATURE_HASH) => {
                Self::TransactionAccepted(TransactionAccepted::decode_log_data(data)?)
            }
            Some(TransactionActivated::SIGNATURE_HASH) => {
                Self::TransactionActivated(TransactionActivated::decode_log_data(data)?)
            }
            Some(TransactionUndetermined::SIGNATURE_HASH) => {
                Self::TransactionUndetermined(TransactionUndetermined::decode_log_data(data)?)
            }
            Some(TransactionLeaderTimeout::SIGNATURE_HASH) => {
                Self::TransactionLeaderTimeout(TransactionLeaderTimeout::decode_log_data(data)?)
            }
            Some(AppealStarted::SIGNATURE_HASH) => {
                Self::AppealStarted(AppealStarted::decode_log_data(data)?)
            }
            _ => return Err(EventDecodeError::UnknownTopic(topic)),
        };
        Ok(event)
    }

    /// Decode a log. The emitting address is not checked.
    pub fn decode_log(log: &Log) -> Result<Self, EventDecodeError> {
        Self::decode_log_data(&log.data)
    }

    /// The event name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NewTransaction(_) => "NewTransaction",
            Self::TransactionAccepted(_) => "TransactionAccepted",
            Self::TransactionActivated(_) => "TransactionActivated",
            Self::TransactionUndetermined(_) => "TransactionUndetermined",
            Self::TransactionLeaderTimeout(_) => "TransactionLeaderTimeout",
            Self::AppealStarted(_) => "AppealStarted",
        }
    }

    /// The id of the transaction the event is about.
    pub const fn tx_id(&self) -> B256 {
        match self {
            Self::NewTransaction(e) => e.txId,
            Self::TransactionAccepted(e) => e.txId,
            Self::TransactionActivated(e) => e.txId,
            Self::TransactionUndetermined(e) => e.txId,
            Self::TransactionLeaderTimeout(e) => e.txId,
            Self::AppealStarted(e) => e.txId,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy::primitives::{Address, Bytes, U256};

    #[test]
    fn decodes_each_event() {
        let id = B256::repeat_byte(0x11);
        let events = [
            ConsensusEvent::NewTransaction(NewTransaction {
                txId: id,
                recipient: Address::repeat_byte(0x22),
                activator: Address::repeat_byte(0x33),
            }),
            ConsensusEvent::TransactionAccepted(TransactionAccepted { txId: id }),
            ConsensusEvent::TransactionActivated(TransactionActivated {
                txId: id,
                leader: Address::repeat_byte(0x44),
            }),
            ConsensusEvent::TransactionUndetermined(TransactionUndetermined { txId: id }),
            ConsensusEvent::TransactionLeaderTimeout(TransactionLeaderTimeout { txId: id }),
            ConsensusEvent::AppealStarted(AppealStarted {
                txId: id,
                appellant: Address::repeat_byte(0x55),
                bond: U256::from(1000),
                validators: vec![Address::repeat_byte(0x66), Address::repeat_byte(0x77)],
            }),
        ];

        for event in events {
            let data = match &event {
                ConsensusEvent::NewTransaction(e) => e.encode_log_data(),
                ConsensusEvent::TransactionAccepted(e) => e.encode_log_data(),
                ConsensusEvent::TransactionActivated(e) => e.encode_log_data(),
                ConsensusEvent::TransactionUndetermined(e) => e.encode_log_data(),
                ConsensusEvent::TransactionLeaderTimeout(e) => e.encode_log_data(),
                ConsensusEvent::AppealStarted(e) => e.encode_log_data(),
            };
            let log = Log { address: Address::repeat_byte(0x99), data };
            let decoded = ConsensusEvent::decode_log(&log).unwrap();
            assert_eq!(decoded.tx_id(), id);
            assert_eq!(decoded, event);
        }
    }

    #[test]
    fn names() {
        let event = ConsensusEvent::TransactionAccepted(TransactionAccepted { txId: B256::ZERO });
        assert_eq!(event.name(), "TransactionAccepted");
        let event = ConsensusEvent::NewTransaction(NewTransaction {
            txId: B256::ZERO,
            recipient: Address::ZERO,
            activator: Address::ZERO,
        });
        assert_eq!(event.name(), "NewTransaction");
    }

    #[test]
    fn rejects_unknown_and_malformed() {
        let data = LogData::new_unchecked(vec![B256::repeat_byte(0xff)], Bytes::new());
        assert!(matches!(
            ConsensusEvent::decode_log_data(&data),
            Err(EventDecodeError::UnknownTopic(Some(_)))
        ));

        let data = LogData::new_unchecked(vec![], Bytes::new());
        assert!(matches!(
            ConsensusEvent::decode_log_data(&data),
            Err(EventDecodeError::UnknownTopic(None))
        ));

        // missing the indexed tx id
        let data = LogData::new_unchecked(vec![TransactionAccepted::SIGNATURE_HASH], Bytes::new());
        assert!(matches!(ConsensusEvent::decode_log_data(&data), Err(EventDecodeError::Abi(_))));
    }
}
