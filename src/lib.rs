//! Client-side decoding for GenLayer consensus.
//!
//! GenLayer intelligent contracts take their arguments in a compact,
//! self-describing [calldata] format, wrapped in an RLP envelope before it is
//! handed to the consensus contract. This crate implements both layers, and
//! the tooling needed to make the consensus contract's transaction records
//! readable:
//!
//! - [`calldata`]: the value model, its binary codec, human-readable
//!   rendering, JSON conversion, and method schemas.
//! - [`envelope`]: the RLP envelope around deploy and call payloads.
//! - [`result`]: execution result blobs.
//! - [`tx`]: raw and decoded transaction records, the status, result and
//!   vote tables, the receipt simplifier, and local node records.
//! - [`consensus`]: `addTransaction` and `submitAppeal` calldata, with a
//!   fallback between the two deployed `addTransaction` layouts.
//! - [`events`]: consensus contract events.
//!
//! With the `poll` feature, [`wait_for_transaction_receipt`] polls a
//! [`TransactionFetcher`] until a transaction reaches a status. With the
//! `subscriptions` feature, [`subscriptions`] provides bounded event
//! streams.
//!
//! ## Decoding a transaction
//!
//! ```
//! use genlayer_core::{
//!     calldata::CalldataValue,
//!     envelope::{encode_call_envelope, CallData, InputData},
//!     tx::{decode_transaction, RawTransaction},
//! };
//!
//! let call = CalldataValue::call("ping", [CalldataValue::from("hello")]);
//! let raw = RawTransaction {
//!     status: 7,
//!     tx_data: Some(encode_call_envelope(Some(&call), false).into()),
//!     ..Default::default()
//! };
//!
//! let decoded = decode_transaction(&raw);
//! assert_eq!(decoded.status_name, "FINALIZED");
//!
//! let Some(InputData::Call(CallData { call_data: Some(call), .. })) = &decoded.tx_data_decoded
//! else {
//!     unreachable!()
//! };
//! assert_eq!(call.to_string(), r#"ping("hello")"#);
//! ```
//!
//! ## Waiting for a transaction
//!
//! Implement [`TransactionFetcher`] for your RPC client, then:
//!
//! ```no_run
//! # #[cfg(feature = "poll")]
//! # async fn t<F: genlayer_core::TransactionFetcher>(client: &F, hash: alloy::primitives::TxHash)
//! # -> Result<(), Box<dyn std::error::Error>> {
//! use genlayer_core::{tx::TransactionStatus, wait_for_transaction_receipt, WaitOptions};
//!
//! let options = WaitOptions::default().with_status(TransactionStatus::Finalized);
//! let receipt = wait_for_transaction_receipt(client, hash, options).await?;
//! println!("{}", receipt["status_name"]);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod calldata;
pub use calldata::CalldataValue;

pub mod consensus;

pub mod envelope;

pub mod events;
pub use events::ConsensusEvent;

pub mod result;

#[cfg(feature = "subscriptions")]
pub mod subscriptions;

pub mod tx;
pub use tx::{decode_transaction, simplify_transaction_receipt, DecodedTransaction, RawTransaction};

#[cfg(feature = "poll")]
mod wait;
#[cfg(feature = "poll")]
pub use wait::{
    wait_for_transaction_receipt, TransactionFetcher, WaitError, WaitOptions,
    DEFAULT_POLL_INTERVAL, DEFAULT_RETRIES,
};

/// Fixtures for testing with GenLayer records.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[cfg(test)]
mod test {
    use crate::{
        envelope::InputData,
        test_utils::{raw_transaction, TRANSFER_TO},
        tx::TransactionStatus,
        *,
    };

    #[test]
    fn decode_render_simplify() -> eyre::Result<()> {
        let mut raw = raw_transaction();
        raw.extra.insert("r".to_owned(), "0x01".into());
        raw.extra.insert("s".to_owned(), "0x02".into());
        raw.extra.insert("v".to_owned(), 27.into());

        let decoded = decode_transaction(&raw);
        assert!(decoded.status_name.parse::<TransactionStatus>()?.is_decided());

        let Some(InputData::Call(call)) = &decoded.tx_data_decoded else {
            eyre::bail!("expected a call envelope");
        };
        let readable = call.call_data.as_ref().map(ToString::to_string).unwrap_or_default();
        assert!(readable.starts_with("transfer(0x"));
        assert!(readable.ends_with(", 100)"));
        assert!(readable.contains(&TRANSFER_TO.to_string()));

        let simplified = simplify_transaction_receipt(&decoded.to_json()?);
        assert_eq!(simplified["status_name"], "ACCEPTED");
        assert_eq!(simplified["txDataDecoded"]["type"], "call");
        assert_eq!(simplified["txDataDecoded"]["callData"][0], "transfer");
        assert_eq!(simplified["txDataDecoded"]["callData"][2], 100);
        for key in ["r", "s", "v", "statusName"] {
            assert!(simplified.get(key).is_none(), "{key} survived");
        }
        Ok(())
    }
}
