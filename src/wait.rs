use crate::tx::{simplify_transaction_receipt, ConsensusVersion, TransactionStatus};
use alloy::primitives::TxHash;
use core::{future::Future, time::Duration};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Default pause between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Default number of polls after the first one.
pub const DEFAULT_RETRIES: u32 = 10;

/// Trait for types that can fetch a transaction record by hash.
///
/// Implementations return the record as JSON, or `null` when the node does
/// not know the transaction.
pub trait TransactionFetcher: Sync {
    /// The error type returned when fetching fails.
    type Error: core::error::Error + Send + Sync + 'static;

    /// Fetch the transaction.
    fn get_transaction(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = Result<Value, Self::Error>> + Send;
}

/// Error waiting for a transaction.
#[derive(thiserror::Error, Debug)]
pub enum WaitError<E> {
    /// Fetching the transaction failed.
    #[error("failed to fetch transaction: {0}")]
    Fetch(#[source] E),
    /// The node does not know the transaction.
    #[error("transaction {0} not found")]
    NotFound(TxHash),
    /// The transaction did not reach the requested status in time.
    #[error("transaction {hash} did not reach status {status}")]
    StatusNotReached {
        /// The transaction hash.
        hash: TxHash,
        /// The status that was waited for.
        status: TransactionStatus,
    },
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

/// Options for [`wait_for_transaction_receipt`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaitOptions {
    /// The status to wait for. Waiting for `ACCEPTED` is satisfied by any
    /// decided state.
    pub status: TransactionStatus,
    /// Pause between polls. Deserialized from milliseconds.
    #[serde(deserialize_with = "millis")]
    pub interval: Duration,
    /// Polls after the first one.
    pub retries: u32,
    /// Return the full record instead of the simplified one.
    pub full_transaction: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            status: TransactionStatus::Accepted,
            interval: DEFAULT_POLL_INTERVAL,
            retries: DEFAULT_RETRIES,
            full_transaction: false,
        }
    }
}

impl WaitOptions {
    /// Set the status to wait for.
    pub const fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the pause between polls.
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the number of polls after the first one.
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Return the full record instead of the simplified one.
    pub const fn with_full_transaction(mut self, full_transaction: bool) -> Self {
        self.full_transaction = full_transaction;
        self
    }
}

/// Read the status of a transaction record. Numeric codes, numeric strings
/// and names are all accepted.
fn record_status(tx: &Value) -> Option<TransactionStatus> {
    match tx.get("status")? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|code| u8::try_from(code).ok())
            .and_then(|code| ConsensusVersion::default().status(code)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Poll until a transaction reaches the requested status.
///
/// Fetches the transaction at most `retries + 1` times, sleeping `interval`
/// between fetches. The returned record is simplified unless
/// `full_transaction` is set.
pub async fn wait_for_transaction_receipt<F>(
    fetcher: &F,
    hash: TxHash,
    options: WaitOptions,
) -> Result<Value, WaitError<F::Error>>
where
    F: TransactionFetcher,
{
    let WaitOptions { status: target, interval, retries, full_transaction } = options;

    for attempt in 0..=retries {
        if attempt > 0 {
            tokio::time::sleep(interval).await;
        }

        let tx = fetcher.get_transaction(hash).await.map_err(WaitError::Fetch)?;
        if tx.is_null() {
            return Err(WaitError::NotFound(hash));
        }

        let current = record_status(&tx);
        tracing::trace!(%hash, attempt, ?current, %target, "polled transaction");

        if current.is_some_and(|status| status.satisfies(target)) {
            return Ok(if full_transaction { tx } else { simplify_transaction_receipt(&tx) });
        }
    }

    tracing::debug!(%hash, %target, retries, "transaction did not reach status");
    Err(WaitError::StatusNotReached { hash, status: target })
}
