//! Event subscriptions.
//!
//! A transport pushes raw logs into an [`EventSink`]; the consumer pulls
//! decoded events out of the matching [`EventStream`]. The queue between
//! them is bounded at [`MAX_EVENT_QUEUE_SIZE`]: when the consumer falls
//! behind, the oldest events are dropped.
//!
//! Connections shared between subscriptions are kept in a
//! [`ConnectionRegistry`], keyed by endpoint.

use crate::events::{ConsensusEvent, EventDecodeError};
use alloy::primitives::Log;
use dashmap::DashMap;
use std::{
    collections::VecDeque,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::sync::Notify;

/// Most events buffered per subscription.
pub const MAX_EVENT_QUEUE_SIZE: usize = 1000;

/// Error ending or preventing a subscription.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The transport failed.
    #[error("subscription transport error: {0}")]
    Transport(String),
    /// No websocket endpoint is configured for the chain.
    #[error("websocket URL is not configured for this chain")]
    WebSocketNotConfigured,
    /// The chain has no consensus contract address.
    #[error("consensus main contract is not initialized")]
    ConsensusContractNotInitialized,
}

impl SubscriptionError {
    /// True if the transport failed, making the connection unusable.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[derive(Debug)]
struct Queue<T> {
    events: VecDeque<T>,
    error: Option<SubscriptionError>,
    closed: bool,
}

#[derive(Debug)]
struct Shared<T> {
    name: &'static str,
    queue: Mutex<Queue<T>>,
    notify: Notify,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Queue<T>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The producing half of a subscription.
pub struct EventSink<T> {
    shared: Arc<Shared<T>>,
    decode: fn(&Log) -> Result<T, EventDecodeError>,
}

impl<T> core::fmt::Debug for EventSink<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventSink").field("name", &self.shared.name).finish_non_exhaustive()
    }
}

impl<T> EventSink<T> {
    /// Decode and queue logs. Logs that do not decode are skipped.
    ///
    /// Returns the number of events queued.
    pub fn push_logs<'a>(&self, logs: impl IntoIterator<Item = &'a Log>) -> usize {
        let name = self.shared.name;
        let mut queued = 0;
        {
            let mut queue = self.shared.lock();
            if queue.closed {
                return 0;
            }
            for log in logs {
                let event = match (self.decode)(log) {
                    Ok(event) => event,
                    Err(error) => {
                        tracing::debug!(subscription = name, %error, "skipping undecodable log");
                        continue;
                    }
                };
                if queue.events.len() >= MAX_EVENT_QUEUE_SIZE {
                    queue.events.pop_front();
                    tracing::warn!(
                        subscription = name,
                        max = MAX_EVENT_QUEUE_SIZE,
                        "event queue full, dropping oldest event"
                    );
                }
                queue.events.push_back(event);
                queued += 1;
            }
        }
        if queued > 0 {
            self.shared.notify.notify_one();
        }
        queued
    }

    /// End the subscription with an error. Queued events are still
    /// delivered before it.
    pub fn fail(&self, error: SubscriptionError) {
        tracing::error!(subscription = self.shared.name, %error, "subscription failed");
        {
            let mut queue = self.shared.lock();
            if queue.closed {
                return;
            }
            queue.error = Some(error);
            queue.closed = true;
        }
        self.shared.notify.notify_one();
    }

    /// True if the stream was unsubscribed, dropped, or failed.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed || Arc::strong_count(&self.shared) == 1
    }
}

impl<T> Drop for EventSink<T> {
    fn drop(&mut self) {
        self.shared.lock().closed = true;
        self.shared.notify.notify_one();
    }
}

/// The consuming half of a subscription.
#[derive(Debug)]
pub struct EventStream<T> {
    shared: Arc<Shared<T>>,
}

impl<T> EventStream<T> {
    /// Wait for the next event.
    ///
    /// Queued events are returned first. After that, a transport error is
    /// returned once, and then `None` for as long as the stream is polled.
    pub async fn next(&mut self) -> Option<Result<T, SubscriptionError>> {
        loop {
            let notified = self.shared.notify.notified();
            {
                let mut queue = self.shared.lock();
                if let Some(event) = queue.events.pop_front() {
                    return Some(Ok(event));
                }
                if let Some(error) = queue.error.take() {
                    return Some(Err(error));
                }
                if queue.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Events waiting to be read.
    pub fn pending(&self) -> usize {
        self.shared.lock().events.len()
    }

    /// Stop the subscription and discard queued events.
    pub fn unsubscribe(self) {
        let mut queue = self.shared.lock();
        queue.closed = true;
        queue.events.clear();
        queue.error = None;
        tracing::debug!(subscription = self.shared.name, "unsubscribed");
    }
}

/// Create a subscription channel for one kind of event.
///
/// `name` labels the subscription in logs. `decode` turns a raw log into an
/// event, or fails for logs the subscription should skip.
pub fn event_channel<T>(
    name: &'static str,
    decode: fn(&Log) -> Result<T, EventDecodeError>,
) -> (EventSink<T>, EventStream<T>) {
    let shared = Arc::new(Shared {
        name,
        queue: Mutex::new(Queue { events: VecDeque::new(), error: None, closed: false }),
        notify: Notify::new(),
    });
    (EventSink { shared: shared.clone(), decode }, EventStream { shared })
}

/// A channel for every consensus contract event.
pub fn consensus_event_channel() -> (EventSink<ConsensusEvent>, EventStream<ConsensusEvent>) {
    event_channel("consensus", ConsensusEvent::decode_log)
}

/// Shared connections, keyed by endpoint.
///
/// Connecting happens outside the map lock, so two callers racing for the
/// same key may both connect; the first to finish wins and the other
/// connection is dropped.
///
/// [`with_connection`] evicts a connection whose use fails with a
/// [`SubscriptionError::Transport`], so the next caller reconnects. Callers
/// using [`get_or_try_connect`] directly must [`evict`] on transport failure
/// themselves.
///
/// [`with_connection`]: Self::with_connection
/// [`get_or_try_connect`]: Self::get_or_try_connect
/// [`evict`]: Self::evict
#[derive(Debug)]
pub struct ConnectionRegistry<K, C>
where
    K: Eq + Hash,
{
    connections: DashMap<K, C>,
}

impl<K, C> Default for ConnectionRegistry<K, C>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self { connections: DashMap::new() }
    }
}

impl<K, C> ConnectionRegistry<K, C>
where
    K: Eq + Hash + Clone,
    C: Clone,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the connection for `key`, connecting if there is none.
    pub async fn get_or_try_connect<F, Fut, E>(&self, key: K, connect: F) -> Result<C, E>
    where
        F: FnOnce() -> Fut,
        Fut: core::future::Future<Output = Result<C, E>>,
    {
        if let Some(conn) = self.connections.get(&key) {
            return Ok(conn.value().clone());
        }
        let conn = connect().await?;
        Ok(self.connections.entry(key).or_insert(conn).value().clone())
    }

    /// Run `op` on the connection for `key`, connecting if there is none.
    ///
    /// A transport error from `op` evicts the connection before the error is
    /// returned.
    pub async fn with_connection<F, Fut, Op, OpFut, T>(
        &self,
        key: K,
        connect: F,
        op: Op,
    ) -> Result<T, SubscriptionError>
    where
        F: FnOnce() -> Fut,
        Fut: core::future::Future<Output = Result<C, SubscriptionError>>,
        Op: FnOnce(C) -> OpFut,
        OpFut: core::future::Future<Output = Result<T, SubscriptionError>>,
    {
        let conn = self.get_or_try_connect(key.clone(), connect).await?;
        let result = op(conn).await;
        if let Err(error) = &result {
            if error.is_transport() {
                tracing::warn!(%error, "evicting connection after transport error");
                self.evict(&key);
            }
        }
        result
    }

    /// Return the connection for `key`, if any.
    pub fn get(&self, key: &K) -> Option<C> {
        self.connections.get(key).map(|conn| conn.value().clone())
    }

    /// Remove the connection for `key`, returning it.
    pub fn evict(&self, key: &K) -> Option<C> {
        self.connections.remove(key).map(|(_, conn)| conn)
    }

    /// Number of connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// True if there are no connections.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Drop every connection.
    pub fn clear(&self) {
        self.connections.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::events::{TransactionAccepted, TransactionLeaderTimeout};
    use alloy::{
        primitives::{Address, LogData, B256},
        sol_types::SolEvent,
    };

    fn accepted(n: u8) -> Log {
        let data = TransactionAccepted { txId: B256::repeat_byte(n) }.encode_log_data();
        Log { address: Address::ZERO, data }
    }

    fn only_accepted(log: &Log) -> Result<B256, EventDecodeError> {
        match ConsensusEvent::decode_log(log)? {
            ConsensusEvent::TransactionAccepted(event) => Ok(event.txId),
            other => Err(EventDecodeError::UnknownTopic(Some(other.tx_id()))),
        }
    }

    #[tokio::test]
    async fn delivers_in_order_and_skips_undecodable() {
        let (sink, mut stream) = event_channel("accepted", only_accepted);
        let junk = Log {
            address: Address::ZERO,
            data: LogData::new_unchecked(vec![], Default::default()),
        };
        let timeout = Log {
            address: Address::ZERO,
            data: TransactionLeaderTimeout { txId: B256::ZERO }.encode_log_data(),
        };

        assert_eq!(sink.push_logs([&accepted(1), &junk, &timeout, &accepted(2)]), 2);
        assert_eq!(stream.next().await, Some(Ok(B256::repeat_byte(1))));
        assert_eq!(stream.next().await, Some(Ok(B256::repeat_byte(2))));

        let waiter = tokio::spawn(async move { stream.next().await });
        tokio::task::yield_now().await;
        sink.push_logs([&accepted(3)]);
        assert_eq!(waiter.await.unwrap(), Some(Ok(B256::repeat_byte(3))));
    }

    #[tokio::test]
    async fn drops_oldest_when_full() {
        let (sink, mut stream) = event_channel("accepted", only_accepted);
        let logs: Vec<_> = (0..=MAX_EVENT_QUEUE_SIZE).map(|i| accepted((i % 256) as u8)).collect();
        sink.push_logs(&logs);

        assert_eq!(stream.pending(), MAX_EVENT_QUEUE_SIZE);
        assert_eq!(stream.next().await, Some(Ok(B256::repeat_byte(1))));
    }

    #[tokio::test]
    async fn error_after_queued_events_then_end() {
        let (sink, mut stream) = consensus_event_channel();
        sink.push_logs([&accepted(7)]);
        sink.fail(SubscriptionError::Transport("socket closed".into()));
        assert!(sink.is_closed());

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.tx_id(), B256::repeat_byte(7));
        assert_eq!(
            stream.next().await,
            Some(Err(SubscriptionError::Transport("socket closed".into())))
        );
        assert_eq!(stream.next().await, None);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn unsubscribe_and_drop() {
        let (sink, stream) = event_channel("accepted", only_accepted);
        sink.push_logs([&accepted(1)]);
        stream.unsubscribe();
        assert!(sink.is_closed());
        assert_eq!(sink.push_logs([&accepted(2)]), 0);

        let (sink, mut stream) = event_channel("accepted", only_accepted);
        sink.push_logs([&accepted(1)]);
        drop(sink);
        assert!(stream.next().await.is_some());
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn registry_reuses_connections() {
        let registry = ConnectionRegistry::<String, u32>::new();
        let mut connects = 0;

        let conn = registry
            .get_or_try_connect("ws://a".to_owned(), || {
                connects += 1;
                async { Ok::<_, SubscriptionError>(1) }
            })
            .await
            .unwrap();
        assert_eq!(conn, 1);

        let conn = registry
            .get_or_try_connect("ws://a".to_owned(), || {
                connects += 1;
                async { Ok::<_, SubscriptionError>(2) }
            })
            .await
            .unwrap();
        assert_eq!(conn, 1);
        assert_eq!(connects, 1);

        let err = registry
            .get_or_try_connect("ws://b".to_owned(), || async {
                Err(SubscriptionError::WebSocketNotConfigured)
            })
            .await
            .unwrap_err();
        assert_eq!(err, SubscriptionError::WebSocketNotConfigured);
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.evict(&"ws://a".to_owned()), Some(1));
        assert!(registry.is_empty());
        assert_eq!(registry.get(&"ws://a".to_owned()), None);
    }

    #[tokio::test]
    async fn registry_evicts_on_transport_error() {
        let registry = ConnectionRegistry::<String, u32>::new();
        let key = "ws://a".to_owned();
        let connect = || async { Ok::<_, SubscriptionError>(7) };

        let out = registry.with_connection(key.clone(), connect, |conn| async move {
            Ok(conn * 2)
        });
        assert_eq!(out.await, Ok(14));
        assert_eq!(registry.get(&key), Some(7));

        // other failures keep the connection
        let out: Result<(), _> = registry
            .with_connection(key.clone(), connect, |_| async {
                Err(SubscriptionError::ConsensusContractNotInitialized)
            })
            .await;
        assert_eq!(out, Err(SubscriptionError::ConsensusContractNotInitialized));
        assert_eq!(registry.get(&key), Some(7));

        let out: Result<(), _> = registry
            .with_connection(key.clone(), connect, |_| async {
                Err(SubscriptionError::Transport("socket closed".into()))
            })
            .await;
        assert_eq!(out, Err(SubscriptionError::Transport("socket closed".into())));
        assert_eq!(registry.get(&key), None);
        assert!(registry.is_empty());

        let out = registry.with_connection(key.clone(), || async { Ok(8) }, |conn| async move {
            Ok::<_, SubscriptionError>(conn)
        });
        assert_eq!(out.await, Ok(8));
    }
}
