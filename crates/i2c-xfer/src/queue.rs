use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_time::{with_timeout, Duration};

use crate::error::SubmitError;
use crate::transaction::Transaction;

/// Bounded FIFO of transactions waiting for one bus.
///
/// The producer side may suspend the submitting task for up to a
/// timeout; the consumer side (the engine) never blocks beyond the
/// channel's short critical section, so it is safe to drive from the
/// interrupt-fed bus task.
pub struct TransactionQueue<M: RawMutex, const DEPTH: usize> {
    channel: Channel<M, Transaction, DEPTH>,
}

impl<M: RawMutex, const DEPTH: usize> TransactionQueue<M, DEPTH> {
    pub const fn new() -> Self {
        Self { channel: Channel::new() }
    }

    /// Queue `txn`, waiting up to `timeout` for space.
    ///
    /// A zero timeout fails immediately when the queue is full. On
    /// `TimedOut` the transaction was not queued; its value is consumed,
    /// so callers rebuild it to retry.
    pub async fn enqueue(
        &self,
        txn: Transaction,
        timeout: Duration,
    ) -> Result<(), SubmitError> {
        let txn = match self.channel.try_send(txn) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(txn)) => txn,
        };
        if timeout.as_ticks() == 0 {
            return Err(SubmitError::TimedOut);
        }
        with_timeout(timeout, self.channel.send(txn))
            .await
            .map_err(|_| SubmitError::TimedOut)
    }

    /// Take the next transaction, suspending while the queue is empty.
    pub async fn dequeue(&self) -> Transaction {
        self.channel.receive().await
    }

    /// Non-blocking take, for draining what is already queued.
    pub fn try_dequeue(&self) -> Option<Transaction> {
        self.channel.try_receive().ok()
    }

    /// Number of queued transactions, not counting one in flight.
    pub fn pending(&self) -> usize {
        self.channel.len()
    }

    pub fn is_full(&self) -> bool {
        self.channel.is_full()
    }
}
