use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::DynamicSender;
use embassy_sync::signal::Signal;

use crate::transaction::Transaction;

/// Where a finished transaction is delivered.
pub enum Reply {
    /// Caller does not want the completion back.
    None,
    /// Reply queue; posted with `try_send`, never blocking the engine.
    Queue(DynamicSender<'static, Transaction>),
    /// Semaphore-style completion the caller blocks on. A later
    /// completion overwrites an unconsumed one, per `Signal` semantics.
    Signal(&'static Signal<CriticalSectionRawMutex, Transaction>),
}

impl Reply {
    pub(crate) fn is_none(&self) -> bool {
        matches!(self, Reply::None)
    }

    pub(crate) fn take(&mut self) -> Reply {
        core::mem::replace(self, Reply::None)
    }
}

/// Deliver a finished transaction to its reply destination.
///
/// Fire-and-forget: a full or abandoned reply queue loses the
/// completion. The submitting task is responsible for provisioning its
/// channel deep enough for the transactions it has outstanding.
pub fn dispatch(mut txn: Transaction) {
    match txn.reply.take() {
        Reply::None => {}
        Reply::Queue(sender) => {
            if sender.try_send(txn).is_err() {
                #[cfg(feature = "defmt")]
                defmt::warn!("i2c completion lost: reply queue full");
            }
        }
        Reply::Signal(signal) => signal.signal(txn),
    }
}
