use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::DynamicSender;
use embassy_time::Duration;
use portable_atomic::{AtomicBool, Ordering};

use crate::dispatch::Reply;
use crate::engine::TransferEngine;
use crate::error::SubmitError;
use crate::port::BusPort;
use crate::queue::TransactionQueue;
use crate::transaction::Transaction;

/// The statically known buses of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusId {
    /// Expansion-peripheral bus.
    Deck,
    /// On-board sensor bus.
    Sensors,
}

const BUS_COUNT: usize = 2;

struct Bus<M: RawMutex, const DEPTH: usize> {
    queue: TransactionQueue<M, DEPTH>,
    default_reply: Mutex<M, Cell<Option<DynamicSender<'static, Transaction>>>>,
    initialized: AtomicBool,
}

impl<M: RawMutex, const DEPTH: usize> Bus<M, DEPTH> {
    const fn new() -> Self {
        Self {
            queue: TransactionQueue::new(),
            default_reply: Mutex::new(Cell::new(None)),
            initialized: AtomicBool::new(false),
        }
    }
}

/// Process-wide table of bus instances.
///
/// Const-constructible so it can live in a `static`. Each bus is owned
/// exclusively by the registry; callers reach it through non-owning
/// [`BusHandle`]s that only locate the right queue.
pub struct BusRegistry<M: RawMutex, const DEPTH: usize> {
    buses: [Bus<M, DEPTH>; BUS_COUNT],
}

impl<M: RawMutex, const DEPTH: usize> BusRegistry<M, DEPTH> {
    pub const fn new() -> Self {
        Self { buses: [Bus::new(), Bus::new()] }
    }

    fn bus(&self, id: BusId) -> &Bus<M, DEPTH> {
        &self.buses[id as usize]
    }

    /// One-time binding of `id` to its hardware port.
    ///
    /// Returns the engine to be driven by the bus task. Panics if called
    /// twice for the same bus.
    pub fn init_bus<P: BusPort>(
        &self,
        id: BusId,
        port: P,
    ) -> TransferEngine<'_, P, M, DEPTH> {
        let bus = self.bus(id);
        if bus.initialized.swap(true, Ordering::AcqRel) {
            panic!("i2c bus initialized twice");
        }
        TransferEngine::new(&bus.queue, port)
    }

    /// Locate the bus for `id`.
    pub fn get(&self, id: BusId) -> BusHandle<'_, M, DEPTH> {
        BusHandle { bus: self.bus(id) }
    }

    /// Convenience for `get(id).submit(..)`.
    pub async fn submit(
        &self,
        id: BusId,
        txn: Transaction,
        timeout: Duration,
    ) -> Result<(), SubmitError> {
        self.get(id).submit(txn, timeout).await
    }
}

/// Non-owning reference to one bus, used to locate its queue.
pub struct BusHandle<'a, M: RawMutex, const DEPTH: usize> {
    bus: &'a Bus<M, DEPTH>,
}

impl<M: RawMutex, const DEPTH: usize> Clone for BusHandle<'_, M, DEPTH> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: RawMutex, const DEPTH: usize> Copy for BusHandle<'_, M, DEPTH> {}

impl<M: RawMutex, const DEPTH: usize> BusHandle<'_, M, DEPTH> {
    /// Submit a transaction, waiting up to `timeout` for queue space.
    ///
    /// A transaction without a reply destination of its own picks up the
    /// channel registered with
    /// [`register_completion_channel`](Self::register_completion_channel).
    pub async fn submit(
        &self,
        mut txn: Transaction,
        timeout: Duration,
    ) -> Result<(), SubmitError> {
        if txn.reply.is_none() {
            if let Some(sender) = self.bus.default_reply.lock(Cell::get) {
                txn.reply = Reply::Queue(sender);
            }
        }
        self.bus.queue.enqueue(txn, timeout).await
    }

    /// Register the reply queue used by transactions submitted on this
    /// bus without a destination of their own.
    pub fn register_completion_channel(
        &self,
        sender: DynamicSender<'static, Transaction>,
    ) {
        self.bus.default_reply.lock(|slot| slot.set(Some(sender)));
    }

    /// Number of queued transactions, not counting one in flight.
    pub fn pending(&self) -> usize {
        self.bus.queue.pending()
    }

    pub fn is_full(&self) -> bool {
        self.bus.queue.is_full()
    }
}
