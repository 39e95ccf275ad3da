use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::dispatch::dispatch;
use crate::port::{Ack, BusPort, Direction};
use crate::queue::TransactionQueue;
use crate::transaction::{Status, Transaction};

/// Bus-protocol phase of the in-flight transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// No transaction in flight.
    Idle,
    /// START issued, wire address going out.
    Starting,
    /// Internal (register) address bytes going out.
    AddressPhase,
    /// Payload bytes moving.
    DataPhase,
    /// STOP going out after a clean data phase.
    Stopping,
    /// Bus-level failure; decide between another attempt and giving up.
    Retrying,
    /// Terminal, acknowledged.
    Complete,
    /// Terminal, retry budget exhausted.
    Failed,
}

/// Per-bus transfer engine.
///
/// Owns its [`BusPort`] exclusively and executes exactly one transaction
/// at a time, so mutual exclusion of the physical bus holds by
/// construction. The engine is driven by awaiting port events and never
/// runs concurrently with itself; it needs no locking of its own.
///
/// Engines are normally obtained from
/// [`BusRegistry::init_bus`](crate::BusRegistry::init_bus) and driven by
/// a dedicated bus task calling [`run`](Self::run).
pub struct TransferEngine<'q, P: BusPort, M: RawMutex, const DEPTH: usize> {
    port: P,
    queue: &'q TransactionQueue<M, DEPTH>,
    phase: Phase,
    cursor: usize,
    retries_used: u8,
}

impl<'q, P: BusPort, M: RawMutex, const DEPTH: usize>
    TransferEngine<'q, P, M, DEPTH>
{
    pub fn new(queue: &'q TransactionQueue<M, DEPTH>, port: P) -> Self {
        Self { port, queue, phase: Phase::Idle, cursor: 0, retries_used: 0 }
    }

    /// Current phase; `Idle` whenever no transaction is in flight.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Mutable port access, for reconfiguration between transfers.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Serve the bus forever. This is the body of the per-bus task.
    pub async fn run(&mut self) -> ! {
        loop {
            self.process_next().await;
        }
    }

    /// Wait for the next queued transaction, execute it to a terminal
    /// state and dispatch the result.
    pub async fn process_next(&mut self) {
        let txn = self.queue.dequeue().await;
        let txn = self.execute(txn).await;
        dispatch(txn);
    }

    /// Execute everything already queued, without suspending on an empty
    /// queue.
    pub async fn process_pending(&mut self) {
        while let Some(txn) = self.queue.try_dequeue() {
            let txn = self.execute(txn).await;
            dispatch(txn);
        }
    }

    /// Step the dequeued transaction through the bus phases until it
    /// reaches a terminal state. The transaction keeps its in-flight
    /// slot across retries; it is never requeued.
    async fn execute(&mut self, mut txn: Transaction) -> Transaction {
        self.cursor = 0;
        self.retries_used = 0;
        self.phase = Phase::Starting;

        while !matches!(self.phase, Phase::Complete | Phase::Failed) {
            self.phase = match self.phase {
                Phase::Idle | Phase::Starting => self.starting(&txn).await,
                Phase::AddressPhase => self.address_phase(&txn).await,
                Phase::DataPhase => self.data_phase(&mut txn).await,
                Phase::Stopping => {
                    self.port.stop().await;
                    Phase::Complete
                }
                Phase::Retrying => self.retrying(&txn).await,
                Phase::Complete | Phase::Failed => self.phase,
            };
        }

        if self.phase == Phase::Complete {
            txn.status = Status::Acknowledged;
        } else {
            txn.status = Status::NotAcknowledged;
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "i2c transfer to 0x{:x} failed after {} attempts",
                txn.slave_address,
                self.retries_used as u32 + 1
            );
        }
        self.phase = Phase::Idle;
        txn
    }

    fn wire_address(slave: u8, direction: Direction) -> u8 {
        (slave << 1)
            | match direction {
                Direction::Write => 0,
                Direction::Read => 1,
            }
    }

    async fn starting(&mut self, txn: &Transaction) -> Phase {
        self.port.start().await;
        // Transactions with an internal address always open in write
        // mode; a read re-asserts its direction with a repeated START
        // after the address bytes.
        let direction = if txn.internal.is_some() {
            Direction::Write
        } else {
            txn.direction
        };
        let wire = Self::wire_address(txn.slave_address, direction);
        match self.port.write_byte(wire).await {
            Ack::Ack if txn.internal.is_some() => Phase::AddressPhase,
            Ack::Ack => Phase::DataPhase,
            Ack::Nack => Phase::Retrying,
        }
    }

    async fn address_phase(&mut self, txn: &Transaction) -> Phase {
        let Some(internal) = txn.internal else {
            return Phase::DataPhase;
        };
        let (bytes, n) = internal.encoded();
        for &byte in &bytes[..n] {
            if self.port.write_byte(byte).await == Ack::Nack {
                return Phase::Retrying;
            }
        }
        if txn.direction == Direction::Read {
            // Repeated START to turn the bus around for the data phase.
            self.port.start().await;
            let wire = Self::wire_address(txn.slave_address, Direction::Read);
            if self.port.write_byte(wire).await == Ack::Nack {
                return Phase::Retrying;
            }
        }
        Phase::DataPhase
    }

    async fn data_phase(&mut self, txn: &mut Transaction) -> Phase {
        match txn.direction {
            Direction::Write => {
                while self.cursor < txn.length {
                    let byte = txn.data[self.cursor];
                    if self.port.write_byte(byte).await == Ack::Nack {
                        return Phase::Retrying;
                    }
                    self.cursor += 1;
                }
                Phase::Stopping
            }
            Direction::Read if txn.length == 1 => {
                // Arming DMA for a single byte costs more than it saves.
                txn.data[0] = self.port.read_byte(Ack::Nack).await;
                self.cursor = 1;
                Phase::Stopping
            }
            Direction::Read => {
                match self.port.transfer(Direction::Read, &mut txn.data).await
                {
                    Ok(()) => {
                        self.cursor = txn.length;
                        Phase::Stopping
                    }
                    Err(_) => Phase::Retrying,
                }
            }
        }
    }

    async fn retrying(&mut self, txn: &Transaction) -> Phase {
        // Release the bus so the next attempt starts from a clean state.
        self.port.stop().await;
        if self.retries_used < txn.retry_budget {
            self.retries_used += 1;
            self.cursor = 0;
            Phase::Starting
        } else {
            Phase::Failed
        }
    }
}
