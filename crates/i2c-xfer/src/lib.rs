#![no_std]
//! Asynchronous message-transfer engine for shared I2C buses.
//!
//! Client tasks build a [`Transaction`] and submit it through a
//! [`BusRegistry`] handle; a per-bus [`TransferEngine`] executes one
//! transaction at a time against an abstract [`BusPort`], retries on
//! bus-level failure, and posts the finished transaction back to the
//! caller's reply channel. No allocation, no locking inside the engine:
//! the bounded queue is the only structure shared between submitting
//! tasks and the bus task.

mod dispatch;
mod engine;
mod error;
mod port;
mod queue;
mod registry;
mod transaction;

pub use dispatch::{dispatch, Reply};
pub use engine::{Phase, TransferEngine};
pub use error::{InvalidTransaction, SubmitError};
pub use port::{Ack, BusFault, BusPort, Direction};
pub use queue::TransactionQueue;
pub use registry::{BusHandle, BusId, BusRegistry};
pub use transaction::{
    AddressWidth, InternalAddress, Status, Transaction, DEFAULT_RETRIES,
    MAX_TRANSFER, NO_INTERNAL_ADDRESS,
};
