use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::DynamicSender;
use embassy_sync::signal::Signal;
use heapless::Vec;

use crate::dispatch::Reply;
use crate::error::InvalidTransaction;
use crate::port::Direction;

/// Largest number of bytes one transaction can move, sized to the DMA
/// burst limit of the port implementations.
pub const MAX_TRANSFER: usize = 32;

/// Retry budget applied when a transaction does not set its own.
pub const DEFAULT_RETRIES: u8 = 3;

/// Sentinel accepted by [`Transaction::with_internal_address`] meaning
/// "no internal address phase".
pub const NO_INTERNAL_ADDRESS: u16 = 0xFFFF;

/// Width of a device-internal register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressWidth {
    Bits8,
    Bits16,
}

/// Device-internal register address written out before the data phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InternalAddress {
    pub address: u16,
    pub width: AddressWidth,
}

impl InternalAddress {
    /// Wire encoding, MSB first for 16-bit addresses.
    pub(crate) fn encoded(&self) -> ([u8; 2], usize) {
        match self.width {
            AddressWidth::Bits8 => ([self.address as u8, 0], 1),
            AddressWidth::Bits16 => {
                ([(self.address >> 8) as u8, self.address as u8], 2)
            }
        }
    }
}

/// Final outcome of a transaction, meaningful once dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Acknowledged,
    NotAcknowledged,
}

/// One read or write against a slave device.
///
/// The transaction owns its data buffer for its whole life: the bytes of
/// a write are copied in at construction, the buffer of a read travels
/// back to the caller inside the dispatched transaction. While queued or
/// in flight the value is owned by the queue or the engine, so the
/// caller cannot touch the buffer until completion hands it back.
pub struct Transaction {
    pub(crate) slave_address: u8,
    pub(crate) direction: Direction,
    pub(crate) internal: Option<InternalAddress>,
    pub(crate) length: usize,
    pub(crate) retry_budget: u8,
    pub(crate) data: Vec<u8, MAX_TRANSFER>,
    pub(crate) reply: Reply,
    pub(crate) status: Status,
}

impl Transaction {
    /// Build a write of `bytes` to `slave`.
    pub fn write(slave: u8, bytes: &[u8]) -> Result<Self, InvalidTransaction> {
        let data = Vec::from_slice(bytes)
            .map_err(|_| InvalidTransaction::TooLong(bytes.len()))?;
        Self::new(slave, Direction::Write, bytes.len(), data)
    }

    /// Build a read of `length` bytes from `slave`. The buffer is
    /// pre-sized so the engine fills it in place.
    pub fn read(slave: u8, length: usize) -> Result<Self, InvalidTransaction> {
        let mut data = Vec::new();
        data.resize(length, 0)
            .map_err(|_| InvalidTransaction::TooLong(length))?;
        Self::new(slave, Direction::Read, length, data)
    }

    fn new(
        slave: u8,
        direction: Direction,
        length: usize,
        data: Vec<u8, MAX_TRANSFER>,
    ) -> Result<Self, InvalidTransaction> {
        if length == 0 {
            return Err(InvalidTransaction::ZeroLength);
        }
        if slave > 0x7F {
            return Err(InvalidTransaction::AddressOutOfRange(slave));
        }
        Ok(Self {
            slave_address: slave,
            direction,
            internal: None,
            length,
            retry_budget: DEFAULT_RETRIES,
            data,
            reply: Reply::None,
            status: Status::NotAcknowledged,
        })
    }

    /// Add an internal (register) address phase of the given width.
    ///
    /// Passing [`NO_INTERNAL_ADDRESS`] disables the phase again.
    pub fn with_internal_address(
        mut self,
        address: u16,
        width: AddressWidth,
    ) -> Result<Self, InvalidTransaction> {
        if address == NO_INTERNAL_ADDRESS {
            self.internal = None;
            return Ok(self);
        }
        if width == AddressWidth::Bits8 && address > 0xFF {
            return Err(InvalidTransaction::InternalAddressOutOfRange(address));
        }
        self.internal = Some(InternalAddress { address, width });
        Ok(self)
    }

    /// Override the retry budget. A budget of `n` allows `n + 1` total
    /// attempts on the wire.
    pub fn with_retries(mut self, budget: u8) -> Self {
        self.retry_budget = budget;
        self
    }

    /// Deliver the finished transaction to a reply queue.
    pub fn with_reply(
        mut self,
        sender: DynamicSender<'static, Transaction>,
    ) -> Self {
        self.reply = Reply::Queue(sender);
        self
    }

    /// Deliver the finished transaction through a signal the caller
    /// blocks on, semaphore style.
    pub fn with_signal(
        mut self,
        signal: &'static Signal<CriticalSectionRawMutex, Transaction>,
    ) -> Self {
        self.reply = Reply::Signal(signal);
        self
    }

    pub fn slave_address(&self) -> u8 {
        self.slave_address
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn internal_address(&self) -> Option<InternalAddress> {
        self.internal
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn retry_budget(&self) -> u8 {
        self.retry_budget
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// The transferred bytes: what was written, or what was read once the
    /// transaction comes back `Acknowledged`.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take the buffer out of a dispatched transaction.
    pub fn into_data(self) -> Vec<u8, MAX_TRANSFER> {
        self.data
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Transaction {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Transaction(slave=0x{:x}, {}, len={}, retries={}, {})",
            self.slave_address,
            self.direction,
            self.length,
            self.retry_budget,
            self.status
        );
    }
}
