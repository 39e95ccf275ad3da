/// Acknowledge bit sampled or driven after every byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ack {
    Ack,
    Nack,
}

/// Direction of a transfer, as seen from the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Write,
    Read,
}

/// Bus-level fault reported by the port during a bulk transfer
/// (bus error, arbitration loss, unexpected NACK mid-burst).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusFault;

/// Abstract hardware access for one physical I2C bus.
///
/// Implementations wrap the silicon (or a simulator, or a test stub) and
/// expose the interrupt-driven primitives as futures: awaiting one of
/// these methods suspends until the corresponding bus event fires. The
/// engine owns its port exclusively and never holds more than one of
/// these futures at a time, so implementations need no interior locking.
#[allow(async_fn_in_trait)]
pub trait BusPort {
    /// Issue a START (or repeated START) condition.
    async fn start(&mut self);

    /// Issue a STOP condition and release the bus.
    async fn stop(&mut self);

    /// Shift one byte out and sample the slave's ack bit.
    async fn write_byte(&mut self, byte: u8) -> Ack;

    /// Shift one byte in, answering with `ack` (`Nack` on the final byte
    /// of a read, per the protocol).
    async fn read_byte(&mut self, ack: Ack) -> u8;

    /// Move `buf` as one DMA-backed burst in `direction`.
    async fn transfer(
        &mut self,
        direction: Direction,
        buf: &mut [u8],
    ) -> Result<(), BusFault>;
}
