/// Reasons a transaction is rejected at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvalidTransaction {
    /// Zero-length transfers are not representable on the wire.
    ZeroLength,
    /// Requested length exceeds [`MAX_TRANSFER`](crate::MAX_TRANSFER).
    TooLong(usize),
    /// Slave address does not fit in 7 bits.
    AddressOutOfRange(u8),
    /// Internal address does not fit the declared width.
    InternalAddressOutOfRange(u16),
}

/// Submission failed synchronously; the caller decides whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubmitError {
    /// No queue space became available within the timeout. The
    /// transaction was not queued.
    TimedOut,
}
