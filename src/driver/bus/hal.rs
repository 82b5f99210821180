//! Hardware seams the transaction engine is written against.

use std::{fmt, time::Duration};

use thiserror::Error;

/// A 7-bit bus address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(u8);

impl Address {
    pub const fn new(seven_bit: u8) -> Self {
        Self(seven_bit & 0x7F)
    }

    pub const fn seven_bit(self) -> u8 {
        self.0
    }

    /// Left-shifted form, as it goes out on the wire with the R/W bit clear.
    pub const fn wire(self) -> u8 {
        self.0 << 1
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Failure of a single bus attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("no acknowledge")]
    Nack,
    #[error("arbitration lost")]
    ArbitrationLost,
    #[error("timed out")]
    Timeout,
    #[error("frame does not fit the transmit buffer")]
    FrameTooLarge,
    #[error("bus fault")]
    Bus,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("power rail fault: {0}")]
pub struct PowerFault(pub String);

/// Pull configuration of the SDA/SCL lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    /// Internal pull-ups forced on for the duration of a transaction.
    Up,
    /// Default: rely on external termination.
    None,
}

/// Blocking I2C master with per-call timeouts.
pub trait I2cMaster {
    /// Called once the engine holds the bus lock.
    fn acquire(&mut self) {}

    /// Called right before the engine drops the bus lock.
    fn release(&mut self) {}

    /// Presence check: does anything acknowledge `addr`.
    fn is_device_ready(&mut self, addr: Address, timeout: Duration) -> Result<(), BusError>;

    /// Register-write primitive: `reg` followed by `data` in one write.
    fn write_mem(
        &mut self,
        addr: Address,
        reg: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<(), BusError>;

    /// Plain addressed transmit.
    fn transmit(&mut self, addr: Address, data: &[u8], timeout: Duration) -> Result<(), BusError>;

    /// Write `data`, issue a repeated start and read into `buf` without
    /// releasing the bus in between.
    fn write_read(
        &mut self,
        addr: Address,
        data: &[u8],
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusError>;

    /// Transmit `data`, then receive into `buf` as a separate transfer.
    fn transmit_receive(
        &mut self,
        addr: Address,
        data: &[u8],
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusError>;
}

/// The supply the bus depends on.
pub trait PowerRail {
    fn is_enabled(&mut self) -> bool;

    fn enable(&mut self) -> Result<(), PowerFault>;
}

/// The two bus signal lines.
pub trait BusPins {
    fn set_pull(&mut self, pull: Pull);
}

#[cfg(test)]
mod test {
    use super::Address;

    #[test]
    fn address_forms() {
        let addr = Address::new(0x31);
        assert_eq!(addr.seven_bit(), 0x31);
        assert_eq!(addr.wire(), 0x62);
        assert_eq!(addr.to_string(), "0x31");
    }

    #[test]
    fn address_masks_high_bit() {
        assert_eq!(Address::new(0xB1).seven_bit(), 0x31);
    }
}
