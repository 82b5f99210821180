//! Raspberry Pi backend: the bus goes through `/dev/i2c-N`, the bus lines and
//! the optional boost converter through the GPIO block.

use std::{io, time::Duration};

use rppal::{
    gpio::{self, Gpio, InputPin, IoPin, Mode, OutputPin, PullUpDown},
    i2c::{self, I2c},
};
use tracing::trace;

use super::bus::{Address, BusError, BusPins, I2cMaster, PowerFault, PowerRail, Pull};

const EAGAIN: i32 = 11;
const ENXIO: i32 = 6;
const ETIMEDOUT: i32 = 110;
const EREMOTEIO: i32 = 121;

/// Time the boost converter gets to come up before power-good is checked.
const POWER_SETTLE: Duration = Duration::from_millis(20);

fn bus_error(err: i2c::Error) -> BusError {
    trace!("i2c error: {err}");

    match err {
        i2c::Error::Io(e) => match e.raw_os_error() {
            Some(ENXIO) | Some(EREMOTEIO) => BusError::Nack,
            Some(ETIMEDOUT) => BusError::Timeout,
            Some(EAGAIN) => BusError::ArbitrationLost,
            _ if e.kind() == io::ErrorKind::TimedOut => BusError::Timeout,
            _ => BusError::Bus,
        },
        _ => BusError::Bus,
    }
}

fn check_len(expected: usize, actual: usize) -> Result<(), BusError> {
    if expected == actual {
        Ok(())
    } else {
        Err(BusError::Nack)
    }
}

/// How a register write goes out on the bus.
#[derive(Debug, PartialEq, Eq)]
enum MemWrite {
    /// SMBus write-byte: `[reg, value]`.
    Byte { reg: u8, value: u8 },
    /// Plain write of `[reg, data..]`, no SMBus byte count.
    Raw(Vec<u8>),
}

impl MemWrite {
    fn new(reg: u8, data: &[u8]) -> Self {
        match data {
            [value] => MemWrite::Byte { reg, value: *value },
            _ => {
                let mut frame = Vec::with_capacity(1 + data.len());
                frame.push(reg);
                frame.extend_from_slice(data);
                MemWrite::Raw(frame)
            }
        }
    }
}

pub struct RpiI2c {
    i2c: I2c,
    timeout: Option<Duration>,
}

impl RpiI2c {
    pub fn new(bus: u8) -> Result<Self, i2c::Error> {
        Ok(Self {
            i2c: I2c::with_bus(bus)?,
            timeout: None,
        })
    }

    fn select(&mut self, addr: Address, timeout: Duration) -> Result<(), BusError> {
        self.i2c
            .set_slave_address(u16::from(addr.seven_bit()))
            .map_err(bus_error)?;

        if self.timeout != Some(timeout) {
            let ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
            self.i2c.set_timeout(ms).map_err(bus_error)?;
            self.timeout = Some(timeout);
        }

        Ok(())
    }
}

impl I2cMaster for RpiI2c {
    fn is_device_ready(&mut self, addr: Address, timeout: Duration) -> Result<(), BusError> {
        self.select(addr, timeout)?;
        self.i2c.smbus_quick_command(false).map_err(bus_error)
    }

    fn write_mem(
        &mut self,
        addr: Address,
        reg: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<(), BusError> {
        self.select(addr, timeout)?;

        match MemWrite::new(reg, data) {
            MemWrite::Byte { reg, value } => {
                self.i2c.smbus_write_byte(reg, value).map_err(bus_error)
            }
            MemWrite::Raw(frame) => {
                let written = self.i2c.write(&frame).map_err(bus_error)?;
                check_len(frame.len(), written)
            }
        }
    }

    fn transmit(&mut self, addr: Address, data: &[u8], timeout: Duration) -> Result<(), BusError> {
        self.select(addr, timeout)?;
        let written = self.i2c.write(data).map_err(bus_error)?;
        check_len(data.len(), written)
    }

    fn write_read(
        &mut self,
        addr: Address,
        data: &[u8],
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusError> {
        self.select(addr, timeout)?;
        // one I2C_RDWR transfer: the kernel issues a repeated start between
        // the two messages
        self.i2c.write_read(data, buf).map_err(bus_error)
    }

    fn transmit_receive(
        &mut self,
        addr: Address,
        data: &[u8],
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusError> {
        self.select(addr, timeout)?;
        let written = self.i2c.write(data).map_err(bus_error)?;
        check_len(data.len(), written)?;
        let read = self.i2c.read(buf).map_err(bus_error)?;
        check_len(buf.len(), read)
    }
}

/// SDA/SCL held in their I2C alternate function.
pub struct RpiBusPins {
    sda: IoPin,
    scl: IoPin,
}

impl RpiBusPins {
    pub fn new(gpio: &Gpio, sda: u8, scl: u8) -> Result<Self, gpio::Error> {
        let mut sda = gpio.get(sda)?.into_io(Mode::Alt0);
        let mut scl = gpio.get(scl)?.into_io(Mode::Alt0);
        sda.set_reset_on_drop(false);
        scl.set_reset_on_drop(false);

        let mut pins = Self { sda, scl };
        pins.set_pull(Pull::None);
        Ok(pins)
    }
}

impl BusPins for RpiBusPins {
    fn set_pull(&mut self, pull: Pull) {
        let pud = match pull {
            Pull::Up => PullUpDown::PullUp,
            Pull::None => PullUpDown::Off,
        };

        self.sda.set_pullupdown(pud);
        self.scl.set_pullupdown(pud);
    }
}

/// Boost supply behind an enable line, optionally with a power-good input.
/// Without an enable line the rail is treated as always on.
pub struct RpiPowerRail {
    enable: Option<OutputPin>,
    good: Option<InputPin>,
}

impl RpiPowerRail {
    pub fn new(gpio: &Gpio, enable: Option<u8>, good: Option<u8>) -> Result<Self, gpio::Error> {
        let enable = match enable {
            Some(pin) => {
                let mut pin = gpio.get(pin)?.into_output();
                // leave the rail up for the module after we exit
                pin.set_reset_on_drop(false);
                Some(pin)
            }
            None => None,
        };
        let good = match good {
            Some(pin) => Some(gpio.get(pin)?.into_input()),
            None => None,
        };

        Ok(Self { enable, good })
    }

    fn power_good(&self) -> bool {
        self.good.as_ref().map_or(true, |pin| pin.is_high())
    }
}

impl PowerRail for RpiPowerRail {
    fn is_enabled(&mut self) -> bool {
        let switched_on = self.enable.as_ref().map_or(true, |pin| pin.is_set_high());
        switched_on && self.power_good()
    }

    fn enable(&mut self) -> Result<(), PowerFault> {
        let Some(pin) = self.enable.as_mut() else {
            return Err(PowerFault("power-good low and no enable line".into()));
        };

        pin.set_high();
        std::thread::sleep(POWER_SETTLE);

        if self.power_good() {
            Ok(())
        } else {
            if let Some(pin) = self.enable.as_mut() {
                pin.set_low();
            }
            Err(PowerFault("power-good did not assert".into()))
        }
    }
}
