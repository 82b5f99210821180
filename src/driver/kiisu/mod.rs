//! Client for the Kiisu companion module's settings registers.
//!
//! The module sits on the host's power I2C bus at a fixed address and
//! exposes a handful of single-byte registers. Nothing is cached here: the
//! module is the source of truth, so every call goes to the bus.

use embedded_hal::blocking::delay::DelayMs;
use tracing::debug;

use super::bus::{Address, BusPins, Engine, Error, I2cMaster, PowerRail};

pub mod registers;

pub use registers::Register;

pub const ADDRESS: Address = Address::new(0x31);

/// What the settings menu needs from the module.
pub trait Settings {
    fn probe_ready(&self) -> bool;

    fn read_u8(&self, reg: Register) -> Result<u8, Error>;

    fn write_u8(&self, reg: Register, value: u8) -> Result<(), Error>;
}

pub struct Kiisu<I, P, L, D> {
    engine: Engine<I, P, L, D>,
    address: Address,
}

impl<I, P, L, D> Kiisu<I, P, L, D>
where
    I: I2cMaster,
    P: PowerRail,
    L: BusPins,
    D: DelayMs<u32>,
{
    pub fn new(engine: Engine<I, P, L, D>) -> Self {
        Self {
            engine,
            address: ADDRESS,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Reads `reg` into `dest`. `dest` is only written on success; a missing
    /// destination is rejected before the bus is touched.
    pub fn read_into(&self, reg: Register, dest: Option<&mut u8>) -> Result<(), Error> {
        let dest = dest.ok_or(Error::NoDestination)?;

        let mut buf = [0u8; 1];
        self.engine.read(self.address, reg.into(), &mut buf)?;
        debug!(?reg, value = buf[0], "read register");

        *dest = buf[0];
        Ok(())
    }
}

impl<I, P, L, D> Settings for Kiisu<I, P, L, D>
where
    I: I2cMaster,
    P: PowerRail,
    L: BusPins,
    D: DelayMs<u32>,
{
    fn probe_ready(&self) -> bool {
        match self.engine.probe(self.address) {
            Ok(()) => true,
            Err(e) => {
                debug!("kiisu not ready: {e}");
                false
            }
        }
    }

    fn read_u8(&self, reg: Register) -> Result<u8, Error> {
        let mut value = 0;
        self.read_into(reg, Some(&mut value))?;
        Ok(value)
    }

    fn write_u8(&self, reg: Register, value: u8) -> Result<(), Error> {
        self.engine.write(self.address, reg.into(), &[value])?;
        debug!(?reg, value, "wrote register");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{Kiisu, Register, Settings};
    use crate::driver::bus::{
        fake::{Call, FakeI2c, FakePins, FakePower, Harness},
        Error,
    };
    use crate::driver::ThreadDelay;

    fn kiisu(h: &Harness) -> Kiisu<FakeI2c, FakePower, FakePins, ThreadDelay> {
        Kiisu::new(h.engine())
    }

    #[test]
    fn write_then_read_round_trips_every_value() {
        let h = Harness::new();
        let kiisu = kiisu(&h);

        for reg in Register::ALL {
            for value in 0..=u8::MAX {
                kiisu.write_u8(reg, value).unwrap();
                assert_eq!(kiisu.read_u8(reg).unwrap(), value);
            }
        }
    }

    #[test]
    fn writes_land_in_the_named_register() {
        let h = Harness::new();
        let kiisu = kiisu(&h);

        kiisu.write_u8(Register::AutoPowerOff, 5).unwrap();

        assert_eq!(h.reg(0x01), 5);
        assert_eq!(h.reg(0x00), 0);
    }

    #[test]
    fn read_without_destination_does_no_io() {
        let h = Harness::new();
        h.with(|s| s.power_on = false);
        let kiisu = kiisu(&h);

        assert_eq!(
            kiisu.read_into(Register::LedBrightness, None),
            Err(Error::NoDestination)
        );
        assert_eq!(h.with(|s| s.calls.len()), 0);
    }

    #[test]
    fn failed_read_leaves_destination_alone() {
        let h = Harness::new();
        h.with(|s| s.present = false);
        let kiisu = kiisu(&h);

        let mut value = 42;
        assert!(kiisu
            .read_into(Register::StartupColor, Some(&mut value))
            .is_err());
        assert_eq!(value, 42);
    }

    #[test]
    fn probe_reports_presence() {
        let h = Harness::new();
        let kiisu = kiisu(&h);
        assert!(kiisu.probe_ready());

        h.with(|s| s.present = false);
        assert!(!kiisu.probe_ready());
    }

    #[test]
    fn probe_is_false_when_power_cannot_be_enabled() {
        let h = Harness::new();
        h.with(|s| {
            s.power_on = false;
            s.power_fails = true;
        });
        let kiisu = kiisu(&h);

        assert!(!kiisu.probe_ready());
        assert_eq!(h.count(Call::Ready), 0);
        assert_eq!(h.count(Call::Acquire), 0);
    }

    #[test]
    fn acquire_and_release_stay_paired() {
        let h = Harness::new();
        let kiisu = kiisu(&h);

        let mut flip = false;
        for reg in Register::ALL {
            h.with(|s| {
                s.present = flip;
                s.fail_primitive = !flip;
            });
            let _ = kiisu.probe_ready();
            let _ = kiisu.write_u8(reg, 1);
            let _ = kiisu.read_u8(reg);
            flip = !flip;
        }

        assert_eq!(h.count(Call::Acquire), 12);
        assert_eq!(h.count(Call::Release), 12);
    }
}
