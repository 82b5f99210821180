//! Transaction engine for a shared, intermittently powered I2C bus.
//!
//! Every operation follows the same bracket: make sure the power rail is up,
//! take the bus lock, force the internal pull-ups on, run the transfer with
//! bounded retries, drop the pull-ups back and release the lock.

use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use embedded_hal::blocking::delay::DelayMs;
use thiserror::Error;
use tracing::{debug, warn};

pub mod hal;
pub mod strategy;

#[cfg(test)]
pub(crate) mod fake;

pub use hal::{Address, BusError, BusPins, I2cMaster, PowerFault, PowerRail, Pull};

use strategy::{ReadRequest, Strategy, WriteRequest};

pub const RETRIES: u8 = 2;
pub const RETRY_DELAY: Duration = Duration::from_millis(2);
pub const READY_TIMEOUT: Duration = Duration::from_millis(50);
pub const OP_TIMEOUT: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Extra rounds after the first one fails.
    pub retries: u8,
    pub retry_delay: Duration,
    /// Timeout for presence checks.
    pub ready_timeout: Duration,
    /// Timeout for register reads and writes.
    pub op_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retries: RETRIES,
            retry_delay: RETRY_DELAY,
            ready_timeout: READY_TIMEOUT,
            op_timeout: OP_TIMEOUT,
        }
    }
}

impl EngineConfig {
    pub fn rounds(&self) -> u32 {
        u32::from(self.retries) + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Probe,
    Read,
    Write,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Op::Probe => "probe",
            Op::Read => "read",
            Op::Write => "write",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("bus power unavailable")]
    PowerUnavailable(#[source] PowerFault),
    #[error("{op} at {address} failed after {rounds} rounds")]
    Exhausted {
        op: Op,
        address: Address,
        rounds: u32,
        #[source]
        last: BusError,
    },
    #[error("no destination for register read")]
    NoDestination,
}

struct Bus<I, L, D> {
    i2c: I,
    pins: L,
    delay: D,
}

/// Exclusive hold on the bus with the pull-ups forced on. Dropping it
/// restores the lines and releases the bus, in that order.
struct BusGuard<'a, I: I2cMaster, L: BusPins, D> {
    bus: MutexGuard<'a, Bus<I, L, D>>,
}

impl<'a, I: I2cMaster, L: BusPins, D> BusGuard<'a, I, L, D> {
    fn new(mut bus: MutexGuard<'a, Bus<I, L, D>>) -> Self {
        bus.i2c.acquire();
        bus.pins.set_pull(Pull::Up);
        Self { bus }
    }
}

impl<I: I2cMaster, L: BusPins, D> Drop for BusGuard<'_, I, L, D> {
    fn drop(&mut self) {
        self.bus.pins.set_pull(Pull::None);
        self.bus.i2c.release();
    }
}

impl<I: I2cMaster, L: BusPins, D> Deref for BusGuard<'_, I, L, D> {
    type Target = Bus<I, L, D>;

    fn deref(&self) -> &Self::Target {
        &self.bus
    }
}

impl<I: I2cMaster, L: BusPins, D> DerefMut for BusGuard<'_, I, L, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bus
    }
}

pub struct Engine<I, P, L, D> {
    config: EngineConfig,
    power: Mutex<P>,
    bus: Mutex<Bus<I, L, D>>,
}

impl<I, P, L, D> Engine<I, P, L, D>
where
    I: I2cMaster,
    P: PowerRail,
    L: BusPins,
    D: DelayMs<u32>,
{
    pub fn new(i2c: I, power: P, pins: L, delay: D, config: EngineConfig) -> Self {
        Self {
            config,
            power: Mutex::new(power),
            bus: Mutex::new(Bus { i2c, pins, delay }),
        }
    }

    /// Checks whether anything acknowledges `addr`.
    pub fn probe(&self, addr: Address) -> Result<(), Error> {
        self.transact(
            Op::Probe,
            addr,
            &mut (),
            &strategy::probe(),
            self.config.ready_timeout,
        )
    }

    /// Writes `data` to register `reg`, falling back to a framed transmit
    /// when the register-write primitive fails.
    pub fn write(&self, addr: Address, reg: u8, data: &[u8]) -> Result<(), Error> {
        let mut req = WriteRequest { reg, data };
        self.transact(
            Op::Write,
            addr,
            &mut req,
            &strategy::write(),
            self.config.op_timeout,
        )
    }

    /// Reads register `reg` into `buf` with a repeated start, falling back
    /// to a separate transmit and receive.
    pub fn read(&self, addr: Address, reg: u8, buf: &mut [u8]) -> Result<(), Error> {
        let mut req = ReadRequest { reg, buf };
        self.transact(
            Op::Read,
            addr,
            &mut req,
            &strategy::read(),
            self.config.op_timeout,
        )
    }

    fn ensure_power(&self) -> Result<(), Error> {
        let mut power = self.power.lock().unwrap_or_else(PoisonError::into_inner);
        if power.is_enabled() {
            return Ok(());
        }

        debug!("bus power rail is off, enabling");
        power.enable().map_err(|e| {
            warn!("could not enable bus power: {e}");
            Error::PowerUnavailable(e)
        })
    }

    fn acquire(&self) -> BusGuard<'_, I, L, D> {
        // a panic inside a transfer still ran the guard's drop, so the
        // lines are already back to default
        BusGuard::new(self.bus.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn transact<R>(
        &self,
        op: Op,
        addr: Address,
        req: &mut R,
        strategies: &[Strategy<I, R>],
        timeout: Duration,
    ) -> Result<(), Error> {
        self.ensure_power()?;

        let mut guard = self.acquire();
        let bus = &mut *guard;
        let rounds = self.config.rounds();
        let delay_ms = u32::try_from(self.config.retry_delay.as_millis()).unwrap_or(u32::MAX);
        let mut last = BusError::Bus;

        for round in 0..rounds {
            if round > 0 {
                bus.delay.delay_ms(delay_ms);
            }

            match strategy::run_round(&mut bus.i2c, addr, req, strategies, timeout) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!(%op, %addr, round, "round failed: {e}");
                    last = e;
                }
            }
        }

        warn!(%op, %addr, "giving up after {rounds} rounds: {last}");
        Err(Error::Exhausted {
            op,
            address: addr,
            rounds,
            last,
        })
    }
}
