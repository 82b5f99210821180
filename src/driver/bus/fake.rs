//! Recording stand-ins for the bus hardware, shared by the driver tests.

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use super::{
    hal::{Address, BusError, BusPins, I2cMaster, PowerFault, PowerRail, Pull},
    Engine, EngineConfig,
};
use crate::driver::ThreadDelay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Acquire,
    Release,
    Pull(Pull),
    Ready,
    WriteMem,
    Transmit,
    WriteRead,
    TransmitReceive,
    PowerEnable,
}

impl Call {
    fn is_power(self) -> bool {
        matches!(self, Call::PowerEnable)
    }
}

#[derive(Debug)]
pub struct State {
    pub calls: Vec<(Call, Instant)>,
    /// Timeout handed to each bus primitive, in call order.
    pub timeouts: Vec<(Call, Duration)>,
    pub regs: [u8; 256],
    pub present: bool,
    pub fail_primitive: bool,
    pub fail_fallback: bool,
    pub power_on: bool,
    pub power_fails: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            timeouts: Vec::new(),
            regs: [0u8; 256],
            present: true,
            fail_primitive: false,
            fail_fallback: false,
            power_on: true,
            power_fails: false,
        }
    }
}

pub const READY_TIMEOUT: Duration = Duration::from_millis(5);
pub const OP_TIMEOUT: Duration = Duration::from_millis(10);

pub type FakeEngine = Engine<FakeI2c, FakePower, FakePins, ThreadDelay>;

#[derive(Clone, Default)]
pub struct Harness(Arc<Mutex<State>>);

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engine(&self) -> FakeEngine {
        let config = EngineConfig {
            ready_timeout: READY_TIMEOUT,
            op_timeout: OP_TIMEOUT,
            ..EngineConfig::default()
        };

        Engine::new(
            FakeI2c(self.clone()),
            FakePower(self.clone()),
            FakePins(self.clone()),
            ThreadDelay,
            config,
        )
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        f(&mut self.0.lock().unwrap())
    }

    pub fn reg(&self, reg: u8) -> u8 {
        self.with(|s| s.regs[reg as usize])
    }

    pub fn count(&self, call: Call) -> usize {
        self.with(|s| s.calls.iter().filter(|(c, _)| *c == call).count())
    }

    pub fn times(&self, call: Call) -> Vec<Instant> {
        self.with(|s| {
            s.calls
                .iter()
                .filter(|(c, _)| *c == call)
                .map(|(_, t)| *t)
                .collect()
        })
    }

    /// Everything that happened on the bus side, in order.
    pub fn bus_calls(&self) -> Vec<Call> {
        self.with(|s| {
            s.calls
                .iter()
                .map(|(c, _)| *c)
                .filter(|c| !c.is_power())
                .collect()
        })
    }

    fn record(&self, call: Call) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.0.lock().unwrap();
        state.calls.push((call, Instant::now()));
        state
    }

    fn record_timed(&self, call: Call, timeout: Duration) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.record(call);
        state.timeouts.push((call, timeout));
        state
    }
}

pub struct FakeI2c(Harness);

impl I2cMaster for FakeI2c {
    fn acquire(&mut self) {
        drop(self.0.record(Call::Acquire));
    }

    fn release(&mut self) {
        drop(self.0.record(Call::Release));
    }

    fn is_device_ready(&mut self, _: Address, timeout: Duration) -> Result<(), BusError> {
        let state = self.0.record_timed(Call::Ready, timeout);
        if state.present {
            Ok(())
        } else {
            Err(BusError::Nack)
        }
    }

    fn write_mem(
        &mut self,
        _: Address,
        reg: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<(), BusError> {
        let mut state = self.0.record_timed(Call::WriteMem, timeout);
        if !state.present || state.fail_primitive {
            return Err(BusError::Nack);
        }

        let start = reg as usize;
        state.regs[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn transmit(&mut self, _: Address, data: &[u8], timeout: Duration) -> Result<(), BusError> {
        let mut state = self.0.record_timed(Call::Transmit, timeout);
        if !state.present || state.fail_fallback {
            return Err(BusError::Nack);
        }

        let start = data[0] as usize;
        state.regs[start..start + data.len() - 1].copy_from_slice(&data[1..]);
        Ok(())
    }

    fn write_read(
        &mut self,
        _: Address,
        data: &[u8],
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusError> {
        let state = self.0.record_timed(Call::WriteRead, timeout);
        if !state.present || state.fail_primitive {
            return Err(BusError::Nack);
        }

        let start = data[0] as usize;
        buf.copy_from_slice(&state.regs[start..start + buf.len()]);
        Ok(())
    }

    fn transmit_receive(
        &mut self,
        _: Address,
        data: &[u8],
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusError> {
        let state = self.0.record_timed(Call::TransmitReceive, timeout);
        if !state.present || state.fail_fallback {
            return Err(BusError::Nack);
        }

        let start = data[0] as usize;
        buf.copy_from_slice(&state.regs[start..start + buf.len()]);
        Ok(())
    }
}

pub struct FakePower(Harness);

impl PowerRail for FakePower {
    fn is_enabled(&mut self) -> bool {
        self.0.with(|s| s.power_on)
    }

    fn enable(&mut self) -> Result<(), PowerFault> {
        let mut state = self.0.record(Call::PowerEnable);
        if state.power_fails {
            return Err(PowerFault("boost converter did not start".into()));
        }

        state.power_on = true;
        Ok(())
    }
}

pub struct FakePins(Harness);

impl BusPins for FakePins {
    fn set_pull(&mut self, pull: Pull) {
        drop(self.0.record(Call::Pull(pull)));
    }
}
