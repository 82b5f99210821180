//! The ordered attempts that make up one retry round.

use std::time::Duration;

use super::hal::{Address, BusError, I2cMaster};

/// Register byte plus payload must fit this frame for the framed fallback.
pub const FRAME_MAX: usize = 1 + 32;

pub struct Strategy<I, R> {
    pub name: &'static str,
    pub run: fn(&mut I, Address, &mut R, Duration) -> Result<(), BusError>,
}

pub struct WriteRequest<'a> {
    pub reg: u8,
    pub data: &'a [u8],
}

pub struct ReadRequest<'a> {
    pub reg: u8,
    pub buf: &'a mut [u8],
}

pub fn probe<I: I2cMaster>() -> [Strategy<I, ()>; 1] {
    [Strategy {
        name: "device ready",
        run: is_device_ready::<I>,
    }]
}

pub fn write<'a, I: I2cMaster>() -> [Strategy<I, WriteRequest<'a>>; 2] {
    [
        Strategy {
            name: "register write",
            run: write_mem::<I>,
        },
        Strategy {
            name: "framed transmit",
            run: framed_transmit::<I>,
        },
    ]
}

pub fn read<'a, I: I2cMaster>() -> [Strategy<I, ReadRequest<'a>>; 2] {
    [
        Strategy {
            name: "restart read",
            run: restart_read::<I>,
        },
        Strategy {
            name: "transmit then receive",
            run: transmit_receive::<I>,
        },
    ]
}

/// Walks `strategies` in order and stops at the first that succeeds.
pub fn run_round<I, R>(
    i2c: &mut I,
    addr: Address,
    req: &mut R,
    strategies: &[Strategy<I, R>],
    timeout: Duration,
) -> Result<(), BusError> {
    let mut last = BusError::Bus;

    for strategy in strategies {
        match (strategy.run)(i2c, addr, req, timeout) {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::trace!(strategy = strategy.name, %addr, "attempt failed: {e}");
                last = e;
            }
        }
    }

    Err(last)
}

fn is_device_ready<I: I2cMaster>(
    i2c: &mut I,
    addr: Address,
    _: &mut (),
    timeout: Duration,
) -> Result<(), BusError> {
    i2c.is_device_ready(addr, timeout)
}

fn write_mem<I: I2cMaster>(
    i2c: &mut I,
    addr: Address,
    req: &mut WriteRequest<'_>,
    timeout: Duration,
) -> Result<(), BusError> {
    i2c.write_mem(addr, req.reg, req.data, timeout)
}

fn framed_transmit<I: I2cMaster>(
    i2c: &mut I,
    addr: Address,
    req: &mut WriteRequest<'_>,
    timeout: Duration,
) -> Result<(), BusError> {
    let end = 1 + req.data.len();
    if end > FRAME_MAX {
        return Err(BusError::FrameTooLarge);
    }

    let mut frame = [0u8; FRAME_MAX];
    frame[0] = req.reg;
    frame[1..end].copy_from_slice(req.data);

    i2c.transmit(addr, &frame[..end], timeout)
}

fn restart_read<I: I2cMaster>(
    i2c: &mut I,
    addr: Address,
    req: &mut ReadRequest<'_>,
    timeout: Duration,
) -> Result<(), BusError> {
    i2c.write_read(addr, &[req.reg], &mut *req.buf, timeout)
}

fn transmit_receive<I: I2cMaster>(
    i2c: &mut I,
    addr: Address,
    req: &mut ReadRequest<'_>,
    timeout: Duration,
) -> Result<(), BusError> {
    i2c.transmit_receive(addr, &[req.reg], &mut *req.buf, timeout)
}
