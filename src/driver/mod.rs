use std::time::Duration;

pub mod bus;
pub mod kiisu;
pub mod rpi;

pub struct ThreadDelay;

impl embedded_hal::blocking::delay::DelayMs<u32> for ThreadDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64))
    }
}
