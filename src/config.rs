use std::{str::FromStr, time::Duration};

use anyhow::Context;

use crate::driver::bus::EngineConfig;

/// Host wiring and bus tuning, read from `KIISU_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub i2c_bus: u8,
    pub sda_gpio: u8,
    pub scl_gpio: u8,
    /// Enable line of the boost converter feeding the bus; `None` means the
    /// rail is always on.
    pub power_enable_gpio: Option<u8>,
    pub power_good_gpio: Option<u8>,
    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            sda_gpio: 2,
            scl_gpio: 3,
            power_enable_gpio: None,
            power_good_gpio: None,
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(bus) = parse(&lookup, "KIISU_I2C_BUS")? {
            config.i2c_bus = bus;
        }
        if let Some(pin) = parse(&lookup, "KIISU_SDA_GPIO")? {
            config.sda_gpio = pin;
        }
        if let Some(pin) = parse(&lookup, "KIISU_SCL_GPIO")? {
            config.scl_gpio = pin;
        }
        config.power_enable_gpio = parse(&lookup, "KIISU_POWER_EN_GPIO")?;
        config.power_good_gpio = parse(&lookup, "KIISU_POWER_GOOD_GPIO")?;

        if let Some(ms) = parse(&lookup, "KIISU_READY_TIMEOUT_MS")? {
            config.engine.ready_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse(&lookup, "KIISU_OP_TIMEOUT_MS")? {
            config.engine.op_timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = parse(&lookup, "KIISU_RETRIES")? {
            config.engine.retries = retries;
        }

        Ok(config)
    }
}

fn parse<T>(lookup: impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("invalid value for {key}: {raw:?}"))
        })
        .transpose()
}
