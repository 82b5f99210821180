use anyhow::Context;
use rppal::gpio::Gpio;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    driver::{
        bus::Engine,
        kiisu::Kiisu,
        rpi::{RpiBusPins, RpiI2c, RpiPowerRail},
        ThreadDelay,
    },
    menu::Manager,
    ui::{Input, Surface, Terminal, TerminalBacklight},
};

mod config;
mod driver;
mod menu;
mod ui;

type RpiKiisu = Kiisu<RpiI2c, RpiPowerRail, RpiBusPins, ThreadDelay>;

fn open(config: &Config) -> anyhow::Result<RpiKiisu> {
    let i2c = RpiI2c::new(config.i2c_bus)
        .with_context(|| format!("failed to open i2c bus {}", config.i2c_bus))?;
    let gpio = Gpio::new().context("failed to open gpio")?;
    let pins = RpiBusPins::new(&gpio, config.sda_gpio, config.scl_gpio)
        .context("failed to claim i2c lines")?;
    let power = RpiPowerRail::new(&gpio, config.power_enable_gpio, config.power_good_gpio)
        .context("failed to claim power rail pins")?;

    let engine = Engine::new(i2c, power, pins, ThreadDelay, config.engine);
    Ok(Kiisu::new(engine))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let kiisu = open(&config)?;
    info!(
        "using i2c bus {} for kiisu at {} (0x{:02x} on the wire)",
        config.i2c_bus,
        kiisu.address(),
        kiisu.address().wire()
    );

    let (quit_tx, quit_rx) = flume::bounded(1);
    ctrlc::set_handler(move || {
        info!("received ctrl+c, exiting");
        let _ = quit_tx.try_send(());
    })?;

    let (line_tx, line_rx) = flume::bounded(16);
    let _input_join = ui::spawn_input_thread(line_tx);

    let mut terminal = Terminal;
    let mut manager = Manager::new(kiisu, TerminalBacklight::default());
    manager.start(&mut terminal);

    loop {
        let line = flume::Selector::new()
            .recv(&line_rx, |line| line.ok())
            .recv(&quit_rx, |_| None)
            .wait();

        // stdin closed or ctrl+c
        let Some(line) = line else { break };

        match line.parse::<Input>() {
            Ok(Input::List) => terminal.show_list(manager.entries()),
            Ok(Input::Set { pos, index }) => {
                if manager.on_value_changed(&mut terminal, pos, index).is_none() {
                    warn!(pos, index, "no such item or option");
                }
            }
            Ok(Input::Probe) => {
                manager.recheck(&mut terminal);
            }
            Ok(Input::Quit) => break,
            Err(e) => println!("{e}"),
        }
    }

    // the input thread stays blocked on stdin; it goes away with the process
    info!("exit");

    Ok(())
}
