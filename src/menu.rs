//! The settings list: which options exist, how an option index maps to a
//! register byte and to display text, and what happens when one changes.

use std::time::Duration;

use num_traits::FromPrimitive;
use tracing::{info, warn};

use crate::{
    driver::kiisu::{
        registers::{brightness, AutoPowerOff, StartupColor},
        Register, Settings, ADDRESS,
    },
    ui::{Popup, Surface},
};

pub const TITLE: &str = "Kiisu Manager";
pub const POPUP_TIMEOUT: Duration = Duration::from_millis(1500);

const BRIGHTNESS_STEPS: usize = 1 + (brightness::MAX / brightness::STEP) as usize;

/// Same choices as the host's own backlight timeout setting.
const SLEEP_DELAYS: [(&str, Duration); 12] = [
    ("Always ON", Duration::ZERO),
    ("1s", Duration::from_secs(1)),
    ("5s", Duration::from_secs(5)),
    ("10s", Duration::from_secs(10)),
    ("15s", Duration::from_secs(15)),
    ("30s", Duration::from_secs(30)),
    ("60s", Duration::from_secs(60)),
    ("90s", Duration::from_secs(90)),
    ("120s", Duration::from_secs(120)),
    ("5min", Duration::from_secs(300)),
    ("10min", Duration::from_secs(600)),
    ("30min", Duration::from_secs(1800)),
];

/// The host display timeout. Setting it also restarts the backlight timer.
pub trait Backlight {
    fn timeout(&self) -> Duration;

    fn set_timeout(&mut self, timeout: Duration);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    /// Local only, never sent to the module.
    SleepDelay,
    Brightness,
    AutoPowerOff,
    StartupColor,
    ChargeRainbow,
}

/// What a change to an item does outside the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Write(Register, u8),
    SleepDelay(Duration),
}

impl Item {
    pub const ALL: [Item; 5] = [
        Item::SleepDelay,
        Item::Brightness,
        Item::AutoPowerOff,
        Item::StartupColor,
        Item::ChargeRainbow,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Item::SleepDelay => "Time until sleep",
            Item::Brightness => "LED Brightness",
            Item::AutoPowerOff => "Auto Power-Off",
            Item::StartupColor => "Startup Color",
            Item::ChargeRainbow => "Charge Rainbow",
        }
    }

    pub fn count(self) -> usize {
        match self {
            Item::SleepDelay => SLEEP_DELAYS.len(),
            Item::Brightness => BRIGHTNESS_STEPS,
            Item::AutoPowerOff => AutoPowerOff::COUNT,
            Item::StartupColor => StartupColor::COUNT,
            Item::ChargeRainbow => 2,
        }
    }

    pub fn register(self) -> Option<Register> {
        match self {
            Item::SleepDelay => None,
            Item::Brightness => Some(Register::LedBrightness),
            Item::AutoPowerOff => Some(Register::AutoPowerOff),
            Item::StartupColor => Some(Register::StartupColor),
            Item::ChargeRainbow => Some(Register::ChargeRainbow),
        }
    }

    pub fn effect(self, index: usize) -> Effect {
        match self.register() {
            Some(Register::LedBrightness) => {
                Effect::Write(Register::LedBrightness, brightness_value(index))
            }
            Some(reg) => Effect::Write(reg, index.min(u8::MAX as usize) as u8),
            None => Effect::SleepDelay(SLEEP_DELAYS[sleep_index(index)].1),
        }
    }

    pub fn text(self, index: usize) -> String {
        match self {
            Item::SleepDelay => SLEEP_DELAYS[sleep_index(index)].0.to_string(),
            Item::Brightness => match brightness_value(index) {
                brightness::AUTO => format!("{} (Auto)", brightness::AUTO),
                value => format!("{value}%"),
            },
            Item::AutoPowerOff => AutoPowerOff::from_usize(index)
                .unwrap_or(AutoPowerOff::Min60)
                .name()
                .to_string(),
            Item::StartupColor => StartupColor::from_usize(index)
                .unwrap_or(StartupColor::White)
                .name()
                .to_string(),
            Item::ChargeRainbow => (if index == 0 { "Off" } else { "On" }).to_string(),
        }
    }

    /// Index to show for a register byte read back from the module, or the
    /// item's default when the read failed.
    pub fn initial_index(self, read: Option<u8>) -> usize {
        match (self, read) {
            (Item::SleepDelay, _) => 0,
            (Item::Brightness, Some(value)) => {
                ((value / brightness::STEP) as usize).min(BRIGHTNESS_STEPS - 1)
            }
            (Item::Brightness, None) => 0,
            (Item::AutoPowerOff, Some(value)) if (value as usize) < AutoPowerOff::COUNT => {
                value as usize
            }
            (Item::AutoPowerOff, _) => AutoPowerOff::Sec15 as usize,
            (Item::StartupColor, Some(value)) if (value as usize) < StartupColor::COUNT => {
                value as usize
            }
            (Item::StartupColor, _) => StartupColor::Purple as usize,
            (Item::ChargeRainbow, Some(value)) => (value != 0) as usize,
            (Item::ChargeRainbow, None) => 1,
        }
    }
}

fn brightness_value(index: usize) -> u8 {
    let index = index.min(BRIGHTNESS_STEPS - 1) as u8;
    index * brightness::STEP
}

fn sleep_index(index: usize) -> usize {
    if index < SLEEP_DELAYS.len() {
        index
    } else {
        0
    }
}

fn sleep_index_for(timeout: Duration) -> usize {
    SLEEP_DELAYS
        .iter()
        .position(|(_, delay)| *delay == timeout)
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub item: Item,
    pub index: usize,
    pub text: String,
}

pub struct Manager<S, B> {
    settings: S,
    backlight: B,
    entries: Vec<Entry>,
}

impl<S: Settings, B: Backlight> Manager<S, B> {
    pub fn new(settings: S, backlight: B) -> Self {
        Self {
            settings,
            backlight,
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Probes the module, loads every item and shows the list. A missing
    /// module only gets a popup; the list still works so changes can be
    /// retried once it shows up.
    pub fn start<U: Surface>(&mut self, surface: &mut U) {
        self.announce_presence(surface);
        self.build();
        surface.show_list(&self.entries);
    }

    /// Re-runs the presence check and returns to the list.
    pub fn recheck<U: Surface>(&mut self, surface: &mut U) -> bool {
        let present = self.announce_presence(surface);
        surface.show_list(&self.entries);
        present
    }

    /// Applies a new option index to the item at `pos`. Returns the new
    /// display text, or `None` if `pos` or `index` are out of range.
    pub fn on_value_changed<U: Surface>(
        &mut self,
        surface: &mut U,
        pos: usize,
        index: usize,
    ) -> Option<String> {
        let entry = self.entries.get_mut(pos)?;
        let item = entry.item;
        if index >= item.count() {
            return None;
        }

        entry.index = index;
        entry.text = item.text(index);
        surface.show_value(pos, entry);

        match item.effect(index) {
            Effect::Write(reg, value) => {
                if let Err(e) = self.settings.write_u8(reg, value) {
                    warn!(?reg, value, "could not update {}: {e}", item.label());
                }
            }
            Effect::SleepDelay(timeout) => self.backlight.set_timeout(timeout),
        }

        Some(entry.text.clone())
    }

    fn announce_presence<U: Surface>(&mut self, surface: &mut U) -> bool {
        if self.settings.probe_ready() {
            info!("kiisu found at {ADDRESS}");
            return true;
        }

        warn!("kiisu not found at {ADDRESS}");
        surface.show_popup(&Popup {
            title: TITLE.to_string(),
            text: format!("Device @{ADDRESS} not found"),
            timeout: POPUP_TIMEOUT,
        });
        false
    }

    fn build(&mut self) {
        self.entries = Item::ALL
            .iter()
            .map(|&item| {
                let index = self.load_index(item);
                Entry {
                    item,
                    index,
                    text: item.text(index),
                }
            })
            .collect();
    }

    fn load_index(&self, item: Item) -> usize {
        let Some(reg) = item.register() else {
            return sleep_index_for(self.backlight.timeout());
        };

        let read = match self.settings.read_u8(reg) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(?reg, "could not read {}: {e}", item.label());
                None
            }
        };
        item.initial_index(read)
    }
}
