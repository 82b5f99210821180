//! Terminal stand-in for the host's list and popup views.

use std::{str::FromStr, thread::JoinHandle, time::Duration};

use thiserror::Error;
use tracing::{debug, info};

use crate::menu::{Backlight, Entry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub title: String,
    pub text: String,
    pub timeout: Duration,
}

pub trait Surface {
    fn show_list(&mut self, entries: &[Entry]);

    /// Returns once the popup has timed out.
    fn show_popup(&mut self, popup: &Popup);

    fn show_value(&mut self, pos: usize, entry: &Entry);
}

#[derive(Default)]
pub struct Terminal;

impl Surface for Terminal {
    fn show_list(&mut self, entries: &[Entry]) {
        println!();
        for (pos, entry) in entries.iter().enumerate() {
            println!(
                "{:>2}. {:<18} {:<10} ({}/{})",
                pos + 1,
                entry.item.label(),
                entry.text,
                entry.index,
                entry.item.count() - 1
            );
        }
        println!("commands: list | set <item> <index> | probe | quit");
    }

    fn show_popup(&mut self, popup: &Popup) {
        println!();
        println!("[{}] {}", popup.title, popup.text);
        std::thread::sleep(popup.timeout);
    }

    fn show_value(&mut self, pos: usize, entry: &Entry) {
        println!("{:>2}. {:<18} {}", pos + 1, entry.item.label(), entry.text);
    }
}

/// Backlight timeout kept in memory; the host display service owns the
/// persisted copy.
#[derive(Debug, Default)]
pub struct TerminalBacklight {
    timeout: Duration,
}

impl Backlight for TerminalBacklight {
    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
        info!(?timeout, "display timeout changed, backlight re-armed");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    List,
    /// `pos` is the 0-based list position.
    Set { pos: usize, index: usize },
    Probe,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}")]
    Unknown(String),
    #[error("usage: set <item> <index>")]
    BadSet,
}

impl FromStr for Input {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();

        match words.next() {
            None => Err(InputError::Empty),
            Some("list" | "l") => Ok(Input::List),
            Some("probe" | "p") => Ok(Input::Probe),
            Some("quit" | "q" | "exit") => Ok(Input::Quit),
            Some("set" | "s") => {
                let mut number = || words.next().and_then(|w| w.parse::<usize>().ok());
                let item = number().ok_or(InputError::BadSet)?;
                let index = number().ok_or(InputError::BadSet)?;
                if item == 0 || words.next().is_some() {
                    return Err(InputError::BadSet);
                }
                Ok(Input::Set {
                    pos: item - 1,
                    index,
                })
            }
            Some(other) => Err(InputError::Unknown(other.to_string())),
        }
    }
}

/// Forwards stdin lines. The channel closes when stdin does.
pub fn spawn_input_thread(tx: flume::Sender<String>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
        debug!("stdin closed");
    })
}

#[cfg(test)]
mod test {
    use super::{Input, InputError};

    #[test]
    fn parse_commands() {
        assert_eq!("list".parse::<Input>(), Ok(Input::List));
        assert_eq!("  probe ".parse::<Input>(), Ok(Input::Probe));
        assert_eq!("q".parse::<Input>(), Ok(Input::Quit));
        assert_eq!("set 3 5".parse::<Input>(), Ok(Input::Set { pos: 2, index: 5 }));
    }

    #[test]
    fn reject_bad_commands() {
        assert_eq!("".parse::<Input>(), Err(InputError::Empty));
        assert_eq!("set 0 1".parse::<Input>(), Err(InputError::BadSet));
        assert_eq!("set 2".parse::<Input>(), Err(InputError::BadSet));
        assert_eq!("set 2 x".parse::<Input>(), Err(InputError::BadSet));
        assert_eq!("set 2 1 9".parse::<Input>(), Err(InputError::BadSet));
        assert_eq!(
            "reboot".parse::<Input>(),
            Err(InputError::Unknown("reboot".to_string()))
        );
    }
}
