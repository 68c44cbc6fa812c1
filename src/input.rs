//! Button edge detection and serial command decoding.

use strum_macros::{EnumIter, EnumString};

use crate::{
    driver::elapsed,
    error::CommandError,
    hal::{Board, BoardExt, Input},
    types::{ControlMode, Duration, Instant, OperatingMode},
};

/// Longest command line accepted, terminator excluded.
pub const MAX_LINE: usize = 16;

/// Rising edge detector with a debounce window.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last_accepted: Option<Instant>,
    last_level: bool,
}

impl Debouncer {
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
            last_level: false,
        }
    }

    /// Feed the sampled level. Returns `true` for an accepted press.
    ///
    /// A rising edge within `window` of the last accepted one is treated as bounce.
    pub fn update(&mut self, level: bool, now: Instant) -> bool {
        let rising = level && !self.last_level;
        self.last_level = level;
        if !rising {
            return false;
        }
        if self
            .last_accepted
            .is_some_and(|last| elapsed(now, last) < self.window)
        {
            return false;
        }
        self.last_accepted = Some(now);
        true
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ButtonEvent {
    Menu,
    Select,
}

/// The two front panel buttons, each with its own debounce window.
pub struct ButtonInputs {
    menu: Debouncer,
    select: Debouncer,
}

impl ButtonInputs {
    pub const fn new(debounce: Duration) -> Self {
        Self {
            menu: Debouncer::new(debounce),
            select: Debouncer::new(debounce),
        }
    }

    /// Sample both buttons and return the presses accepted this tick, menu first.
    pub fn poll<B: Board>(&mut self, board: &mut B, now: Instant) -> heapless::Vec<ButtonEvent, 2> {
        let mut events = heapless::Vec::new();
        if self.menu.update(board.input_active(Input::MenuButton), now) {
            let _ = events.push(ButtonEvent::Menu);
        }
        if self.select.update(board.input_active(Input::SelectButton), now) {
            let _ = events.push(ButtonEvent::Select);
        }
        events
    }
}

/// Commands accepted on the serial link, one per line.
#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumString, EnumIter)]
pub enum Command {
    #[strum(serialize = "man")]
    Manual,
    #[strum(serialize = "semi")]
    SemiAutomatic,
    #[strum(serialize = "auto")]
    FullyAutomatic,
    #[strum(serialize = "gen")]
    Generator,
    #[strum(serialize = "grid")]
    Grid,
    #[strum(serialize = "stop")]
    Stop,
}

/// What a [`Command`] asks for.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Selection {
    Operating(OperatingMode),
    Control(ControlMode),
}

impl Command {
    pub const fn selection(self) -> Selection {
        match self {
            Command::Manual => Selection::Operating(OperatingMode::Manual),
            Command::SemiAutomatic => Selection::Operating(OperatingMode::SemiAutomatic),
            Command::FullyAutomatic => Selection::Operating(OperatingMode::FullyAutomatic),
            Command::Generator => Selection::Control(ControlMode::Generator),
            Command::Grid => Selection::Control(ControlMode::Grid),
            Command::Stop => Selection::Control(ControlMode::Stop),
        }
    }

    /// Echoed back to the app once the command is accepted.
    pub const fn acknowledgement(self) -> &'static str {
        match self {
            Command::Manual => "manual",
            Command::SemiAutomatic => "semi",
            Command::FullyAutomatic => "auto",
            Command::Generator => "gen",
            Command::Grid => "grid",
            Command::Stop => "stop",
        }
    }
}

/// Accumulates serial bytes into newline terminated command lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    line: heapless::String<MAX_LINE>,
    overflowed: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one received byte. Returns the decoded line once its `\n` arrives.
    pub fn push(&mut self, byte: u8) -> Option<Result<Command, CommandError>> {
        match byte {
            b'\r' => None,
            b'\n' => {
                let decoded = if self.overflowed {
                    Err(CommandError::LineTooLong)
                } else {
                    self.line
                        .parse::<Command>()
                        .map_err(|_| CommandError::Unknown)
                };
                self.line.clear();
                self.overflowed = false;
                Some(decoded)
            }
            _ => {
                if !self.overflowed && self.line.push(char::from(byte)).is_err() {
                    self.overflowed = true;
                }
                None
            }
        }
    }
}
