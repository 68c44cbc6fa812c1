//! This module defines the pin roles of the transfer switch board and the
//! [`Board`] trait the controller uses to reach them.
//!
//! Pin numbers are those of the Arduino Nano wiring the controller was built for.
//! Analog pins double as digital I/O and are numbered A1 = 15 .. A6 = 20.

use strum_macros::{EnumCount, EnumIter};

/// Electrical level of a pin.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        match value {
            true => Level::High,
            false => Level::Low,
        }
    }
}

impl From<Level> for bool {
    fn from(value: Level) -> Self {
        match value {
            Level::Low => false,
            Level::High => true,
        }
    }
}

/// Relay outputs. Energized when driven high.
#[derive(Debug, EnumIter, EnumCount, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum Relay {
    Grid = 20,
    Generator = 19,
    Load = 12,
}

/// Status LEDs. Wired active-low: driving the pin LOW lights the LED.
#[derive(Debug, EnumIter, EnumCount, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum Indicator {
    LoadFail = 9,
    Manual = 2,
    SemiAuto = 3,
    FullyAuto = 4,
    LoadOn = 5,
    GenOn = 6,
    GenFail = 7,
    GridOn = 8,
}

/// Digital inputs. Active (pressed / healthy) when high.
#[derive(Debug, EnumIter, EnumCount, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum Input {
    MenuButton = 10,
    SelectButton = 11,
    GridCheck = 15,
    GeneratorCheck = 16,
    LoadCheck = 17,
}

/// Every output pin role on the board.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Output {
    Relay(Relay),
    Indicator(Indicator),
    /// Buzzer, sounding while high.
    Alarm,
}

impl Output {
    /// Arduino pin number driving this output.
    pub const fn pin(self) -> u8 {
        match self {
            Output::Relay(relay) => relay as u8,
            Output::Indicator(indicator) => indicator as u8,
            Output::Alarm => 18,
        }
    }
}

impl Input {
    pub const fn pin(self) -> u8 {
        self as u8
    }
}

impl From<Relay> for Output {
    fn from(value: Relay) -> Self {
        Output::Relay(value)
    }
}

impl From<Indicator> for Output {
    fn from(value: Indicator) -> Self {
        Output::Indicator(value)
    }
}

/// Hardware abstraction layer the controller drives.
///
/// Implement this for the target board. Every call must return immediately.
pub trait Board {
    /// Drive an output pin.
    fn set_output(&mut self, output: Output, level: Level);

    /// Level an output pin was last driven to.
    fn output_level(&self, output: Output) -> Level;

    /// Sample an input pin.
    fn input_level(&mut self, input: Input) -> Level;
}

/// Semantic helpers on top of the raw pin levels of a [`Board`].
pub trait BoardExt: Board {
    fn set_relay(&mut self, relay: Relay, energized: bool) {
        self.set_output(relay.into(), energized.into());
    }

    fn relay_energized(&self, relay: Relay) -> bool {
        self.output_level(relay.into()).into()
    }

    /// Light or darken an indicator, taking care of the active-low wiring.
    fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        self.set_output(indicator.into(), (!on).into());
    }

    /// Whether an indicator is lit. Inverts the raw pin level.
    fn indicator_on(&self, indicator: Indicator) -> bool {
        self.output_level(indicator.into()) == Level::Low
    }

    fn input_active(&mut self, input: Input) -> bool {
        self.input_level(input).into()
    }
}

impl<B: Board + ?Sized> BoardExt for B {}
