//! We use this mocking module in unit tests to emulate the board pins and the EEPROM.

use strum::EnumCount;

use crate::hal::{Board, Indicator, Input, Level, Output, Relay};
use crate::storage::ModeStore;

/// Our mock type used to emulate the transfer switch board.
pub struct MockBoard {
    relays: [Level; Relay::COUNT],
    indicators: [Level; Indicator::COUNT],
    alarm: Level,
    inputs: [Level; Input::COUNT],
}

fn relay_slot(relay: Relay) -> usize {
    match relay {
        Relay::Grid => 0,
        Relay::Generator => 1,
        Relay::Load => 2,
    }
}

fn indicator_slot(indicator: Indicator) -> usize {
    match indicator {
        Indicator::LoadFail => 0,
        Indicator::Manual => 1,
        Indicator::SemiAuto => 2,
        Indicator::FullyAuto => 3,
        Indicator::LoadOn => 4,
        Indicator::GenOn => 5,
        Indicator::GenFail => 6,
        Indicator::GridOn => 7,
    }
}

fn input_slot(input: Input) -> usize {
    match input {
        Input::MenuButton => 0,
        Input::SelectButton => 1,
        Input::GridCheck => 2,
        Input::GeneratorCheck => 3,
        Input::LoadCheck => 4,
    }
}

impl MockBoard {
    /// Create a board with every pin low.
    pub fn new() -> Self {
        Self {
            relays: [Level::Low; Relay::COUNT],
            indicators: [Level::Low; Indicator::COUNT],
            alarm: Level::Low,
            inputs: [Level::Low; Input::COUNT],
        }
    }

    /// Set the level the next `input_level` call will sample.
    pub fn set_input(&mut self, input: Input, active: bool) {
        self.inputs[input_slot(input)] = active.into();
    }

    /// Drive all three health inputs at once.
    pub fn set_health(&mut self, grid: bool, generator: bool, load: bool) {
        self.set_input(Input::GridCheck, grid);
        self.set_input(Input::GeneratorCheck, generator);
        self.set_input(Input::LoadCheck, load);
    }

    pub fn alarm_sounding(&self) -> bool {
        self.alarm == Level::High
    }
}

impl Board for MockBoard {
    fn set_output(&mut self, output: Output, level: Level) {
        match output {
            Output::Relay(relay) => self.relays[relay_slot(relay)] = level,
            Output::Indicator(indicator) => self.indicators[indicator_slot(indicator)] = level,
            Output::Alarm => self.alarm = level,
        }
    }

    fn output_level(&self, output: Output) -> Level {
        match output {
            Output::Relay(relay) => self.relays[relay_slot(relay)],
            Output::Indicator(indicator) => self.indicators[indicator_slot(indicator)],
            Output::Alarm => self.alarm,
        }
    }

    fn input_level(&mut self, input: Input) -> Level {
        self.inputs[input_slot(input)]
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum MockEepromError {
    /// Address outside of the emulated cells.
    #[error("EEPROM address out of range")]
    OutOfRange,
    /// Simulated read or write failure.
    #[error("Simulated EEPROM error")]
    SimulatedError,
}

impl embedded_io::Error for MockEepromError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockEepromError::OutOfRange => embedded_io::ErrorKind::InvalidInput,
            MockEepromError::SimulatedError => embedded_io::ErrorKind::Other,
        }
    }
}

/// Our mock type used to emulate a small EEPROM.
pub struct MockEeprom {
    /// Erased cells read 0xFF like on the real part.
    cells: [u8; 8],
    /// Successful writes, to check what the controller persists.
    writes: usize,
    should_error_on_read: bool,
    should_error_on_write: bool,
    failing_address: Option<u16>,
}

impl MockEeprom {
    pub fn new() -> Self {
        Self {
            cells: [0xFF; 8],
            writes: 0,
            should_error_on_read: false,
            should_error_on_write: false,
            failing_address: None,
        }
    }

    pub fn with_cells(operating: u8, control: u8) -> Self {
        let mut eeprom = Self::new();
        eeprom.cells[0] = operating;
        eeprom.cells[1] = control;
        eeprom
    }

    pub fn cell(&self, address: u16) -> u8 {
        self.cells[address as usize]
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&mut self, should_error: bool) {
        self.should_error_on_read = should_error;
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }

    /// Fail writes to `address` only.
    pub fn fail_writes_to(&mut self, address: u16) {
        self.failing_address = Some(address);
    }
}

impl ModeStore for MockEeprom {
    type Error = MockEepromError;

    fn read_byte(&mut self, address: u16) -> Result<u8, Self::Error> {
        if self.should_error_on_read {
            return Err(MockEepromError::SimulatedError);
        }
        self.cells
            .get(address as usize)
            .copied()
            .ok_or(MockEepromError::OutOfRange)
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), Self::Error> {
        if self.should_error_on_write || self.failing_address == Some(address) {
            return Err(MockEepromError::SimulatedError);
        }
        let cell = self
            .cells
            .get_mut(address as usize)
            .ok_or(MockEepromError::OutOfRange)?;
        *cell = value;
        self.writes += 1;
        Ok(())
    }
}
