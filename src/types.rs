//! This module contains the state types shared by the controller components.

use strum_macros::{EnumCount, EnumIter, FromRepr};

use crate::error::InvalidOrdinal;

/// Monotonic millisecond timestamp supplied by the caller on every tick.
pub type Instant = fugit::TimerInstantU32<1000>;

/// Millisecond duration used for settle windows, alarm length and intervals.
pub type Duration = fugit::MillisDurationU32;

/// Selects which control loop runs each tick.
///
/// Persisted as its raw ordinal.
#[derive(Debug, Default, EnumIter, EnumCount, FromRepr, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum OperatingMode {
    /// The persisted [`ControlMode`] alone drives the relays.
    #[default]
    Manual = 0,
    /// Manual while the operator override is held, fully automatic otherwise.
    SemiAutomatic = 1,
    /// Priority arbitration, grid first.
    FullyAutomatic = 2,
}

impl OperatingMode {
    /// Mode reached by one press of the menu button.
    pub const fn next(self) -> Self {
        match self {
            Self::Manual => Self::SemiAutomatic,
            Self::SemiAutomatic => Self::FullyAutomatic,
            Self::FullyAutomatic => Self::Manual,
        }
    }

    /// Whether manual source selection (select button, `gen`/`grid`/`stop`) is accepted.
    pub const fn accepts_source_selection(self) -> bool {
        matches!(self, Self::Manual | Self::SemiAutomatic)
    }
}

impl From<OperatingMode> for u8 {
    fn from(value: OperatingMode) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for OperatingMode {
    type Error = InvalidOrdinal;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_repr(value).ok_or(InvalidOrdinal(value))
    }
}

/// The manually or automatically chosen power source target.
///
/// Persisted as its raw ordinal.
#[derive(Debug, Default, EnumIter, EnumCount, FromRepr, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum ControlMode {
    Generator = 0,
    Grid = 1,
    /// Everything de-energized, every indicator off.
    #[default]
    Stop = 2,
}

impl ControlMode {
    /// Control mode reached by one press of the select button.
    pub const fn next(self) -> Self {
        match self {
            Self::Generator => Self::Grid,
            Self::Grid => Self::Stop,
            Self::Stop => Self::Generator,
        }
    }
}

impl From<ControlMode> for u8 {
    fn from(value: ControlMode) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for ControlMode {
    type Error = InvalidOrdinal;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_repr(value).ok_or(InvalidOrdinal(value))
    }
}

/// Anything the driver can switch and then verify through a health input.
///
/// Used as the key of the per-source settle timers.
#[derive(Debug, EnumIter, EnumCount, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum Source {
    Grid = 0,
    Generator = 1,
    Load = 2,
}

impl Source {
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// Classification of one switching attempt.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SettleResult {
    /// The settle window has not elapsed yet.
    Pending,
    /// The health input read active when the window expired.
    Confirmed,
    /// The health input read inactive when the window expired.
    Failed,
}

impl SettleResult {
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }
}
