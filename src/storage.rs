//! Persistence of the operating mode and control mode, one byte per field.

use crate::{
    error::StorageError,
    types::{ControlMode, OperatingMode},
};

/// Address of the persisted [`OperatingMode`] ordinal.
pub const OPERATING_MODE_ADDRESS: u16 = 0;
/// Address of the persisted [`ControlMode`] ordinal.
pub const CONTROL_MODE_ADDRESS: u16 = 1;

/// Byte addressable non-volatile store, e.g. the MCU's EEPROM.
pub trait ModeStore {
    type Error: embedded_io::Error;

    fn read_byte(&mut self, address: u16) -> Result<u8, Self::Error>;

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), Self::Error>;
}

/// Modes read back at boot.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct RestoredModes {
    pub operating: OperatingMode,
    pub control: ControlMode,
    /// At least one stored byte was out of range and replaced by its safe default.
    pub repaired: bool,
}

/// Read both modes, falling back to [`OperatingMode::Manual`] / [`ControlMode::Stop`] on
/// out-of-range bytes.
pub fn restore<S: ModeStore>(store: &mut S) -> Result<RestoredModes, StorageError> {
    let raw_operating = store
        .read_byte(OPERATING_MODE_ADDRESS)
        .map_err(StorageError::from_io)?;
    let raw_control = store
        .read_byte(CONTROL_MODE_ADDRESS)
        .map_err(StorageError::from_io)?;

    let mut repaired = false;
    let operating = OperatingMode::try_from(raw_operating).unwrap_or_else(|err| {
        tracing::warn!("stored operating mode unreadable ({}), using Manual", err);
        repaired = true;
        OperatingMode::default()
    });
    let control = ControlMode::try_from(raw_control).unwrap_or_else(|err| {
        tracing::warn!("stored control mode unreadable ({}), using Stop", err);
        repaired = true;
        ControlMode::default()
    });

    Ok(RestoredModes {
        operating,
        control,
        repaired,
    })
}

pub fn save_operating_mode<S: ModeStore>(
    store: &mut S,
    mode: OperatingMode,
) -> Result<(), StorageError> {
    store
        .write_byte(OPERATING_MODE_ADDRESS, mode.into())
        .map_err(StorageError::from_io)
}

pub fn save_control_mode<S: ModeStore>(
    store: &mut S,
    mode: ControlMode,
) -> Result<(), StorageError> {
    store
        .write_byte(CONTROL_MODE_ADDRESS, mode.into())
        .map_err(StorageError::from_io)
}
