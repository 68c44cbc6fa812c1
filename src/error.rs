//! Our error types for the transfer switch controller.

use thiserror::Error;

use crate::types::Source;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Custom error type for the controller's serial link and collaborators.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("Serial communication error")]
    SerialError(I),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("Status encoding failed")]
    Encoding,
}

/// The persistent store rejected a read or write.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[error("Persistent storage error: {0:?}")]
pub struct StorageError(pub embedded_io::ErrorKind);

impl StorageError {
    pub fn from_io(err: impl embedded_io::Error) -> Self {
        Self(err.kind())
    }
}

/// A stored byte does not name any variant of the enum it was read for.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[error("Invalid ordinal {0}")]
pub struct InvalidOrdinal(pub u8);

/// A received line that is not a command. Answered on the link, never fatal.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum CommandError {
    #[error("Unknown command")]
    Unknown,
    #[error("Command line too long")]
    LineTooLong,
}

/// Faults detected while driving the relays. None of these stop the control loop.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Fault {
    /// Health signal still absent when the source settle window expired.
    #[error("{0:?} did not settle")]
    SourceSettleFailure(Source),
    /// Load health signal absent after the load settle window.
    #[error("Load failure")]
    LoadFailure,
}
