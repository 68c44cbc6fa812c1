//! This crate implements the controller of a three phase automatic transfer switch (ATS).
//!
//! It supports `no_std` environments by use of the `no_std` feature flag. An allocator is still
//! required for the JSON status encoding.
//!
//! The controller switches a load between the utility grid and a standby generator:
//! * Fully automatic: grid first, generator when the grid is unavailable.
//! * Manual: the operator picks the grid, the generator or stop.
//! * Semi automatic: automatic, with a manual override while the select input is held.
//!
//! Every switch-over is confirmed against a health input after a settle window. Failures light
//! the matching indicator and sound the alarm for a few seconds.
//!
//! Hardware is reached through the [`hal::Board`] and [`storage::ModeStore`] traits, and the
//! companion app through any `embedded_io` serial link. The app sends one command per line:
//! * `man`, `semi`, `auto`: select the operating mode.
//! * `gen`, `grid`, `stop`: select the control mode, ignored in fully automatic mode.
//!
//! and receives a JSON status object per line every half second.
//!
//! Nothing blocks: drive [`controller::Controller::tick`] from the main loop with a millisecond
//! timestamp.

#![cfg_attr(feature = "no_std", no_std)]

extern crate alloc;

pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod fault;
pub mod hal;
pub mod input;
pub mod state_machine;
pub mod status;
pub mod storage;
pub mod types;

#[cfg(test)]
mod mock_board;
#[cfg(test)]
mod mock_serial;
