//! Operating mode and control mode handling.
//!
//! The machine is one of [`OperatingMode`] × [`ControlMode`]. Both are only changed by an
//! explicit selection, which is persisted before it takes effect, and the handler of the
//! current operating mode runs once per control tick.

use strum::IntoEnumIterator;

use crate::{
    config::ControllerConfig,
    driver::PowerSourceDriver,
    error::StorageError,
    fault::FaultMonitor,
    hal::{Board, BoardExt, Indicator, Input, Output, Relay},
    storage::{self, ModeStore, RestoredModes},
    types::{ControlMode, Instant, OperatingMode, SettleResult, Source},
};

const MODE_INDICATORS: [(OperatingMode, Indicator); 3] = [
    (OperatingMode::Manual, Indicator::Manual),
    (OperatingMode::SemiAutomatic, Indicator::SemiAuto),
    (OperatingMode::FullyAutomatic, Indicator::FullyAuto),
];

pub struct ModeStateMachine<B: Board, S: ModeStore> {
    board: B,
    store: S,
    operating: OperatingMode,
    control: ControlMode,
    driver: PowerSourceDriver,
    fault: FaultMonitor,
}

impl<B: Board, S: ModeStore> ModeStateMachine<B, S> {
    /// Bring the board to a safe state, restore the persisted modes and apply the restored
    /// operating mode.
    ///
    /// Storage trouble never stops the controller: unreadable modes fall back to Manual / Stop
    /// and a failed repair write is logged.
    pub fn new(mut board: B, mut store: S, config: &ControllerConfig, now: Instant) -> Self {
        for relay in Relay::iter() {
            board.set_relay(relay, false);
        }
        board.set_output(Output::Alarm, false.into());
        for indicator in Indicator::iter() {
            board.set_indicator(indicator, false);
        }

        let restored = storage::restore(&mut store).unwrap_or_else(|err| {
            tracing::warn!("{}, starting in Manual / Stop", err);
            RestoredModes::default()
        });
        if restored.repaired {
            let repaired = storage::save_operating_mode(&mut store, restored.operating)
                .and_then(|()| storage::save_control_mode(&mut store, restored.control));
            if let Err(err) = repaired {
                tracing::warn!("could not write back repaired modes: {}", err);
            }
        }
        tracing::info!(
            "restored {:?} / {:?}",
            restored.operating,
            restored.control
        );

        let mut machine = Self {
            board,
            store,
            operating: restored.operating,
            control: restored.control,
            driver: PowerSourceDriver::new(config),
            fault: FaultMonitor::new(config.alarm_duration),
        };
        machine.enter_operating_mode(now);
        machine
    }

    /// Persist and switch to `mode`, light its indicator and run its handler once.
    ///
    /// Latched failures are released so the new mode starts from fresh attempts.
    pub fn select_operating_mode(
        &mut self,
        mode: OperatingMode,
        now: Instant,
    ) -> Result<(), StorageError> {
        storage::save_operating_mode(&mut self.store, mode)?;
        tracing::info!("operating mode {:?}", mode);
        self.operating = mode;
        self.enter_operating_mode(now);
        Ok(())
    }

    /// Persist and apply `mode`.
    pub fn select_control_mode(
        &mut self,
        mode: ControlMode,
        now: Instant,
    ) -> Result<(), StorageError> {
        storage::save_control_mode(&mut self.store, mode)?;
        tracing::info!("control mode {:?}", mode);
        self.control = mode;
        self.release_failures();
        self.apply_control_mode(mode, now);
        Ok(())
    }

    /// Run the handler of the current operating mode.
    pub fn run(&mut self, now: Instant) {
        match self.operating {
            OperatingMode::Manual => self.run_manual(now),
            OperatingMode::SemiAutomatic => self.run_semi_automatic(now),
            OperatingMode::FullyAutomatic => self.run_fully_automatic(now),
        }
    }

    /// Silence the alarm if its time is up.
    pub fn tick_alarm(&mut self, now: Instant) -> bool {
        self.fault.tick_alarm(&mut self.board, now)
    }

    /// Release failures whose hold-off has run out.
    pub fn expire_failures(&mut self, now: Instant) {
        for source in self.driver.release_expired(now) {
            self.fault.on_released(&mut self.board, source);
        }
    }

    /// Re-check confirmed sources whose health signal has dropped.
    pub fn supervise(&mut self, now: Instant) {
        self.driver.supervise(&mut self.board, now);
    }

    pub fn operating_mode(&self) -> OperatingMode {
        self.operating
    }

    pub fn control_mode(&self) -> ControlMode {
        self.control
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn driver(&self) -> &PowerSourceDriver {
        &self.driver
    }

    pub fn fault(&self) -> &FaultMonitor {
        &self.fault
    }

    /// Give back the board and the store.
    pub fn release(self) -> (B, S) {
        (self.board, self.store)
    }

    fn enter_operating_mode(&mut self, now: Instant) {
        self.show_operating_mode();
        self.release_failures();
        self.run(now);
    }

    fn run_manual(&mut self, now: Instant) {
        self.apply_control_mode(self.control, now);
    }

    /// Manual while the operator holds the select input, fully automatic otherwise.
    fn run_semi_automatic(&mut self, now: Instant) {
        if self.board.input_active(Input::SelectButton) {
            self.run_manual(now);
        } else {
            self.run_fully_automatic(now);
        }
    }

    /// Grid first, then generator, then the load on whatever is left.
    fn run_fully_automatic(&mut self, now: Instant) {
        if self.load_locked_out() {
            return;
        }

        let grid = if self.grid_worth_trying() {
            let grid = self.driver.activate_grid(&mut self.board, now);
            self.fault.on_grid_result(grid);
            grid
        } else {
            SettleResult::Failed
        };
        match grid {
            SettleResult::Pending => {}
            SettleResult::Confirmed => self.attempt_load(now),
            SettleResult::Failed => {
                let generator = self.driver.activate_generator(&mut self.board, now);
                self.fault
                    .on_generator_result(&mut self.board, &mut self.driver, generator, now);
                match generator {
                    SettleResult::Pending => {}
                    // Last resort when failed: see whether anything still feeds the load.
                    SettleResult::Confirmed | SettleResult::Failed => self.attempt_load(now),
                }
            }
        }
    }

    fn apply_control_mode(&mut self, mode: ControlMode, now: Instant) {
        match mode {
            ControlMode::Stop => self.stop(),
            ControlMode::Grid => {
                if self.load_locked_out() {
                    return;
                }
                let grid = self.driver.activate_grid(&mut self.board, now);
                if self.fault.on_grid_result(grid) {
                    self.attempt_load(now);
                }
            }
            ControlMode::Generator => {
                if self.load_locked_out() {
                    return;
                }
                let generator = self.driver.activate_generator(&mut self.board, now);
                if self
                    .fault
                    .on_generator_result(&mut self.board, &mut self.driver, generator, now)
                {
                    self.attempt_load(now);
                }
            }
        }
    }

    fn attempt_load(&mut self, now: Instant) {
        let load = self.driver.activate_load(&mut self.board, now);
        self.fault
            .on_load_result(&mut self.board, &mut self.driver, load, now);
    }

    /// Everything off, every indicator dark.
    fn stop(&mut self) {
        self.driver.deactivate_all(&mut self.board);
        self.fault.clear(&mut self.board);
        for (_, indicator) in MODE_INDICATORS {
            self.board.set_indicator(indicator, false);
        }
    }

    /// A confirmed generator is only broken for a grid that reads healthy. Without a confirmed
    /// generator the grid is retried once its failure is released.
    fn grid_worth_trying(&mut self) -> bool {
        self.driver.result(Source::Grid).is_some()
            || self.driver.result(Source::Generator) != Some(SettleResult::Confirmed)
            || self.board.input_active(Input::GridCheck)
    }

    /// Nothing is switched while the load fault is latched.
    fn load_locked_out(&self) -> bool {
        self.driver.is_latched_failed(Source::Load)
    }

    fn show_operating_mode(&mut self) {
        for (mode, indicator) in MODE_INDICATORS {
            self.board.set_indicator(indicator, mode == self.operating);
        }
    }

    fn release_failures(&mut self) {
        for source in self.driver.release_all() {
            self.fault.on_released(&mut self.board, source);
        }
    }
}
