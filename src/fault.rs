//! Failure handling and the audible alarm.

use strum::EnumCount;

use crate::{
    driver::PowerSourceDriver,
    error::Fault,
    hal::{Board, BoardExt, Indicator, Output},
    types::{Duration, Instant, SettleResult, Source},
};

/// Reacts to settle results reported by the [`PowerSourceDriver`].
///
/// Actions fire when a source first becomes [`SettleResult::Failed`]; a latched failure that
/// is re-reported on later ticks does not re-raise the alarm.
pub struct FaultMonitor {
    alarm_duration: Duration,
    load_failed: bool,
    generator_failed: bool,
    alarm_deadline: Option<Instant>,
    last_seen: [Option<SettleResult>; Source::COUNT],
    last_fault: Option<Fault>,
}

impl FaultMonitor {
    pub fn new(alarm_duration: Duration) -> Self {
        Self {
            alarm_duration,
            load_failed: false,
            generator_failed: false,
            alarm_deadline: None,
            last_seen: [None; Source::COUNT],
            last_fault: None,
        }
    }

    /// Handle a load settle result. Returns whether the load is confirmed.
    ///
    /// A failed load isolates every relay, raises the alarm and sets the sticky load fault.
    pub fn on_load_result<B: Board>(
        &mut self,
        board: &mut B,
        driver: &mut PowerSourceDriver,
        result: SettleResult,
        now: Instant,
    ) -> bool {
        let entered_failure = self.observe(Source::Load, result);
        match result {
            SettleResult::Failed if entered_failure => {
                tracing::warn!("load failure, isolating all sources");
                self.load_failed = true;
                self.last_fault = Some(Fault::LoadFailure);
                board.set_indicator(Indicator::LoadFail, true);
                driver.isolate(board);
                self.raise_alarm(board, self.alarm_duration, now);
            }
            SettleResult::Confirmed if self.load_failed => {
                tracing::info!("load restored, clearing load fault");
                self.load_failed = false;
                board.set_indicator(Indicator::LoadFail, false);
            }
            _ => {}
        }
        result == SettleResult::Confirmed
    }

    /// Handle a generator settle result. Returns whether the generator is confirmed.
    pub fn on_generator_result<B: Board>(
        &mut self,
        board: &mut B,
        driver: &mut PowerSourceDriver,
        result: SettleResult,
        now: Instant,
    ) -> bool {
        let entered_failure = self.observe(Source::Generator, result);
        match result {
            SettleResult::Failed if entered_failure => {
                tracing::warn!("generator failure");
                self.generator_failed = true;
                self.last_fault = Some(Fault::SourceSettleFailure(Source::Generator));
                board.set_indicator(Indicator::GenFail, true);
                driver.de_energize(board, Source::Grid);
                self.raise_alarm(board, self.alarm_duration, now);
            }
            SettleResult::Confirmed if self.generator_failed => {
                self.generator_failed = false;
                board.set_indicator(Indicator::GenFail, false);
            }
            _ => {}
        }
        result == SettleResult::Confirmed
    }

    /// Handle a grid settle result. Returns whether the grid is confirmed.
    ///
    /// Grid loss is expected and handled by falling back to the generator, so no alarm.
    pub fn on_grid_result(&mut self, result: SettleResult) -> bool {
        if self.observe(Source::Grid, result) {
            tracing::warn!("grid unavailable");
            self.last_fault = Some(Fault::SourceSettleFailure(Source::Grid));
        }
        result == SettleResult::Confirmed
    }

    /// Sound the alarm for `duration`. Does nothing while the alarm is already sounding.
    pub fn raise_alarm<B: Board>(&mut self, board: &mut B, duration: Duration, now: Instant) {
        if self.alarm_deadline.is_some() {
            return;
        }
        board.set_output(Output::Alarm, true.into());
        self.alarm_deadline = Some(now + duration);
    }

    /// Silence the alarm immediately.
    pub fn reset_alarm<B: Board>(&mut self, board: &mut B) {
        board.set_output(Output::Alarm, false.into());
        self.alarm_deadline = None;
    }

    /// Silence the alarm once its deadline has passed. Returns `true` on the tick it stops.
    pub fn tick_alarm<B: Board>(&mut self, board: &mut B, now: Instant) -> bool {
        match self.alarm_deadline {
            Some(deadline) if now >= deadline => {
                tracing::debug!("alarm period over");
                self.reset_alarm(board);
                true
            }
            _ => false,
        }
    }

    /// The driver dropped a latched failure of `source`, a new attempt may follow.
    pub fn on_released<B: Board>(&mut self, board: &mut B, source: Source) {
        self.last_seen[source.index()] = None;
        if source == Source::Load && self.load_failed {
            self.load_failed = false;
            board.set_indicator(Indicator::LoadFail, false);
        }
    }

    /// Forget every fault and darken the fault indicators. The alarm keeps sounding.
    pub fn clear<B: Board>(&mut self, board: &mut B) {
        self.load_failed = false;
        self.generator_failed = false;
        self.last_seen = [None; Source::COUNT];
        board.set_indicator(Indicator::LoadFail, false);
        board.set_indicator(Indicator::GenFail, false);
    }

    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    pub fn generator_failed(&self) -> bool {
        self.generator_failed
    }

    pub fn alarm_active(&self) -> bool {
        self.alarm_deadline.is_some()
    }

    pub fn alarm_deadline(&self) -> Option<Instant> {
        self.alarm_deadline
    }

    /// Most recent fault seen since power-up.
    pub fn last_fault(&self) -> Option<Fault> {
        self.last_fault
    }

    /// Record `result` and report whether it is a fresh failure.
    fn observe(&mut self, source: Source, result: SettleResult) -> bool {
        let previous = self.last_seen[source.index()].replace(result);
        result.is_failed() && previous != Some(SettleResult::Failed)
    }
}
