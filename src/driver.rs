//! Relay switching with non-blocking settle checks.
//!
//! Every switching attempt arms a settle timer keyed by the [`Source`] being switched. The
//! driver is polled every control tick: it reports [`SettleResult::Pending`] until the window
//! has elapsed, then samples the matching health input once and latches the classification.

use strum::{EnumCount, IntoEnumIterator};

use crate::{
    config::ControllerConfig,
    hal::{Board, BoardExt, Indicator, Input, Relay},
    types::{Duration, Instant, SettleResult, Source},
};

/// Sources released from a latched failure in one call.
pub type Released = heapless::Vec<Source, { Source::COUNT }>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Pending,
    Confirmed,
    /// Latched until released; `at` is when the failure was classified.
    Failed { at: Instant },
}

/// Settle timer of one source.
#[derive(Debug, Clone, Copy)]
struct SettleTimer {
    started: Instant,
    window: Duration,
    state: TimerState,
}

impl SettleTimer {
    fn result(&self) -> SettleResult {
        match self.state {
            TimerState::Pending => SettleResult::Pending,
            TimerState::Confirmed => SettleResult::Confirmed,
            TimerState::Failed { .. } => SettleResult::Failed,
        }
    }

    fn is_failed(&self) -> bool {
        matches!(self.state, TimerState::Failed { .. })
    }
}

/// Time elapsed from `since` to `now`. A timestamp from the future counts as no time at all.
pub(crate) fn elapsed(now: Instant, since: Instant) -> Duration {
    now.checked_duration_since(since)
        .unwrap_or(Duration::from_ticks(0))
}

const fn relay_of(source: Source) -> Relay {
    match source {
        Source::Grid => Relay::Grid,
        Source::Generator => Relay::Generator,
        Source::Load => Relay::Load,
    }
}

const fn health_input_of(source: Source) -> Input {
    match source {
        Source::Grid => Input::GridCheck,
        Source::Generator => Input::GeneratorCheck,
        Source::Load => Input::LoadCheck,
    }
}

/// The relay that must never be energized together with `source`.
const fn rival_of(source: Source) -> Option<Source> {
    match source {
        Source::Grid => Some(Source::Generator),
        Source::Generator => Some(Source::Grid),
        Source::Load => None,
    }
}

/// Drives the grid, generator and load relays.
///
/// Guarantees the grid and generator relays are never energized together, and that the load
/// relay is only energized while a source relay is.
pub struct PowerSourceDriver {
    source_settle: Duration,
    load_settle: Duration,
    retry_after: Duration,
    timers: [Option<SettleTimer>; Source::COUNT],
}

impl PowerSourceDriver {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            source_settle: config.source_settle,
            load_settle: config.load_settle,
            retry_after: config.retry_after,
            timers: [None; Source::COUNT],
        }
    }

    /// Switch to the grid, or keep polling the switch-over already in progress.
    pub fn activate_grid<B: Board>(&mut self, board: &mut B, now: Instant) -> SettleResult {
        self.activate_source(board, Source::Grid, now)
    }

    /// Switch to the generator, or keep polling the switch-over already in progress.
    pub fn activate_generator<B: Board>(&mut self, board: &mut B, now: Instant) -> SettleResult {
        self.activate_source(board, Source::Generator, now)
    }

    /// Connect the load to whichever source is energized.
    ///
    /// With no source energized the load relay stays open, but the load settle window is still
    /// run and the load health input classified at its end.
    pub fn activate_load<B: Board>(&mut self, board: &mut B, now: Instant) -> SettleResult {
        match self.timers[Source::Load.index()] {
            Some(timer) if timer.is_failed() => return SettleResult::Failed,
            Some(_) => {}
            None => {
                if self.any_source_energized(board) {
                    board.set_relay(Relay::Load, true);
                } else {
                    tracing::debug!("no source energized, checking load without closing relay");
                }
                self.arm(Source::Load, now);
            }
        }
        let result = self.poll(board, Source::Load, now);
        self.refresh_indicators(board);
        result
    }

    /// De-energize every relay and abandon every settle timer, latched failures included.
    pub fn deactivate_all<B: Board>(&mut self, board: &mut B) {
        for source in Source::iter() {
            board.set_relay(relay_of(source), false);
        }
        self.timers = [None; Source::COUNT];
        self.refresh_indicators(board);
    }

    /// De-energize every relay but keep latched failures.
    pub fn isolate<B: Board>(&mut self, board: &mut B) {
        for source in Source::iter() {
            self.open_relay(board, source);
        }
        self.refresh_indicators(board);
    }

    /// De-energize a single relay, dropping the load with the last energized source.
    pub fn de_energize<B: Board>(&mut self, board: &mut B, source: Source) {
        self.open_relay(board, source);
        if source != Source::Load && !self.any_source_energized(board) {
            self.open_relay(board, Source::Load);
        }
        self.refresh_indicators(board);
    }

    /// Latest classification of `source`, `None` when no attempt is in progress.
    pub fn result(&self, source: Source) -> Option<SettleResult> {
        self.timers[source.index()].map(|timer| timer.result())
    }

    pub fn is_latched_failed(&self, source: Source) -> bool {
        self.timers[source.index()].is_some_and(|timer| timer.is_failed())
    }

    /// Release failures that have been latched for at least the retry hold-off.
    pub fn release_expired(&mut self, now: Instant) -> Released {
        let mut released = Released::new();
        for source in Source::iter() {
            if let Some(SettleTimer {
                state: TimerState::Failed { at },
                ..
            }) = self.timers[source.index()]
                && elapsed(now, at) >= self.retry_after
            {
                tracing::info!("{:?} failure hold-off over, allowing a new attempt", source);
                self.timers[source.index()] = None;
                // Capacity equals the number of sources.
                let _ = released.push(source);
            }
        }
        released
    }

    /// Release every latched failure immediately.
    pub fn release_all(&mut self) -> Released {
        let mut released = Released::new();
        for source in Source::iter() {
            if self.is_latched_failed(source) {
                self.timers[source.index()] = None;
                let _ = released.push(source);
            }
        }
        released
    }

    /// Re-arm any confirmed, still energized source whose health input has dropped.
    pub fn supervise<B: Board>(&mut self, board: &mut B, now: Instant) {
        for source in Source::iter() {
            let Some(timer) = self.timers[source.index()] else {
                continue;
            };
            if timer.state != TimerState::Confirmed || !board.relay_energized(relay_of(source)) {
                continue;
            }
            if !board.input_active(health_input_of(source)) {
                tracing::warn!("{:?} health signal lost, re-checking", source);
                self.arm(source, now);
            }
        }
    }

    fn activate_source<B: Board>(
        &mut self,
        board: &mut B,
        source: Source,
        now: Instant,
    ) -> SettleResult {
        if self.is_latched_failed(source) {
            return SettleResult::Failed;
        }

        if !board.relay_energized(relay_of(source)) {
            // Break before make: the load first, then the other source.
            self.open_relay(board, Source::Load);
            if let Some(rival) = rival_of(source) {
                self.open_relay(board, rival);
            }
            board.set_relay(relay_of(source), true);
            self.arm(source, now);
        } else if self.timers[source.index()].is_none() {
            self.arm(source, now);
        }

        let result = self.poll(board, source, now);
        self.refresh_indicators(board);
        result
    }

    fn arm(&mut self, source: Source, now: Instant) {
        let window = match source {
            Source::Load => self.load_settle,
            Source::Grid | Source::Generator => self.source_settle,
        };
        tracing::debug!("{:?} settle window of {} ms started", source, window.to_millis());
        self.timers[source.index()] = Some(SettleTimer {
            started: now,
            window,
            state: TimerState::Pending,
        });
    }

    /// Classify `source` if its window has run out. Never re-arms.
    fn poll<B: Board>(&mut self, board: &mut B, source: Source, now: Instant) -> SettleResult {
        let Some(timer) = self.timers[source.index()].as_mut() else {
            return SettleResult::Pending;
        };
        if timer.state != TimerState::Pending || elapsed(now, timer.started) < timer.window {
            return timer.result();
        }

        if board.input_active(health_input_of(source)) {
            tracing::info!("{:?} confirmed", source);
            timer.state = TimerState::Confirmed;
            SettleResult::Confirmed
        } else {
            tracing::warn!("{:?} health signal absent after settle window", source);
            timer.state = TimerState::Failed { at: now };
            self.de_energize(board, source);
            SettleResult::Failed
        }
    }

    /// Open a relay. Its timer goes too, unless it holds a latched failure.
    fn open_relay<B: Board>(&mut self, board: &mut B, source: Source) {
        board.set_relay(relay_of(source), false);
        let slot = &mut self.timers[source.index()];
        if slot.is_some_and(|timer| !timer.is_failed()) {
            *slot = None;
        }
    }

    fn any_source_energized<B: Board>(&self, board: &B) -> bool {
        board.relay_energized(Relay::Grid) || board.relay_energized(Relay::Generator)
    }

    fn refresh_indicators<B: Board>(&self, board: &mut B) {
        let grid = board.relay_energized(Relay::Grid);
        let generator = board.relay_energized(Relay::Generator);
        let load = board.relay_energized(Relay::Load);
        board.set_indicator(Indicator::GridOn, grid);
        board.set_indicator(Indicator::GenOn, generator);
        board.set_indicator(Indicator::LoadOn, load);
    }
}
