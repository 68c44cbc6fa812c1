//! Periodic status snapshots for the companion app.

use alloc::vec::Vec;

use serde::Serialize;

use crate::{
    driver::elapsed,
    error::{Error, Result},
    hal::{Board, BoardExt, Indicator},
    types::{Duration, Instant},
};

/// What the eight indicators show, as "is lit" values rather than pin levels.
///
/// Serializes to the JSON object the companion app expects, e.g.
/// `{"load_fail":false,"manual":true,...}`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub load_fail: bool,
    pub manual: bool,
    pub semi_auto: bool,
    pub fully_auto: bool,
    pub load_on: bool,
    pub gen_on: bool,
    pub gen_fail: bool,
    pub grid_on: bool,
}

impl StatusSnapshot {
    /// Read the indicator outputs back from the board.
    pub fn read<B: Board>(board: &B) -> Self {
        Self {
            load_fail: board.indicator_on(Indicator::LoadFail),
            manual: board.indicator_on(Indicator::Manual),
            semi_auto: board.indicator_on(Indicator::SemiAuto),
            fully_auto: board.indicator_on(Indicator::FullyAuto),
            load_on: board.indicator_on(Indicator::LoadOn),
            gen_on: board.indicator_on(Indicator::GenOn),
            gen_fail: board.indicator_on(Indicator::GenFail),
            grid_on: board.indicator_on(Indicator::GridOn),
        }
    }

    /// Encode as one newline terminated JSON line.
    pub fn to_json_line<I: embedded_io::Error>(&self) -> Result<Vec<u8>, I> {
        let mut line = serde_json::to_vec(self).map_err(|_| Error::Encoding)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// Sends a [`StatusSnapshot`] every `interval`.
pub struct StatusReporter {
    interval: Duration,
    last_sent: Option<Instant>,
}

impl StatusReporter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
        }
    }

    pub fn snapshot<B: Board>(&self, board: &B) -> StatusSnapshot {
        StatusSnapshot::read(board)
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.last_sent
            .is_none_or(|last| elapsed(now, last) >= self.interval)
    }

    /// Send a snapshot if one is due. Returns whether one was sent.
    pub fn poll<B: Board, W: embedded_io::Write>(
        &mut self,
        board: &B,
        link: &mut W,
        now: Instant,
    ) -> Result<bool, W::Error> {
        if !self.is_due(now) {
            return Ok(false);
        }
        // A failed send still counts as sent.
        self.last_sent = Some(now);
        let line = self.snapshot(board).to_json_line::<W::Error>()?;
        link.write_all(&line).map_err(Error::SerialError)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hal::Relay,
        mock_board::MockBoard,
        mock_serial::{MockSerial, MockSerialError},
    };

    fn at(ms: u32) -> Instant {
        Instant::from_ticks(ms)
    }

    #[test]
    fn snapshot_inverts_active_low_pins() {
        let mut board = MockBoard::new();
        for indicator in [
            Indicator::LoadFail,
            Indicator::Manual,
            Indicator::SemiAuto,
            Indicator::FullyAuto,
            Indicator::LoadOn,
            Indicator::GenOn,
            Indicator::GenFail,
            Indicator::GridOn,
        ] {
            board.set_indicator(indicator, false);
        }
        board.set_indicator(Indicator::GridOn, true);
        board.set_indicator(Indicator::Manual, true);
        // Relays are not indicators and must not leak into the snapshot.
        board.set_relay(Relay::Generator, true);

        let snapshot = StatusSnapshot::read(&board);
        assert_eq!(
            snapshot,
            StatusSnapshot {
                manual: true,
                grid_on: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn json_has_exactly_the_eight_fields() {
        let snapshot = StatusSnapshot {
            load_on: true,
            gen_on: true,
            fully_auto: true,
            ..Default::default()
        };
        let line = snapshot.to_json_line::<MockSerialError>().unwrap();
        assert_eq!(
            core::str::from_utf8(&line).unwrap(),
            "{\"load_fail\":false,\"manual\":false,\"semi_auto\":false,\"fully_auto\":true,\
             \"load_on\":true,\"gen_on\":true,\"gen_fail\":false,\"grid_on\":false}\n"
        );
    }

    #[test]
    fn reporter_respects_interval() {
        let board = MockBoard::new();
        let mut link = MockSerial::new();
        let mut reporter = StatusReporter::new(Duration::millis(500));

        assert!(reporter.poll(&board, &mut link, at(0)).unwrap());
        assert!(!reporter.poll(&board, &mut link, at(499)).unwrap());
        assert!(reporter.poll(&board, &mut link, at(500)).unwrap());

        let lines = link
            .written_data()
            .iter()
            .filter(|&&byte| byte == b'\n')
            .count();
        assert_eq!(lines, 2);
    }

    #[test]
    fn write_error_is_reported_and_retried_next_interval() {
        let board = MockBoard::new();
        let mut link = MockSerial::new();
        link.set_write_error(true);
        let mut reporter = StatusReporter::new(Duration::millis(500));

        assert!(matches!(
            reporter.poll(&board, &mut link, at(0)),
            Err(Error::SerialError(MockSerialError::SimulatedError))
        ));
        assert!(!reporter.is_due(at(100)));

        link.set_write_error(false);
        assert!(reporter.poll(&board, &mut link, at(500)).unwrap());
    }
}
