//! Timing configuration of the controller.

use crate::{error::Error, types::Duration};

/// Time to wait for a power source to stabilize before trusting its health input.
pub const SOURCE_SETTLE: Duration = Duration::millis(1000);
/// Time to wait for the load to stabilize.
pub const LOAD_SETTLE: Duration = Duration::millis(2000);
/// How long the alarm sounds.
pub const ALARM_DURATION: Duration = Duration::millis(5000);
/// Minimum time between two accepted button edges.
pub const DEBOUNCE: Duration = Duration::millis(50);
/// How often a status snapshot goes out on the serial link.
pub const STATUS_INTERVAL: Duration = Duration::millis(500);
/// How long a failed attempt stays latched before a fresh one is allowed.
pub const RETRY_AFTER: Duration = Duration::secs(30);

/// Status snapshots must go out at least once per second.
const MAX_STATUS_INTERVAL: Duration = Duration::millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub source_settle: Duration,
    pub load_settle: Duration,
    pub alarm_duration: Duration,
    pub debounce: Duration,
    pub status_interval: Duration,
    pub retry_after: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            source_settle: SOURCE_SETTLE,
            load_settle: LOAD_SETTLE,
            alarm_duration: ALARM_DURATION,
            debounce: DEBOUNCE,
            status_interval: STATUS_INTERVAL,
            retry_after: RETRY_AFTER,
        }
    }
}

impl ControllerConfig {
    /// Set the settle window of the grid and generator checks.
    pub const fn with_source_settle(mut self, window: Duration) -> Self {
        self.source_settle = window;
        self
    }

    /// Set the settle window of the load check.
    pub const fn with_load_settle(mut self, window: Duration) -> Self {
        self.load_settle = window;
        self
    }

    pub const fn with_alarm_duration(mut self, duration: Duration) -> Self {
        self.alarm_duration = duration;
        self
    }

    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub const fn with_status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval;
        self
    }

    /// Set how long a failed source or load stays latched.
    pub const fn with_retry_after(mut self, hold_off: Duration) -> Self {
        self.retry_after = hold_off;
        self
    }

    /// Check the values make sense for a running controller.
    pub fn validate<I: embedded_io::Error>(&self) -> Result<(), Error<I>> {
        if self.source_settle.ticks() == 0 || self.load_settle.ticks() == 0 {
            return Err(Error::InvalidConfig("settle windows must be non-zero"));
        }
        if self.alarm_duration.ticks() == 0 {
            return Err(Error::InvalidConfig("alarm duration must be non-zero"));
        }
        if self.status_interval.ticks() == 0 || self.status_interval > MAX_STATUS_INTERVAL {
            return Err(Error::InvalidConfig(
                "status interval must be between 1 ms and 1 s",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_serial::MockSerialError;

    #[test]
    fn defaults_are_valid() {
        let config = ControllerConfig::default();
        assert!(config.validate::<MockSerialError>().is_ok());
        assert_eq!(config.source_settle.to_millis(), 1000);
        assert_eq!(config.load_settle.to_millis(), 2000);
        assert_eq!(config.alarm_duration.to_millis(), 5000);
        assert_eq!(config.debounce.to_millis(), 50);
    }

    #[test]
    fn zero_settle_window_is_rejected() {
        let config = ControllerConfig::default().with_load_settle(Duration::millis(0));
        assert!(matches!(
            config.validate::<MockSerialError>(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn slow_status_is_rejected() {
        let config = ControllerConfig::default().with_status_interval(Duration::millis(1500));
        assert!(config.validate::<MockSerialError>().is_err());
    }

    #[test]
    fn builder_overrides_only_the_named_field() {
        let config = ControllerConfig::default().with_retry_after(Duration::secs(5));
        assert_eq!(config.retry_after.to_millis(), 5000);
        assert_eq!(config.source_settle, SOURCE_SETTLE);
    }
}
