use std::time::Duration;

use jiff::Timestamp;

use crate::errors::Error;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Decides when a stored token is old enough to be refreshed before use.
#[derive(Clone, Debug)]
pub struct RefreshPolicy {
    interval: Duration,
}

impl RefreshPolicy {
    pub fn new(interval: Duration) -> Result<Self, Error> {
        if interval.is_zero() {
            return Err(Error::Config("Refresh interval must be > 0".into()));
        }
        Ok(Self { interval })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True once `interval` or more has elapsed since `issued_at`.
    ///
    /// A timestamp in the future (clock moved backwards) is never due.
    pub fn is_due(&self, issued_at: Timestamp, now: Timestamp) -> bool {
        match Duration::try_from(now.duration_since(issued_at)) {
            Ok(elapsed) => elapsed >= self.interval,
            Err(_) => false,
        }
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}
