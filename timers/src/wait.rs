use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("negative wait of {0}ms")]
    Negative(i64),
    #[error("deadline passed {0:?} ago")]
    DeadlinePassed(Duration),
}

/// How long a timer waits: a duration, a point in time, or a raw
/// millisecond count from configuration or user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    For(Duration),
    Until(Instant),
    Millis(i64),
}

impl Wait {
    /// Time left before the timer fires, measured from now.
    pub fn remaining(&self) -> Result<Duration, TimerError> {
        match *self {
            Wait::For(duration) => Ok(duration),
            Wait::Until(deadline) => {
                let now = Instant::now();
                deadline
                    .checked_duration_since(now)
                    .ok_or_else(|| TimerError::DeadlinePassed(now.duration_since(deadline)))
            }
            Wait::Millis(ms) => u64::try_from(ms)
                .map(Duration::from_millis)
                .map_err(|_| TimerError::Negative(ms)),
        }
    }
}

impl From<Duration> for Wait {
    fn from(duration: Duration) -> Self {
        Wait::For(duration)
    }
}

impl From<Instant> for Wait {
    fn from(deadline: Instant) -> Self {
        Wait::Until(deadline)
    }
}

impl From<i64> for Wait {
    fn from(ms: i64) -> Self {
        Wait::Millis(ms)
    }
}
