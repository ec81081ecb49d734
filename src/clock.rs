//! Wall-clock timestamps with microsecond resolution.
//!
//! Reports are keyed to wall-clock seconds, so the daemon works in seconds
//! and microseconds rather than `Duration`s. A clock that moves backward
//! relative to the last report is fatal: downstream consumers rely on
//! monotonic deltas.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Error;

/// A wall-clock instant as seconds and microseconds since the Unix epoch.
///
/// Field order gives the derived `Ord` the correct lexicographic meaning:
/// seconds dominate, microseconds break ties.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WallTime {
    pub sec: i64,
    pub usec: i64,
}

impl WallTime {
    /// Read the current wall clock.
    pub fn now() -> Result<Self, Error> {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| Error::TimeWentBackward)?;
        Ok(WallTime {
            sec: since_epoch.as_secs() as i64,
            usec: i64::from(since_epoch.subsec_micros()),
        })
    }

    /// Elapsed time from `start` to `self` with borrow-carry on the
    /// microsecond field. Caller guarantees `start <= self`.
    pub fn since(self, start: WallTime) -> WallTime {
        if start.usec > self.usec {
            WallTime {
                sec: self.sec - start.sec - 1,
                usec: 1_000_000 + self.usec - start.usec,
            }
        } else {
            WallTime {
                sec: self.sec - start.sec,
                usec: self.usec - start.usec,
            }
        }
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.sec, self.usec)
    }
}
