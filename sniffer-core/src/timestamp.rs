//! Capture timestamps

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Capture-time instant as reported by the capture source
///
/// Not guaranteed to be strictly increasing: the source's clock may be
/// adjusted between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    /// Seconds since the Unix epoch
    pub secs: i64,
    /// Sub-second fraction in nanoseconds (always < 1_000_000_000)
    pub nanos: u32,
}

impl Timestamp {
    const NANOS_PER_SEC: i64 = 1_000_000_000;

    /// Create a timestamp, carrying excess nanoseconds into the seconds field
    pub fn new(secs: i64, nanos: u32) -> Self {
        let carry = nanos as i64 / Self::NANOS_PER_SEC;
        Self {
            secs: secs.saturating_add(carry),
            nanos: (nanos as i64 % Self::NANOS_PER_SEC) as u32,
        }
    }

    /// Build from a `timeval` style pair (seconds + microseconds)
    pub fn from_timeval(secs: i64, micros: i64) -> Self {
        let secs = secs.saturating_add(micros.div_euclid(1_000_000));
        let micros = micros.rem_euclid(1_000_000);
        Self::new(secs, (micros * 1_000) as u32)
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    /// Sub-second fraction in microseconds
    pub fn subsec_micros(&self) -> u32 {
        self.nanos / 1_000
    }

    /// Convert to a UTC date-time, `None` if out of chrono's range
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.secs, self.nanos)
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::new(d.as_secs() as i64, d.subsec_nanos()),
            Err(e) => {
                // Before the epoch
                let d = e.duration();
                if d.subsec_nanos() == 0 {
                    Self::new(-(d.as_secs() as i64), 0)
                } else {
                    Self::new(
                        -(d.as_secs() as i64) - 1,
                        1_000_000_000 - d.subsec_nanos(),
                    )
                }
            }
        }
    }
}

impl From<Timestamp> for SystemTime {
    fn from(ts: Timestamp) -> Self {
        if ts.secs >= 0 {
            UNIX_EPOCH + Duration::new(ts.secs as u64, ts.nanos)
        } else {
            UNIX_EPOCH - Duration::from_secs(ts.secs.unsigned_abs())
                + Duration::from_nanos(ts.nanos as u64)
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.secs, self.subsec_micros())
    }
}
