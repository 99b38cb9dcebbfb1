use std::cmp::Ordering;

use chrono::{DateTime, TimeZone, Utc};

use crate::firestore::error::{invalid_argument, FirestoreResult};

const NANOS_PER_SECOND: i32 = 1_000_000_000;
// 0001-01-01T00:00:00Z and 9999-12-31T23:59:59Z
const MIN_SECONDS: i64 = -62_135_596_800;
const MAX_SECONDS: i64 = 253_402_300_799;

/// Point in time with nanosecond precision, carried on the wire as `[seconds, nanoseconds]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        let mut timestamp = Self { seconds, nanos };
        timestamp.normalize();
        timestamp
    }

    /// Strict constructor used for values decoded from the engine.
    pub fn try_new(seconds: i64, nanos: i32) -> FirestoreResult<Self> {
        if !(0..NANOS_PER_SECOND).contains(&nanos) {
            return Err(invalid_argument(format!(
                "Timestamp nanoseconds out of range: {nanos}"
            )));
        }
        if !(MIN_SECONDS..=MAX_SECONDS).contains(&seconds) {
            return Err(invalid_argument(format!(
                "Timestamp seconds out of range: {seconds}"
            )));
        }
        Ok(Self { seconds, nanos })
    }

    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    pub fn from_millis(millis: i64) -> Self {
        let seconds = millis.div_euclid(1_000);
        let nanos = (millis.rem_euclid(1_000) * 1_000_000) as i32;
        Self { seconds, nanos }
    }

    pub fn to_millis(&self) -> i64 {
        self.seconds * 1_000 + i64::from(self.nanos / 1_000_000)
    }

    pub fn to_date_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanos as u32).single()
    }

    fn normalize(&mut self) {
        let extra_seconds = self.nanos.div_euclid(NANOS_PER_SECOND);
        self.seconds += extra_seconds as i64;
        self.nanos = self.nanos.rem_euclid(NANOS_PER_SECOND);
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self {
            seconds: value.timestamp(),
            nanos: value.timestamp_subsec_nanos() as i32,
        }
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.seconds.cmp(&other.seconds) {
            Ordering::Equal => self.nanos.cmp(&other.nanos),
            ordering => ordering,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_nanoseconds() {
        let timestamp = Timestamp::new(1, 1_500_000_000);
        assert_eq!(timestamp.seconds, 2);
        assert_eq!(timestamp.nanos, 500_000_000);

        let negative = Timestamp::new(1, -1);
        assert_eq!(negative.seconds, 0);
        assert_eq!(negative.nanos, 999_999_999);
    }

    #[test]
    fn ordering() {
        let earlier = Timestamp::new(1, 0);
        let later = Timestamp::new(2, 0);
        assert!(earlier < later);
    }

    #[test]
    fn millis_before_epoch() {
        let timestamp = Timestamp::from_millis(-1);
        assert_eq!(timestamp.seconds, -1);
        assert_eq!(timestamp.nanos, 999_000_000);
        assert_eq!(timestamp.to_millis(), -1);
    }

    #[test]
    fn chrono_conversion() {
        let date = Utc.timestamp_opt(1_700_000_000, 123).single().unwrap();
        let timestamp = Timestamp::from(date);
        assert_eq!(timestamp.seconds, 1_700_000_000);
        assert_eq!(timestamp.nanos, 123);
        assert_eq!(timestamp.to_date_time(), Some(date));
    }

    #[test]
    fn strict_constructor_checks_ranges() {
        assert!(Timestamp::try_new(0, NANOS_PER_SECOND).is_err());
        assert!(Timestamp::try_new(MAX_SECONDS + 1, 0).is_err());
        assert!(Timestamp::try_new(0, 0).is_ok());
    }
}
