//! Source of "now" for day-granularity comparisons.
//!
//! Buckets and form validation compare calendar days in the user's local
//! offset. Injecting the clock keeps that logic a pure function of its inputs.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, TimeZone, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// UTC offset the user's calendar days are measured in.
    fn offset(&self) -> FixedOffset;

    /// Calendar day `at` falls on in the clock's offset.
    fn local_day(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset()).date_naive()
    }

    fn today(&self) -> NaiveDate {
        self.local_day(self.now())
    }
}

/// Wall clock in the machine's local offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        *Local::now().offset()
    }

    /// Uses the offset in force at `at`, so days stay right across DST changes.
    fn local_day(&self, at: DateTime<Utc>) -> NaiveDate {
        Local.from_utc_datetime(&at.naive_utc()).date_naive()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }

    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Utc.fix())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}
