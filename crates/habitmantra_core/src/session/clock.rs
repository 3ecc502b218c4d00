//! Time source used to stamp habits and check-ins.

use chrono::{Local, NaiveDate, Utc};

/// Provides creation timestamps and the current calendar day.
pub trait Clock {
    /// Current device-local calendar day.
    fn today(&self) -> NaiveDate;
    /// Current Unix epoch milliseconds.
    fn now_ms(&self) -> i64;
}

/// Wall clock; day boundaries follow the device-local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}
