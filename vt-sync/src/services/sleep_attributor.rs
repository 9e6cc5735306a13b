//! Sleep-Night Attributor
//!
//! Maps a sleep session to the single calendar date its derived metrics
//! (duration, scores, stage minutes) are bucketed under. The session start
//! alone decides the date; the end never affects bucketing, even when the
//! session crosses further calendar boundaries.

use chrono::{Duration, NaiveDate, Timelike};

use vt_common::metrics::SleepSession;

/// Local hour at which a session start counts toward the following day.
/// A start at 18:00 sharp rolls forward.
pub const SLEEP_ROLLOVER_HOUR: u32 = 18;

/// Canonical "sleep date" of a session
///
/// A session starting at 18:00 or later in its own local time belongs to
/// the night that follows that evening and attributes to the next day
/// ("how did I sleep last night"). Earlier starts (naps, early-morning
/// sessions that already rolled into the day) keep the start's own date.
/// The hour is read in the start timestamp's own UTC offset; the ambient
/// system time zone plays no part.
pub fn attribute(session: &SleepSession) -> NaiveDate {
    let start = session.start();
    if start.hour() >= SLEEP_ROLLOVER_HOUR {
        start.date_naive() + Duration::days(1)
    } else {
        start.date_naive()
    }
}
