//! Pure lock evaluation: maps a note's unlock schedule plus "now" to a boolean.
//!
//! Nothing here touches storage or the system clock; callers supply the current
//! instant and re-invoke on every tick, since the passage of time is the only
//! input that ever changes.

use chrono::{DateTime, Days, Local, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

/// Time-of-day applied when a note has no stored unlock time.
pub const DEFAULT_UNLOCK_TIME: NaiveTime = NaiveTime::MIN;

pub(crate) fn default_unlock_time() -> NaiveTime {
    DEFAULT_UNLOCK_TIME
}

/// Combines an unlock date and time-of-day into a single instant, interpreted
/// in the local timezone of the evaluating process.
pub fn unlock_instant(unlock_date: NaiveDate, unlock_time: NaiveTime) -> NaiveDateTime {
    unlock_date.and_time(unlock_time)
}

/// Whether a note with the given unlock instant is unlocked at `now`.
///
/// Non-strict: reaching the instant exactly unlocks.
pub fn evaluate(unlock_at: NaiveDateTime, now: NaiveDateTime) -> bool {
    now >= unlock_at
}

/// The earliest unlock instant `create` will accept, one minute past `now`.
/// Intended as the minimum for UI date/time pickers.
pub fn earliest_unlock_instant(now: DateTime<Local>) -> NaiveDateTime {
    now.naive_local() + TimeDelta::minutes(1)
}

/// Quick-select unlock schedules, resolved against "now".
///
/// Each preset lands on the fixed time of day 09:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockPreset {
    Tomorrow,
    NextWeek,
    NextMonth,
    NextYear,
}

impl UnlockPreset {
    /// Resolves the preset to an unlock date and time-of-day.
    pub fn resolve(&self, now: DateTime<Local>) -> (NaiveDate, NaiveTime) {
        let today = now.date_naive();
        let date = match self {
            UnlockPreset::Tomorrow => today + Days::new(1),
            UnlockPreset::NextWeek => today + Days::new(7),
            UnlockPreset::NextMonth => today + Months::new(1),
            UnlockPreset::NextYear => today + Months::new(12),
        };
        (date, preset_time())
    }
}

fn preset_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("09:00 is a valid time of day")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_locked_before_instant() {
        let unlock_at = unlock_instant(date(2031, 5, 1), time(9, 0));
        let now = date(2031, 5, 1).and_hms_opt(8, 59, 59).unwrap();
        assert!(!evaluate(unlock_at, now));
    }

    #[test]
    fn test_unlocks_exactly_at_instant() {
        let unlock_at = unlock_instant(date(2031, 5, 1), time(9, 0));
        assert!(evaluate(unlock_at, unlock_at));
    }

    #[test]
    fn test_unlocked_after_instant() {
        let unlock_at = unlock_instant(date(2031, 5, 1), time(9, 0));
        let now = date(2031, 5, 2).and_time(NaiveTime::MIN);
        assert!(evaluate(unlock_at, now));
    }

    #[test]
    fn test_default_unlock_time_is_midnight() {
        let unlock_at = unlock_instant(date(2031, 5, 1), DEFAULT_UNLOCK_TIME);
        assert_eq!(unlock_at, date(2031, 5, 1).and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn test_earliest_unlock_is_one_minute_out() {
        let now = Local.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
        assert_eq!(
            earliest_unlock_instant(now),
            date(2026, 8, 7).and_hms_opt(12, 1, 0).unwrap()
        );
    }

    #[test]
    fn test_presets_resolve_against_now() {
        let now = Local.with_ymd_and_hms(2026, 8, 7, 23, 30, 0).unwrap();
        assert_eq!(
            UnlockPreset::Tomorrow.resolve(now),
            (date(2026, 8, 8), time(9, 0))
        );
        assert_eq!(
            UnlockPreset::NextWeek.resolve(now),
            (date(2026, 8, 14), time(9, 0))
        );
        assert_eq!(
            UnlockPreset::NextMonth.resolve(now),
            (date(2026, 9, 7), time(9, 0))
        );
        assert_eq!(
            UnlockPreset::NextYear.resolve(now),
            (date(2027, 8, 7), time(9, 0))
        );
    }

    #[test]
    fn test_next_month_clamps_to_month_end() {
        let now = Local.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();
        let (resolved, _) = UnlockPreset::NextMonth.resolve(now);
        assert_eq!(resolved, date(2026, 2, 28));
    }
}
