//! Remaining-time labels for lock badges.

use chrono::{DateTime, Utc};

use crate::types::LockRecord;

/// Human label for the time left on `lock`, measured from now.
pub fn remaining_time_label(lock: &LockRecord) -> String {
    remaining_time_label_at(lock, Utc::now())
}

/// Human label for the time left on `lock` at `now`.
///
/// Empty when the lock has no end date, when `show_remaining` is unset, or
/// when the end date does not parse. `"0s"` once the end date has passed.
/// Otherwise the two largest units, floored: `"2d 3h"`, `"4h 0m"`,
/// `"5m 12s"`, `"9s"`.
pub fn remaining_time_label_at(lock: &LockRecord, now: DateTime<Utc>) -> String {
    if lock.show_remaining.is_none() {
        return String::new();
    }
    let Some(end) = lock.end_date.as_deref().and_then(parse_end_date) else {
        return String::new();
    };

    let left_ms = end.signed_duration_since(now).num_milliseconds();
    if left_ms <= 0 {
        return "0s".to_string();
    }

    let seconds = left_ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

fn parse_end_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap()
    }

    fn lock_ending_in(offset: Duration) -> LockRecord {
        LockRecord {
            id: "lock-1".to_string(),
            status: "locked".to_string(),
            end_date: Some((now() + offset).to_rfc3339()),
            show_remaining: Some(true),
            ..LockRecord::default()
        }
    }

    #[test]
    fn ninety_seconds_is_minutes_and_seconds() {
        let lock = lock_ending_in(Duration::milliseconds(90_000));
        assert_eq!(remaining_time_label_at(&lock, now()), "1m 30s");
    }

    #[test]
    fn past_end_date_is_zero() {
        let lock = lock_ending_in(Duration::hours(-3));
        assert_eq!(remaining_time_label_at(&lock, now()), "0s");
    }

    #[test]
    fn exact_end_is_zero() {
        let lock = lock_ending_in(Duration::zero());
        assert_eq!(remaining_time_label_at(&lock, now()), "0s");
    }

    #[test]
    fn unset_show_remaining_is_empty() {
        let mut lock = lock_ending_in(Duration::hours(1));
        lock.show_remaining = None;
        assert_eq!(remaining_time_label_at(&lock, now()), "");
    }

    #[test]
    fn explicit_false_still_computes() {
        let mut lock = lock_ending_in(Duration::seconds(9));
        lock.show_remaining = Some(false);
        assert_eq!(remaining_time_label_at(&lock, now()), "9s");
    }

    #[test]
    fn missing_end_date_is_empty() {
        let mut lock = lock_ending_in(Duration::hours(1));
        lock.end_date = None;
        assert_eq!(remaining_time_label_at(&lock, now()), "");
    }

    #[test]
    fn unparseable_end_date_is_empty() {
        let mut lock = lock_ending_in(Duration::hours(1));
        lock.end_date = Some("next tuesday".to_string());
        assert_eq!(remaining_time_label_at(&lock, now()), "");
    }

    #[test]
    fn picks_two_largest_units() {
        let cases = [
            (Duration::days(2) + Duration::hours(3) + Duration::minutes(59), "2d 3h"),
            (Duration::hours(4), "4h 0m"),
            (Duration::minutes(5) + Duration::seconds(12), "5m 12s"),
            (Duration::milliseconds(999), "0s"),
            (Duration::milliseconds(1_500), "1s"),
        ];
        for (offset, expected) in cases {
            assert_eq!(remaining_time_label_at(&lock_ending_in(offset), now()), expected);
        }
    }

    #[test]
    fn accepts_fractional_utc_timestamps() {
        let lock = LockRecord {
            end_date: Some("2026-01-31T12:01:30.000Z".to_string()),
            show_remaining: Some(true),
            ..LockRecord::default()
        };
        assert_eq!(remaining_time_label_at(&lock, now()), "1m 30s");
    }

    #[test]
    fn same_inputs_same_label() {
        let lock = lock_ending_in(Duration::hours(26));
        assert_eq!(
            remaining_time_label_at(&lock, now()),
            remaining_time_label_at(&lock, now())
        );
    }
}
