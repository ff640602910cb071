//! Text badge derived from the presentation surface.
//!
//! Built only from `is_active`, `first_lock` and the remaining-time label so
//! any renderer can reproduce it.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::cache::LockCache;
use crate::format::remaining_time_label_at;
use crate::types::LockRecord;

const LOCKED_GLYPH: &str = "🔒";
const UNLOCKED_GLYPH: &str = "🔓";
const FROZEN_GLYPH: &str = "❄️";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    /// The lock can be released now, either by flag or because time ran out.
    pub unlockable: bool,
    pub frozen: bool,
    /// Shown only while the lock cannot be released.
    pub keyholder: Option<String>,
    /// Shown only while the lock cannot be released, the lock opts in and
    /// there is a label to show.
    pub remaining: Option<String>,
}

impl Badge {
    pub fn for_lock(lock: &LockRecord, now: DateTime<Utc>) -> Self {
        let label = remaining_time_label_at(lock, now);
        let unlockable = lock.unlockable.unwrap_or(false) || label == "0s";

        let keyholder = lock
            .keyholder_name
            .clone()
            .filter(|name| !unlockable && !name.is_empty());
        let remaining = (!unlockable && lock.show_remaining == Some(true) && !label.is_empty())
            .then_some(label);

        Self {
            unlockable,
            frozen: lock.frozen.unwrap_or(false),
            keyholder,
            remaining,
        }
    }

    /// Badge for `subject_id`, or None when the snapshot holds no lock.
    ///
    /// Reads the snapshot only and never schedules a refresh, so a host can
    /// call `is_active` once per pass and render from the result.
    pub fn for_subject(cache: &LockCache, subject_id: &str, now: DateTime<Utc>) -> Option<Self> {
        cache
            .first_lock(subject_id)
            .map(|lock| Self::for_lock(&lock, now))
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.unlockable {
            UNLOCKED_GLYPH
        } else {
            LOCKED_GLYPH
        })?;
        if self.frozen {
            f.write_str(FROZEN_GLYPH)?;
        }
        f.write_str(" Locked")?;
        if let Some(keyholder) = &self.keyholder {
            write!(f, " by {}", keyholder)?;
        }
        if let Some(remaining) = &self.remaining {
            write!(f, " ({})", remaining)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap()
    }

    fn timed_lock(offset: Duration) -> LockRecord {
        LockRecord {
            id: "lock-1".to_string(),
            status: "locked".to_string(),
            end_date: Some((now() + offset).to_rfc3339()),
            show_remaining: Some(true),
            unlockable: Some(false),
            keyholder_name: Some("kh".to_string()),
            ..LockRecord::default()
        }
    }

    #[test]
    fn running_lock_shows_keyholder_and_time() {
        let badge = Badge::for_lock(&timed_lock(Duration::hours(50)), now());
        assert_eq!(badge.to_string(), "🔒 Locked by kh (2d 2h)");
    }

    #[test]
    fn elapsed_lock_reads_as_unlockable() {
        let badge = Badge::for_lock(&timed_lock(Duration::minutes(-1)), now());
        assert!(badge.unlockable);
        assert_eq!(badge.keyholder, None);
        assert_eq!(badge.remaining, None);
        assert_eq!(badge.to_string(), "🔓 Locked");
    }

    #[test]
    fn frozen_marker() {
        let mut lock = timed_lock(Duration::hours(1));
        lock.frozen = Some(true);
        lock.show_remaining = Some(false);
        assert_eq!(Badge::for_lock(&lock, now()).to_string(), "🔒❄️ Locked by kh");
    }

    #[test]
    fn opted_in_lock_without_end_date_has_no_empty_parens() {
        let mut lock = timed_lock(Duration::hours(1));
        lock.end_date = None;
        let badge = Badge::for_lock(&lock, now());
        assert_eq!(badge.remaining, None);
        assert_eq!(badge.to_string(), "🔒 Locked by kh");
    }

    #[test]
    fn plain_lock_without_extras() {
        let lock = LockRecord {
            id: "lock-1".to_string(),
            status: "locked".to_string(),
            ..LockRecord::default()
        };
        assert_eq!(Badge::for_lock(&lock, now()).to_string(), "🔒 Locked");
    }
}
