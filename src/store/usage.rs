//! Per-day roast counters.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{read_json, write_json, StoreError};

pub const USAGE_FILE: &str = "usage.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct DailyUsage {
    /// `YYYY-MM-DD`
    day: NaiveDate,
    count: u32,
}

/// What a user may still do today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageStatus {
    pub used: u32,
    /// `None` when the user is not limited.
    pub limit: Option<u32>,
}

impl UsageStatus {
    pub fn remaining(&self) -> Option<u32> {
        self.limit.map(|limit| limit.saturating_sub(self.used))
    }

    pub fn is_blocked(&self) -> bool {
        self.remaining() == Some(0)
    }
}

pub struct UsageTracker {
    path: PathBuf,
}

impl UsageTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(USAGE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Roasts recorded for `user` on `day`. A counter from another day
    /// counts as zero.
    pub fn count_on(&self, user: &str, day: NaiveDate) -> Result<u32, StoreError> {
        let users: HashMap<String, DailyUsage> = read_json(&self.path)?;
        Ok(users
            .get(user)
            .filter(|usage| usage.day == day)
            .map_or(0, |usage| usage.count))
    }

    /// Increment the counter for `user` on `day` and return the new count.
    pub fn record_on(&self, user: &str, day: NaiveDate) -> Result<u32, StoreError> {
        let mut users: HashMap<String, DailyUsage> = read_json(&self.path)?;
        let entry = users.entry(user.to_string()).or_insert(DailyUsage { day, count: 0 });
        if entry.day != day {
            *entry = DailyUsage { day, count: 0 };
        }
        entry.count = entry.count.saturating_add(1);
        let count = entry.count;
        write_json(&self.path, &users)?;
        debug!(user, %day, count, "Recorded roast usage");
        Ok(count)
    }

    pub fn status_on(
        &self,
        user: &str,
        day: NaiveDate,
        daily_limit: u32,
        premium: bool,
    ) -> Result<UsageStatus, StoreError> {
        Ok(UsageStatus {
            used: self.count_on(user, day)?,
            limit: (!premium).then_some(daily_limit),
        })
    }

    pub fn record_today(&self, user: &str) -> Result<u32, StoreError> {
        self.record_on(user, Self::today())
    }

    pub fn status_today(
        &self,
        user: &str,
        daily_limit: u32,
        premium: bool,
    ) -> Result<UsageStatus, StoreError> {
        self.status_on(user, Self::today(), daily_limit, premium)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn counts_accumulate_within_a_day_and_reset_on_the_next() {
        let dir = TempDir::new().unwrap();
        let tracker = UsageTracker::in_dir(dir.path());

        assert_eq!(tracker.count_on("local", day(1)).unwrap(), 0);
        assert_eq!(tracker.record_on("local", day(1)).unwrap(), 1);
        assert_eq!(tracker.record_on("local", day(1)).unwrap(), 2);
        assert_eq!(tracker.count_on("local", day(1)).unwrap(), 2);

        assert_eq!(tracker.count_on("local", day(2)).unwrap(), 0);
        assert_eq!(tracker.record_on("local", day(2)).unwrap(), 1);
        assert_eq!(tracker.count_on("local", day(1)).unwrap(), 0);
    }

    #[test]
    fn users_are_tracked_separately() {
        let dir = TempDir::new().unwrap();
        let tracker = UsageTracker::in_dir(dir.path());
        tracker.record_on("alice", day(5)).unwrap();
        tracker.record_on("alice", day(5)).unwrap();
        tracker.record_on("bob", day(5)).unwrap();

        assert_eq!(tracker.count_on("alice", day(5)).unwrap(), 2);
        assert_eq!(tracker.count_on("bob", day(5)).unwrap(), 1);

        let raw = std::fs::read_to_string(tracker.path()).unwrap();
        assert!(raw.contains("\"2026-03-05\""));
    }

    #[test]
    fn status_blocks_free_tier_at_limit_only() {
        let dir = TempDir::new().unwrap();
        let tracker = UsageTracker::in_dir(dir.path());
        for _ in 0..3 {
            tracker.record_on("local", day(9)).unwrap();
        }

        let free = tracker.status_on("local", day(9), 3, false).unwrap();
        assert_eq!(free.remaining(), Some(0));
        assert!(free.is_blocked());

        let premium = tracker.status_on("local", day(9), 3, true).unwrap();
        assert_eq!(premium.remaining(), None);
        assert!(!premium.is_blocked());

        let tomorrow = tracker.status_on("local", day(10), 3, false).unwrap();
        assert_eq!(tomorrow.remaining(), Some(3));
    }
}
