//! Calendar math and aggregation shared by the store's report queries and the
//! auto-complete backfill. Everything here takes `today` explicitly and does
//! no IO.

use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, Days, NaiveDate};
use serde::Deserialize;

/// Length of the monthly progress window, today included.
pub const MONTHLY_WINDOW_DAYS: u32 = 30;

/// Maximum number of rows returned by the top habits report.
pub const TOP_HABITS_LIMIT: i64 = 10;

pub const DEFAULT_BACKFILL_WINDOW_DAYS: u32 = 60;

pub fn default_tracking_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn default_window_days() -> u32 {
    DEFAULT_BACKFILL_WINDOW_DAYS
}

/// Bounds for the auto-complete backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BackfillPolicy {
    /// How many days before today the backfill may reach.
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// No check-in is ever backfilled before this date.
    #[serde(default = "default_tracking_start")]
    pub tracking_start: NaiveDate,
}

impl Default for BackfillPolicy {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_BACKFILL_WINDOW_DAYS,
            tracking_start: default_tracking_start(),
        }
    }
}

impl BackfillPolicy {
    /// Inclusive `(start, end)` range to fill for `today`, or `None` when the
    /// whole window lies before the tracking start.
    pub fn window(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let reach = today
            .checked_sub_days(Days::new(u64::from(self.window_days)))
            .unwrap_or(NaiveDate::MIN);
        let start = reach.max(self.tracking_start);
        (start <= today).then_some((start, today))
    }
}

/// Inclusive `[today - (days - 1), today]`. `days == 0` is treated as 1.
pub fn trailing_window(today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let back = u64::from(days.max(1) - 1);
    let start = today.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN);
    (start, today)
}

pub fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

/// Days in `[start, end]` not present in `existing`, ascending.
pub fn missing_dates(
    start: NaiveDate,
    end: NaiveDate,
    existing: &BTreeSet<NaiveDate>,
) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !existing.contains(d))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    pub completed: i64,
    pub total: i64,
    pub percentage: Option<f64>,
}

/// `completed / total` as a percentage rounded to one decimal, ties to even;
/// `None` when nothing was recorded.
pub fn percentage(completed: i64, total: i64) -> Option<f64> {
    if total <= 0 {
        return None;
    }
    let raw = completed as f64 / total as f64 * 100.0;
    Some((raw * 10.0).round_ties_even() / 10.0)
}

/// One snapshot per day of `[start, start + days)`, zero-filled where the
/// per-day maps have no entry.
pub fn daily_snapshots(
    start: NaiveDate,
    days: u32,
    totals: &HashMap<NaiveDate, i64>,
    completed: &HashMap<NaiveDate, i64>,
) -> Vec<DailySnapshot> {
    start
        .iter_days()
        .take(days as usize)
        .map(|date| {
            let total = totals.get(&date).copied().unwrap_or(0);
            let done = completed.get(&date).copied().unwrap_or(0);
            DailySnapshot {
                date,
                completed: done,
                total,
                percentage: percentage(done, total),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionRatio {
    pub completed: i64,
    pub remaining: i64,
    pub total: i64,
}

/// Month-to-date ratio. The denominator assumes every habit is due every day
/// since the first of the month, whenever it was created.
pub fn completion_ratio(habit_count: i64, today: NaiveDate, completed: i64) -> CompletionRatio {
    let days_in_month = i64::from(today.day());
    let total = habit_count * days_in_month;
    CompletionRatio {
        completed,
        remaining: (total - completed).max(0),
        total,
    }
}

/// Consecutive completed days ending today, or ending yesterday when today
/// has not been completed yet. `completed_desc` must be unique and sorted
/// newest first; dates after `today` are skipped.
pub fn current_streak(completed_desc: &[NaiveDate], today: NaiveDate) -> i64 {
    let mut days = completed_desc.iter().copied().skip_while(|d| *d > today).peekable();
    let Some(first) = days.peek().copied() else {
        return 0;
    };
    let yesterday = today.pred_opt().unwrap_or(today);
    if first != today && first != yesterday {
        return 0;
    }
    let mut expected = first;
    let mut streak = 0;
    for day in days {
        if day != expected {
            break;
        }
        streak += 1;
        match expected.pred_opt() {
            Some(prev) => expected = prev,
            None => break,
        }
    }
    streak
}
