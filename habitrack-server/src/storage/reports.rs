use std::collections::HashMap;

use chrono::NaiveDate;
use diesel::dsl::{count, count_star};
use diesel::prelude::*;

use super::{Store, StorageError, configure_sqlite_conn, schema};
use crate::analytics::{
    self, CompletionRatio, DailySnapshot, MONTHLY_WINDOW_DAYS, TOP_HABITS_LIMIT,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopHabit {
    pub habit_id: i32,
    pub name: String,
    pub emoji: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitStreak {
    pub habit_id: i32,
    pub name: String,
    pub emoji: Option<String>,
    pub current_streak: i64,
}

type StreakRows = (Vec<(i32, String, Option<String>)>, Vec<(i32, NaiveDate)>);

impl Store {
    /// Completion per day over the trailing 30 days, oldest first. Every day
    /// of the window is present.
    pub async fn monthly_progress(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<DailySnapshot>, StorageError> {
        use schema::check_ins::dsl as ci;
        let (start, end) = analytics::trailing_window(today, MONTHLY_WINDOW_DAYS);
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<DailySnapshot>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            // Both counts must come from the same snapshot
            conn.transaction(|conn| -> Result<Vec<DailySnapshot>, StorageError> {
                let totals: HashMap<NaiveDate, i64> = ci::check_ins
                    .filter(ci::date.between(start, end))
                    .group_by(ci::date)
                    .select((ci::date, count_star()))
                    .load::<(NaiveDate, i64)>(conn)?
                    .into_iter()
                    .collect();
                let completed: HashMap<NaiveDate, i64> = ci::check_ins
                    .filter(ci::date.between(start, end))
                    .filter(ci::status.eq(true))
                    .group_by(ci::date)
                    .select((ci::date, count_star()))
                    .load::<(NaiveDate, i64)>(conn)?
                    .into_iter()
                    .collect();
                Ok(analytics::daily_snapshots(
                    start,
                    MONTHLY_WINDOW_DAYS,
                    &totals,
                    &completed,
                ))
            })
        })
        .await?
    }

    /// Habits with the most completed check-ins, highest first, ties by id.
    /// Habits that were never completed are left out.
    pub async fn top_habits(&self) -> Result<Vec<TopHabit>, StorageError> {
        use schema::{check_ins, habits};
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<TopHabit>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let rows = habits::table
                .inner_join(check_ins::table)
                .filter(check_ins::status.eq(true))
                .group_by((habits::id, habits::name, habits::emoji))
                .select((
                    habits::id,
                    habits::name,
                    habits::emoji,
                    count(check_ins::id),
                ))
                .order((count(check_ins::id).desc(), habits::id.asc()))
                .limit(TOP_HABITS_LIMIT)
                .load::<(i32, String, Option<String>, i64)>(&mut conn)?;
            Ok(rows
                .into_iter()
                .map(|(habit_id, name, emoji, count)| TopHabit {
                    habit_id,
                    name,
                    emoji,
                    count,
                })
                .collect())
        })
        .await?
    }

    /// Month-to-date completed check-ins against habits x elapsed days.
    pub async fn completion_ratio(
        &self,
        today: NaiveDate,
    ) -> Result<CompletionRatio, StorageError> {
        use schema::{check_ins, habits};
        let start = analytics::month_start(today);
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<CompletionRatio, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            conn.transaction(|conn| -> Result<CompletionRatio, StorageError> {
                let habit_count: i64 = habits::table.count().get_result(conn)?;
                let completed: i64 = check_ins::table
                    .filter(check_ins::date.between(start, today))
                    .filter(check_ins::status.eq(true))
                    .count()
                    .get_result(conn)?;
                Ok(analytics::completion_ratio(habit_count, today, completed))
            })
        })
        .await?
    }

    /// Current completion streak for every habit, by habit id.
    pub async fn current_streaks(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<HabitStreak>, StorageError> {
        use schema::{check_ins, habits};
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<HabitStreak>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let (hs, rows) = conn.transaction(|conn| -> Result<StreakRows, StorageError> {
                let hs = habits::table
                    .order(habits::id.asc())
                    .select((habits::id, habits::name, habits::emoji))
                    .load::<(i32, String, Option<String>)>(conn)?;
                let rows = check_ins::table
                    .filter(check_ins::status.eq(true))
                    .filter(check_ins::date.le(today))
                    .order((check_ins::habit_id.asc(), check_ins::date.desc()))
                    .select((check_ins::habit_id, check_ins::date))
                    .load::<(i32, NaiveDate)>(conn)?;
                Ok((hs, rows))
            })?;
            let mut by_habit: HashMap<i32, Vec<NaiveDate>> = HashMap::new();
            for (habit_id, date) in rows {
                by_habit.entry(habit_id).or_default().push(date);
            }
            Ok(hs
                .into_iter()
                .map(|(habit_id, name, emoji)| {
                    let dates = by_habit.get(&habit_id).map(Vec::as_slice).unwrap_or(&[]);
                    HabitStreak {
                        habit_id,
                        name,
                        emoji,
                        current_streak: analytics::current_streak(dates, today),
                    }
                })
                .collect())
        })
        .await?
    }
}
