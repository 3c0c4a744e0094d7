pub mod models;
mod reports;
pub mod schema;

use std::collections::BTreeSet;

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use habitrack_shared::domain::HabitSeed;
use models::{CheckIn, Habit, NewCheckIn, NewHabit};
use tracing::{debug, trace};

use crate::analytics::{self, BackfillPolicy};

pub use reports::{HabitStreak, TopHabit};

/// Structured error type for all storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A Diesel ORM error (query failure, constraint violation, etc.)
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Failed to acquire or build a connection from the pool.
    #[error("pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A database migration failed to apply.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Editable habit attributes, owned so they can move into blocking tasks.
#[derive(Debug, Clone)]
pub struct HabitFields {
    pub name: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub goal: i32,
    pub auto_complete: bool,
}

impl HabitFields {
    fn as_new(&self) -> NewHabit<'_> {
        NewHabit {
            name: &self.name,
            description: self.description.as_deref(),
            emoji: self.emoji.as_deref(),
            goal: self.goal,
            auto_complete: self.auto_complete,
        }
    }
}

impl From<&HabitSeed> for HabitFields {
    fn from(seed: &HabitSeed) -> Self {
        Self {
            name: seed.name.clone(),
            description: seed.description.clone(),
            emoji: seed.emoji.clone(),
            goal: seed.goal,
            auto_complete: seed.auto_complete,
        }
    }
}

#[derive(Clone)]
pub struct Store {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

impl Store {
    pub async fn connect_sqlite(path: &str) -> Result<Self, StorageError> {
        let url = path.to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(url);
        let pool = Pool::builder().max_size(8).build(manager)?;

        // Run pending Diesel migrations on startup (auto-init empty DBs)
        {
            let pool_clone = pool.clone();
            tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
                const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
                let mut conn = pool_clone.get()?;
                configure_sqlite_conn(&mut conn)?;
                conn.run_pending_migrations(MIGRATIONS)
                    .map_err(|e| StorageError::Migration(e.to_string()))?;
                Ok(())
            })
            .await??;
        }

        Ok(Store { pool })
    }

    /// Inserts the configured habits when the habit table is empty.
    /// Returns how many habits were created.
    pub async fn seed_if_empty(&self, seeds: &[HabitSeed]) -> Result<usize, StorageError> {
        use schema::habits;

        if seeds.is_empty() {
            return Ok(0);
        }
        let pool = self.pool.clone();
        let fields: Vec<HabitFields> = seeds.iter().map(HabitFields::from).collect();
        tokio::task::spawn_blocking(move || -> Result<usize, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            conn.immediate_transaction(|conn| -> Result<usize, StorageError> {
                let existing: i64 = habits::table.count().get_result(conn)?;
                if existing > 0 {
                    return Ok(0);
                }
                let mut created = 0;
                for f in &fields {
                    created += diesel::insert_into(habits::table)
                        .values(&f.as_new())
                        .execute(conn)?;
                }
                Ok(created)
            })
        })
        .await?
    }

    /// Runs the auto-complete backfill for `today`, then returns every habit
    /// (by id) with its check-ins in date order.
    pub async fn list_habits(
        &self,
        today: NaiveDate,
        policy: &BackfillPolicy,
    ) -> Result<Vec<(Habit, Vec<CheckIn>)>, StorageError> {
        use schema::{check_ins, habits};

        let pool = self.pool.clone();
        let window = policy.window(today);
        tokio::task::spawn_blocking(
            move || -> Result<Vec<(Habit, Vec<CheckIn>)>, StorageError> {
                let mut conn = pool.get()?;
                configure_sqlite_conn(&mut conn)?;
                if let Some((start, end)) = window {
                    backfill_window(&mut conn, start, end)?;
                }
                let hs = habits::table
                    .order(habits::id.asc())
                    .select(Habit::as_select())
                    .load::<Habit>(&mut conn)?;
                let cs = CheckIn::belonging_to(&hs)
                    .order((check_ins::habit_id.asc(), check_ins::date.asc()))
                    .select(CheckIn::as_select())
                    .load::<CheckIn>(&mut conn)?;
                let grouped = cs.grouped_by(&hs);
                Ok(hs.into_iter().zip(grouped).collect())
            },
        )
        .await?
    }

    pub async fn get_habit(&self, habit_id: i32) -> Result<Option<Habit>, StorageError> {
        use schema::habits;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<Habit>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(habits::table
                .find(habit_id)
                .select(Habit::as_select())
                .first::<Habit>(&mut conn)
                .optional()?)
        })
        .await?
    }

    pub async fn create_habit(&self, fields: HabitFields) -> Result<Habit, StorageError> {
        use schema::habits;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Habit, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let habit = diesel::insert_into(habits::table)
                .values(&fields.as_new())
                .returning(Habit::as_returning())
                .get_result::<Habit>(&mut conn)?;
            trace!(habit_id = habit.id, name = %habit.name, "create_habit");
            Ok(habit)
        })
        .await?
    }

    /// Replaces the editable attributes of a habit. `None` when no habit has
    /// that id.
    pub async fn update_habit(
        &self,
        habit_id: i32,
        fields: HabitFields,
    ) -> Result<Option<Habit>, StorageError> {
        use schema::habits;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<Habit>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(diesel::update(habits::table.find(habit_id))
                .set(&fields.as_new())
                .returning(Habit::as_returning())
                .get_result::<Habit>(&mut conn)
                .optional()?)
        })
        .await?
    }

    /// Deletes a habit together with its check-ins. Returns whether a habit
    /// was removed.
    pub async fn delete_habit(&self, habit_id: i32) -> Result<bool, StorageError> {
        use schema::{check_ins, habits};
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<bool, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            conn.immediate_transaction(|conn| -> Result<bool, StorageError> {
                diesel::delete(check_ins::table.filter(check_ins::habit_id.eq(habit_id)))
                    .execute(conn)?;
                let deleted = diesel::delete(habits::table.find(habit_id)).execute(conn)?;
                Ok(deleted > 0)
            })
        })
        .await?
    }

    /// Sets the status of a habit's check-in for `date`, creating the row if
    /// needed. `None` when the habit does not exist.
    ///
    /// The existence check and the upsert share one immediate transaction and
    /// the write itself is a single `INSERT .. ON CONFLICT DO UPDATE`, so
    /// concurrent calls for the same day always end up with one row.
    pub async fn record_check_in(
        &self,
        habit_id: i32,
        date: NaiveDate,
        status: bool,
    ) -> Result<Option<CheckIn>, StorageError> {
        use schema::{check_ins, habits};
        let pool = self.pool.clone();
        trace!(habit_id, %date, status, "record_check_in starting");
        tokio::task::spawn_blocking(move || -> Result<Option<CheckIn>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            conn.immediate_transaction(|conn| -> Result<Option<CheckIn>, StorageError> {
                let exists: i64 = habits::table
                    .filter(habits::id.eq(habit_id))
                    .count()
                    .get_result(conn)?;
                if exists == 0 {
                    return Ok(None);
                }
                let row = NewCheckIn {
                    habit_id,
                    date,
                    status,
                };
                let saved = diesel::insert_into(check_ins::table)
                    .values(&row)
                    .on_conflict((check_ins::habit_id, check_ins::date))
                    .do_update()
                    .set(check_ins::status.eq(status))
                    .returning(CheckIn::as_returning())
                    .get_result::<CheckIn>(conn)?;
                Ok(Some(saved))
            })
        })
        .await?
    }

    pub async fn list_check_ins(&self, habit_id: i32) -> Result<Vec<CheckIn>, StorageError> {
        use schema::check_ins;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<CheckIn>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(check_ins::table
                .filter(check_ins::habit_id.eq(habit_id))
                .order(check_ins::date.asc())
                .select(CheckIn::as_select())
                .load::<CheckIn>(&mut conn)?)
        })
        .await?
    }

    /// Marks every unrecorded day of the backfill window as completed for
    /// each auto-complete habit. Existing check-ins are left untouched.
    /// Returns the number of check-ins created.
    pub async fn backfill_auto_complete(
        &self,
        today: NaiveDate,
        policy: &BackfillPolicy,
    ) -> Result<usize, StorageError> {
        let Some((start, end)) = policy.window(today) else {
            trace!(%today, tracking_start = %policy.tracking_start, "backfill: window empty");
            return Ok(0);
        };
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<usize, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            backfill_window(&mut conn, start, end)
        })
        .await?
    }
}

/// One transaction per habit: load the dates already recorded in
/// `[start, end]`, insert the rest. A failure keeps earlier habits' rows.
fn backfill_window(
    conn: &mut SqliteConnection,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<usize, StorageError> {
    use schema::{check_ins, habits};

    let targets: Vec<i32> = habits::table
        .filter(habits::auto_complete.eq(true))
        .order(habits::id.asc())
        .select(habits::id)
        .load::<i32>(conn)?;

    let mut created = 0;
    for habit_id in targets {
        let inserted = conn.immediate_transaction(|conn| -> Result<usize, StorageError> {
            let existing: BTreeSet<NaiveDate> = check_ins::table
                .filter(check_ins::habit_id.eq(habit_id))
                .filter(check_ins::date.between(start, end))
                .select(check_ins::date)
                .load::<NaiveDate>(conn)?
                .into_iter()
                .collect();
            let mut n = 0;
            for date in analytics::missing_dates(start, end, &existing) {
                let row = NewCheckIn {
                    habit_id,
                    date,
                    status: true,
                };
                n += diesel::insert_into(check_ins::table)
                    .values(&row)
                    .on_conflict_do_nothing()
                    .execute(conn)?;
            }
            Ok(n)
        })?;
        if inserted > 0 {
            debug!(habit_id, inserted, %start, %end, "backfill: filled missing days");
        }
        created += inserted;
    }
    Ok(created)
}

fn configure_sqlite_conn(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    // Busy timeout first so the WAL switch waits on a locked database
    // Ignore the result rows; Diesel's execute is fine for PRAGMAs
    diesel::sql_query("PRAGMA busy_timeout=5000;").execute(conn)?;
    diesel::sql_query("PRAGMA journal_mode=WAL;").execute(conn)?;
    diesel::sql_query("PRAGMA synchronous=NORMAL;").execute(conn)?;
    diesel::sql_query("PRAGMA foreign_keys=ON;").execute(conn)?;
    Ok(())
}
