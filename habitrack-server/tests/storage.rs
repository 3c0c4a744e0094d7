use chrono::NaiveDate;
use habitrack_server::analytics::{BackfillPolicy, MONTHLY_WINDOW_DAYS};
use habitrack_server::storage::{HabitFields, Store};
use habitrack_shared::domain::HabitSeed;

struct TestStore {
    store: Store,
    _tempdir: tempfile::TempDir,
}

async fn open_store() -> TestStore {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let store = Store::connect_sqlite(db_path.to_str().unwrap())
        .await
        .expect("db");
    TestStore {
        store,
        _tempdir: dir,
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn fields(name: &str, auto_complete: bool) -> HabitFields {
    HabitFields {
        name: name.into(),
        description: None,
        emoji: Some("✅".into()),
        goal: 7,
        auto_complete,
    }
}

#[tokio::test]
async fn recheck_updates_the_same_row() {
    let t = open_store().await;
    let habit = t.store.create_habit(fields("Read", false)).await.unwrap();
    let day = d(2026, 2, 10);

    let first = t
        .store
        .record_check_in(habit.id, day, true)
        .await
        .unwrap()
        .unwrap();
    let second = t
        .store
        .record_check_in(habit.id, day, false)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first.id, second.id);
    assert!(!second.status);
    let rows = t.store.list_check_ins(habit.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].date, day);
    assert!(!rows[0].status);
}

#[tokio::test]
async fn check_in_for_unknown_habit_is_none() {
    let t = open_store().await;
    let res = t
        .store
        .record_check_in(999, d(2026, 2, 10), true)
        .await
        .unwrap();
    assert!(res.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_check_ins_keep_one_row() {
    let t = open_store().await;
    let habit = t.store.create_habit(fields("Stretch", false)).await.unwrap();
    let day = d(2026, 3, 3);
    let habit_id = habit.id;

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = t.store.clone();
        handles.push(tokio::spawn(async move {
            store.record_check_in(habit_id, day, i % 2 == 0).await
        }));
    }
    for h in handles {
        assert!(h.await.unwrap().unwrap().is_some());
    }

    let rows = t.store.list_check_ins(habit_id).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn backfill_fills_from_tracking_start() {
    let t = open_store().await;
    let auto = t.store.create_habit(fields("Vitamins", true)).await.unwrap();
    let manual = t.store.create_habit(fields("Gym", false)).await.unwrap();
    let today = d(2026, 2, 10);
    let policy = BackfillPolicy::default();

    let created = t.store.backfill_auto_complete(today, &policy).await.unwrap();
    assert_eq!(created, 41);

    let rows = t.store.list_check_ins(auto.id).await.unwrap();
    assert_eq!(rows.len(), 41);
    assert_eq!(rows.first().unwrap().date, d(2026, 1, 1));
    assert_eq!(rows.last().unwrap().date, today);
    assert!(rows.iter().all(|c| c.status));
    assert!(rows.iter().all(|c| c.date >= policy.tracking_start));

    assert!(t.store.list_check_ins(manual.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn backfill_is_idempotent() {
    let t = open_store().await;
    let habit = t.store.create_habit(fields("Vitamins", true)).await.unwrap();
    let today = d(2026, 2, 10);
    let policy = BackfillPolicy::default();

    t.store.backfill_auto_complete(today, &policy).await.unwrap();
    let before = t.store.list_check_ins(habit.id).await.unwrap();
    let created = t.store.backfill_auto_complete(today, &policy).await.unwrap();
    let after = t.store.list_check_ins(habit.id).await.unwrap();

    assert_eq!(created, 0);
    assert_eq!(before, after);
}

#[tokio::test]
async fn backfill_leaves_existing_check_ins_alone() {
    let t = open_store().await;
    let habit = t.store.create_habit(fields("Vitamins", true)).await.unwrap();
    let missed = d(2026, 2, 5);
    t.store
        .record_check_in(habit.id, missed, false)
        .await
        .unwrap();

    let policy = BackfillPolicy {
        window_days: 9,
        tracking_start: d(2026, 1, 1),
    };
    let created = t
        .store
        .backfill_auto_complete(d(2026, 2, 10), &policy)
        .await
        .unwrap();
    assert_eq!(created, 9);

    let rows = t.store.list_check_ins(habit.id).await.unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows.first().unwrap().date, d(2026, 2, 1));
    let kept = rows.iter().find(|c| c.date == missed).unwrap();
    assert!(!kept.status);
}

#[tokio::test]
async fn backfill_before_tracking_start_writes_nothing() {
    let t = open_store().await;
    let habit = t.store.create_habit(fields("Vitamins", true)).await.unwrap();
    let created = t
        .store
        .backfill_auto_complete(d(2025, 12, 20), &BackfillPolicy::default())
        .await
        .unwrap();
    assert_eq!(created, 0);
    assert!(t.store.list_check_ins(habit.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_habits_runs_backfill_and_groups_check_ins() {
    let t = open_store().await;
    let auto = t.store.create_habit(fields("Vitamins", true)).await.unwrap();
    let manual = t.store.create_habit(fields("Gym", false)).await.unwrap();
    let today = d(2026, 1, 3);
    t.store
        .record_check_in(manual.id, today, true)
        .await
        .unwrap();

    let listed = t
        .store
        .list_habits(today, &BackfillPolicy::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    let (h0, c0) = &listed[0];
    let (h1, c1) = &listed[1];
    assert_eq!(h0.id, auto.id);
    assert_eq!(
        c0.iter().map(|c| c.date).collect::<Vec<_>>(),
        vec![d(2026, 1, 1), d(2026, 1, 2), d(2026, 1, 3)]
    );
    assert_eq!(h1.id, manual.id);
    assert_eq!(c1.len(), 1);
    assert!(c1.iter().all(|c| c.habit_id == manual.id));
}

#[tokio::test]
async fn update_and_delete_report_missing_habits() {
    let t = open_store().await;
    assert!(
        t.store
            .update_habit(42, fields("Nope", false))
            .await
            .unwrap()
            .is_none()
    );
    assert!(!t.store.delete_habit(42).await.unwrap());

    let habit = t.store.create_habit(fields("Read", false)).await.unwrap();
    let updated = t
        .store
        .update_habit(
            habit.id,
            HabitFields {
                name: "Read more".into(),
                description: Some("20 pages".into()),
                emoji: None,
                goal: 5,
                auto_complete: true,
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.id, habit.id);
    assert_eq!(updated.name, "Read more");
    assert_eq!(updated.emoji, None);
    assert_eq!(updated.goal, 5);
    assert!(updated.auto_complete);
}

#[tokio::test]
async fn delete_cascades_to_check_ins() {
    let t = open_store().await;
    let habit = t.store.create_habit(fields("Read", false)).await.unwrap();
    t.store
        .record_check_in(habit.id, d(2026, 2, 1), true)
        .await
        .unwrap();
    assert!(t.store.delete_habit(habit.id).await.unwrap());
    assert!(t.store.get_habit(habit.id).await.unwrap().is_none());
    assert!(t.store.list_check_ins(habit.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn seeds_only_into_an_empty_database() {
    let t = open_store().await;
    let seeds = vec![
        HabitSeed {
            name: "Drink Water".into(),
            description: Some("2 Liters daily".into()),
            emoji: None,
            goal: 7,
            auto_complete: false,
        },
        HabitSeed {
            name: "Read 10 Pages".into(),
            description: Some("Non-fiction".into()),
            emoji: None,
            goal: 7,
            auto_complete: false,
        },
    ];
    assert_eq!(t.store.seed_if_empty(&seeds).await.unwrap(), 2);
    assert_eq!(t.store.seed_if_empty(&seeds).await.unwrap(), 0);
}

#[tokio::test]
async fn monthly_progress_covers_thirty_days() {
    let t = open_store().await;
    let a = t.store.create_habit(fields("A", false)).await.unwrap();
    let b = t.store.create_habit(fields("B", false)).await.unwrap();
    let _c = t.store.create_habit(fields("C", false)).await.unwrap();
    let today = d(2026, 3, 15);

    // Outside the window on both sides
    t.store
        .record_check_in(a.id, d(2026, 2, 13), true)
        .await
        .unwrap();
    t.store
        .record_check_in(a.id, d(2026, 3, 16), true)
        .await
        .unwrap();
    // Recorded but not completed
    t.store
        .record_check_in(a.id, d(2026, 3, 1), false)
        .await
        .unwrap();
    // One of three completed
    for (h, status) in [(a.id, true), (b.id, false)] {
        t.store
            .record_check_in(h, d(2026, 3, 10), status)
            .await
            .unwrap();
    }

    let days = t.store.monthly_progress(today).await.unwrap();
    assert_eq!(days.len(), MONTHLY_WINDOW_DAYS as usize);
    assert_eq!(days.first().unwrap().date, d(2026, 2, 14));
    assert_eq!(days.last().unwrap().date, today);
    assert!(days.windows(2).all(|w| w[0].date < w[1].date));

    let last = days.last().unwrap();
    assert_eq!((last.completed, last.total, last.percentage), (0, 0, None));

    let first_march = days.iter().find(|s| s.date == d(2026, 3, 1)).unwrap();
    assert_eq!(first_march.total, 1);
    assert_eq!(first_march.percentage, Some(0.0));

    let tenth = days.iter().find(|s| s.date == d(2026, 3, 10)).unwrap();
    assert_eq!((tenth.completed, tenth.total), (1, 2));
    assert_eq!(tenth.percentage, Some(50.0));

    let recorded: i64 = days.iter().map(|s| s.total).sum();
    assert_eq!(recorded, 3);
}

#[tokio::test]
async fn top_habits_limits_and_orders() {
    let t = open_store().await;
    let start = d(2026, 1, 1);
    let mut ids = Vec::new();
    for i in 0..13 {
        let h = t
            .store
            .create_habit(fields(&format!("Habit {i}"), false))
            .await
            .unwrap();
        // Habits 0 and 1 tie on 5 completions; the rest get 1..=3
        let n = if i < 2 { 5 } else { 1 + i % 3 };
        for day in start.iter_days().take(n) {
            t.store.record_check_in(h.id, day, true).await.unwrap();
        }
        ids.push(h.id);
    }
    // Not completed check-ins do not count
    t.store
        .record_check_in(ids[4], d(2026, 2, 1), false)
        .await
        .unwrap();
    let never_done = t
        .store
        .create_habit(fields("Never done", false))
        .await
        .unwrap();
    t.store
        .record_check_in(never_done.id, d(2026, 2, 1), false)
        .await
        .unwrap();

    let top = t.store.top_habits().await.unwrap();
    assert_eq!(top.len(), 10);
    let order: Vec<i32> = top.iter().map(|h| h.habit_id).collect();
    let expected: Vec<i32> = [0, 1, 2, 5, 8, 11, 4, 7, 10, 3]
        .iter()
        .map(|&i| ids[i])
        .collect();
    assert_eq!(order, expected);
    let counts: Vec<i64> = top.iter().map(|h| h.count).collect();
    assert_eq!(counts, vec![5, 5, 3, 3, 3, 3, 2, 2, 2, 1]);

    let fourth = top.iter().find(|h| h.habit_id == ids[4]).unwrap();
    assert_eq!(fourth.count, 2);
    // Same count as habit 3 but a higher id
    assert!(!order.contains(&ids[6]));
    assert!(!order.contains(&never_done.id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reports_stay_consistent_during_writes() {
    let t = open_store().await;
    let today = d(2026, 2, 10);
    let mut ids = Vec::new();
    for i in 0..200 {
        let h = t
            .store
            .create_habit(fields(&format!("Habit {i}"), false))
            .await
            .unwrap();
        ids.push(h.id);
    }

    let writer = {
        let store = t.store.clone();
        tokio::spawn(async move {
            for id in ids {
                store.record_check_in(id, today, true).await.unwrap();
            }
        })
    };

    while !writer.is_finished() {
        let days = t.store.monthly_progress(today).await.unwrap();
        for s in &days {
            assert!(
                s.completed <= s.total,
                "{}: completed {} > total {}",
                s.date,
                s.completed,
                s.total
            );
            assert!(s.percentage.is_none_or(|p| p <= 100.0));
        }
        let ratio = t.store.completion_ratio(today).await.unwrap();
        assert!(ratio.completed <= ratio.total);
    }
    writer.await.unwrap();

    let days = t.store.monthly_progress(today).await.unwrap();
    let last = days.last().unwrap();
    assert_eq!((last.completed, last.total), (200, 200));
    assert_eq!(last.percentage, Some(100.0));
}

#[tokio::test]
async fn completion_ratio_for_current_month() {
    let t = open_store().await;
    let a = t.store.create_habit(fields("A", false)).await.unwrap();
    let b = t.store.create_habit(fields("B", false)).await.unwrap();
    let today = d(2026, 2, 10);

    for day in d(2026, 2, 1).iter_days().take(5) {
        t.store.record_check_in(a.id, day, true).await.unwrap();
    }
    t.store
        .record_check_in(b.id, d(2026, 2, 2), false)
        .await
        .unwrap();
    // Previous month and future days are ignored
    t.store
        .record_check_in(b.id, d(2026, 1, 31), true)
        .await
        .unwrap();
    t.store
        .record_check_in(b.id, d(2026, 2, 11), true)
        .await
        .unwrap();

    let r = t.store.completion_ratio(today).await.unwrap();
    assert_eq!(r.total, 20);
    assert_eq!(r.completed, 5);
    assert_eq!(r.remaining, 15);
}

#[tokio::test]
async fn completion_ratio_remaining_is_clamped() {
    let t = open_store().await;
    let a = t.store.create_habit(fields("A", false)).await.unwrap();
    t.store
        .record_check_in(a.id, d(2026, 2, 1), true)
        .await
        .unwrap();
    let r = t.store.completion_ratio(d(2026, 2, 1)).await.unwrap();
    assert_eq!((r.completed, r.remaining, r.total), (1, 0, 1));
}

#[tokio::test]
async fn streaks_per_habit() {
    let t = open_store().await;
    let a = t.store.create_habit(fields("A", false)).await.unwrap();
    let b = t.store.create_habit(fields("B", false)).await.unwrap();
    let today = d(2026, 3, 10);

    for day in [d(2026, 3, 8), d(2026, 3, 9), d(2026, 3, 10)] {
        t.store.record_check_in(a.id, day, true).await.unwrap();
    }
    t.store
        .record_check_in(b.id, d(2026, 3, 9), true)
        .await
        .unwrap();
    t.store
        .record_check_in(b.id, today, false)
        .await
        .unwrap();

    let streaks = t.store.current_streaks(today).await.unwrap();
    assert_eq!(streaks.len(), 2);
    assert_eq!((streaks[0].habit_id, streaks[0].current_streak), (a.id, 3));
    assert_eq!((streaks[1].habit_id, streaks[1].current_streak), (b.id, 1));
}
