use arc14_core::input::{NewArcCycle, NewDailyLog, NewHabit, NewJournal};
use arc14_core::{ArcStatus, JournalCategory, Mood};
use arc14_store::{ArcFilter, JournalFilter, LogFilter, TrackerStore};
use chrono::{Duration, Local, Utc};
use tempfile::tempdir;

fn journal(title: &str, content: &str, category: &str, tags: &[&str]) -> arc14_core::Journal {
    NewJournal {
        title: Some(title.to_string()),
        content: Some(content.to_string()),
        category: Some(category.to_string()),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
    .into_journal(Utc::now())
    .expect("valid journal")
}

fn log(title: &str, mood: &str, energy: i64, days_ago: i64, tags: &[&str]) -> arc14_core::DailyLog {
    NewDailyLog {
        title: Some(title.to_string()),
        content: Some("notes".to_string()),
        date: Some((Utc::now() - Duration::days(days_ago)).to_rfc3339()),
        mood: Some(mood.to_string()),
        energy: Some(energy),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
    .into_log(Utc::now())
    .expect("valid log")
}

#[test]
fn reopening_keeps_schema_and_rows() {
    let tmp = tempdir().expect("tempdir");
    let db = tmp.path().join("nested").join("arc14.db");
    {
        let store = TrackerStore::open(&db).expect("open store");
        let habit = NewHabit {
            name: Some("Walk".to_string()),
            ..Default::default()
        }
        .into_habit(Utc::now())
        .expect("valid habit");
        store.insert_habit(&habit).expect("insert");
    }
    let store = TrackerStore::open(&db).expect("reopen store");
    assert_eq!(store.schema_version().expect("version"), 2);
    assert_eq!(store.counts().expect("counts").habits, 1);
}

#[test]
fn habit_toggle_round_trips_through_storage() {
    let tmp = tempdir().expect("tempdir");
    let store = TrackerStore::open(&tmp.path().join("arc14.db")).expect("open store");
    let habit = NewHabit {
        name: Some("Meditate".to_string()),
        category: Some("mindfulness".to_string()),
        ..Default::default()
    }
    .into_habit(Utc::now())
    .expect("valid habit");
    store.insert_habit(&habit).expect("insert");

    let today = Local::now().date_naive();
    let mut stored = store.get_habit(&habit.id).expect("get").expect("exists");
    stored.toggle_completion(Utc::now(), today);
    assert!(store.save_habit(&stored).expect("save"));

    let reloaded = store.get_habit(&habit.id).expect("get").expect("exists");
    assert_eq!(reloaded.completed_dates.len(), 1);
    assert_eq!(reloaded.streak, 1);

    assert!(store.delete_habit(&habit.id).expect("delete"));
    assert!(store.get_habit(&habit.id).expect("get").is_none());
    assert!(store.list_habits().expect("list").is_empty());
    assert!(!store.save_habit(&reloaded).expect("save after delete"));
}

#[test]
fn log_filters_and_mood_stats() {
    let tmp = tempdir().expect("tempdir");
    let store = TrackerStore::open(&tmp.path().join("arc14.db")).expect("open store");
    store.insert_log(&log("a", "good", 6, 0, &["gym"])).expect("insert");
    store.insert_log(&log("b", "good", 8, 1, &["work"])).expect("insert");
    store.insert_log(&log("c", "bad", 3, 10, &[])).expect("insert");

    let all = store.list_logs(&LogFilter::default()).expect("list");
    let titles: Vec<&str> = all.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["a", "b", "c"]);

    let recent = store
        .list_logs(&LogFilter {
            start: Some(Utc::now() - Duration::days(5)),
            ..Default::default()
        })
        .expect("list");
    assert_eq!(recent.len(), 2);

    let tagged = store
        .list_logs(&LogFilter {
            tags: vec!["work".to_string(), "travel".to_string()],
            ..Default::default()
        })
        .expect("list");
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].title, "b");

    let by_mood = store
        .list_logs(&LogFilter {
            mood: Some(Mood::Bad),
            ..Default::default()
        })
        .expect("list");
    assert_eq!(by_mood.len(), 1);

    let stats = store.mood_stats().expect("stats");
    assert_eq!(stats[0].mood, Mood::Good);
    assert_eq!(stats[0].count, 2);
    assert_eq!(stats[0].avg_energy, 7.0);
}

#[test]
fn journal_search_ranks_by_matched_terms() {
    let tmp = tempdir().expect("tempdir");
    let store = TrackerStore::open(&tmp.path().join("arc14.db")).expect("open store");
    let one = journal("Morning", "Quiet coffee", "personal", &[]);
    let both = journal("Coffee walk", "Morning by the river", "ideas", &["walk"]);
    let none = journal("Budget", "Numbers", "work", &[]);
    for j in [&one, &both, &none] {
        store.insert_journal(j).expect("insert");
    }

    let hits = store
        .list_journals(&JournalFilter {
            search: Some("COFFEE morning".to_string()),
            ..Default::default()
        })
        .expect("search");
    assert_eq!(hits.len(), 2);

    let single = store
        .list_journals(&JournalFilter {
            search: Some("river".to_string()),
            ..Default::default()
        })
        .expect("search");
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].id, both.id);

    let work = store
        .list_journals(&JournalFilter {
            category: Some(JournalCategory::Work),
            ..Default::default()
        })
        .expect("filter");
    assert_eq!(work.len(), 1);

    let counts = store.journal_category_counts().expect("counts");
    assert_eq!(counts.len(), 3);
    assert!(counts.iter().all(|c| c.count == 1));
}

#[test]
fn arc_cycles_filter_and_count_by_status() {
    let tmp = tempdir().expect("tempdir");
    let store = TrackerStore::open(&tmp.path().join("arc14.db")).expect("open store");
    for (title, status) in [("a", "active"), ("b", "active"), ("c", "completed")] {
        let cycle = NewArcCycle {
            title: Some(title.to_string()),
            action: Some("did it".to_string()),
            status: Some(status.to_string()),
            ..Default::default()
        }
        .into_cycle(Utc::now())
        .expect("valid cycle");
        store.insert_arc_cycle(&cycle).expect("insert");
    }

    let active = store
        .list_arc_cycles(&ArcFilter {
            status: Some(ArcStatus::Active),
            ..Default::default()
        })
        .expect("list");
    assert_eq!(active.len(), 2);

    let counts = store.arc_status_counts().expect("counts");
    assert_eq!(counts[0].status, ArcStatus::Active);
    assert_eq!(counts[0].count, 2);

    let gone = active[0].clone();
    assert!(store.delete_arc_cycle(&gone.id).expect("delete"));
    assert!(!store.save_arc_cycle(&gone).expect("save after delete"));
}

#[test]
fn backup_and_restore_round_trip() {
    let tmp = tempdir().expect("tempdir");
    let db = tmp.path().join("arc14.db");
    let backup = tmp.path().join("backups").join("snapshot.db");
    let mut store = TrackerStore::open(&db).expect("open store");
    store
        .insert_journal(&journal("Kept", "in backup", "personal", &[]))
        .expect("insert");
    store.backup_to(&backup).expect("backup");
    assert!(store.backup_to(&backup).is_err());

    store
        .insert_journal(&journal("Lost", "after backup", "personal", &[]))
        .expect("insert");
    assert_eq!(store.counts().expect("counts").journals, 2);

    store.restore_from(&backup).expect("restore");
    let journals = store
        .list_journals(&JournalFilter::default())
        .expect("list");
    assert_eq!(journals.len(), 1);
    assert_eq!(journals[0].title, "Kept");
}
