use chrono::{DateTime, Local, TimeZone};

use taskpush::compact::{self, CompactOptions, MIN_SIZE_CEILING, SizeCeiling};
use taskpush::config::UndatedPolicy;
use taskpush::tasks::TaskRecord;

use super::harness::task;

fn now() -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap()
}

fn options() -> CompactOptions {
    CompactOptions {
        undated: UndatedPolicy::Last,
        filter: "today | overdue".into(),
    }
}

/// `n` tasks whose reduced entries are roughly 80 bytes each.
fn sized_tasks(n: usize) -> Vec<TaskRecord> {
    (0..n)
        .map(|i| {
            task(
                &i.to_string(),
                &format!("Task number {i:03} with a moderately long title"),
                Some("2026-03-10"),
                1,
            )
        })
        .collect()
}

#[test]
fn body_stays_strictly_under_every_ceiling() {
    for ceiling in [MIN_SIZE_CEILING, 200, 256, 512, 1000, 2048, 4096] {
        let ceiling = SizeCeiling::new(ceiling).unwrap();
        for n in [0, 1, 2, 5, 10, 25, 50, 120] {
            let payload = compact::compact(&sized_tasks(n), ceiling, &options(), now());
            let body = payload.body_bytes().unwrap();
            assert!(
                body.len() < ceiling.bytes(),
                "n={n} ceiling={} body={}",
                ceiling.bytes(),
                body.len()
            );
            assert_eq!(payload.tasks().len() + payload.dropped(), n);
        }
    }
}

#[test]
fn fifty_tasks_trim_to_maximal_prefix() {
    let tasks = sized_tasks(50);
    let ceiling = SizeCeiling::default();

    let payload = compact::compact(&tasks, ceiling, &options(), now());
    let kept = payload.tasks().len();

    assert!(kept > 0 && kept < 50, "kept {kept}");
    assert!(payload.body_len() < 2048);
    assert_eq!(payload.tasks()[0].name, tasks[0].content);

    // One more task would have crossed the ceiling.
    let one_more = compact::compact(&tasks[..=kept], ceiling, &options(), now());
    assert_eq!(one_more.tasks().len(), kept);
    assert_eq!(one_more.dropped(), 1);
}

#[test]
fn zero_tasks_yield_empty_valid_payload() {
    let payload = compact::compact(&[], SizeCeiling::default(), &options(), now());
    let value: serde_json::Value = serde_json::from_slice(&payload.body_bytes().unwrap()).unwrap();

    assert_eq!(value["merge_variables"]["tasks"], serde_json::json!([]));
    assert_eq!(value["merge_variables"]["filter"], "today | overdue");
    assert_eq!(payload.dropped(), 0);
}

#[test]
fn same_inputs_same_payload() {
    let tasks = sized_tasks(40);
    let a = compact::compact(&tasks, SizeCeiling::default(), &options(), now());
    let b = compact::compact(&tasks, SizeCeiling::default(), &options(), now());
    assert_eq!(a, b);
    assert_eq!(a.body_bytes().unwrap(), b.body_bytes().unwrap());
}

#[test]
fn overdue_first_undated_last_priority_breaks_ties() {
    let tasks = vec![
        task("undated", "Someday", None, 4),
        task("today-low", "Today low", Some("2026-03-10"), 1),
        task("overdue", "Overdue", Some("2026-03-07"), 1),
        task("today-high", "Today high", Some("2026-03-10"), 4),
        task("later", "Later today", Some("2026-03-10T17:00:00"), 2),
    ];

    let payload = compact::compact(&tasks, SizeCeiling::default(), &options(), now());
    let names: Vec<_> = payload.tasks().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Overdue", "Today high", "Today low", "Later today", "Someday"]
    );

    let entries = payload.tasks();
    assert_eq!(entries[0].due, "3d ago");
    assert_eq!(entries[1].due, "today");
    assert_eq!(entries[1].prio, 1);
    assert_eq!(entries[2].prio, 4);
    assert_eq!(entries[3].due, "in 7h");
    assert_eq!(entries[4].due, "no date");
    assert_eq!(entries[0].proj, "# Home");
}

#[test]
fn undated_first_policy_is_honoured() {
    let tasks = vec![
        task("dated", "Dated", Some("2026-03-10"), 4),
        task("undated", "Undated", None, 1),
    ];
    let opts = CompactOptions {
        undated: UndatedPolicy::First,
        ..options()
    };

    let payload = compact::compact(&tasks, SizeCeiling::default(), &opts, now());
    assert_eq!(payload.tasks()[0].name, "Undated");
}

#[test]
fn trimming_drops_from_the_tail() {
    let mut tasks = sized_tasks(60);
    tasks[59].priority = 4;
    tasks[59].due = None;

    let payload = compact::compact(&tasks, SizeCeiling::default(), &options(), now());
    assert!(payload.tasks().iter().all(|t| t.name != tasks[59].content));
    assert_eq!(payload.tasks()[0].name, tasks[0].content);
}
