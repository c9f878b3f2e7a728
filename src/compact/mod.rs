//! Order, reduce and size-bound the task list for the display webhook.
//!
//! The webhook rejects bodies at or above a fixed byte ceiling, so the list is
//! measured as the exact request body that will be posted (timestamp and
//! filter label included) and trimmed from the tail until it fits.

pub mod due;

use crate::config::UndatedPolicy;
use crate::tasks::TaskRecord;
use crate::utils::text::truncate_with_ellipsis;
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;

/// Smallest ceiling that still leaves room for the envelope and one entry.
pub const MIN_SIZE_CEILING: usize = 128;
pub const DEFAULT_SIZE_CEILING: usize = 2048;

const NO_PROJECT_LABEL: &str = "#NoProject";

#[derive(Debug, thiserror::Error)]
#[error("size ceiling must be at least {MIN_SIZE_CEILING} bytes, got {0}")]
pub struct CeilingTooSmall(pub usize);

/// Exclusive upper bound on the serialized body length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeCeiling(usize);

impl SizeCeiling {
    pub fn new(bytes: usize) -> Result<Self, CeilingTooSmall> {
        if bytes < MIN_SIZE_CEILING {
            return Err(CeilingTooSmall(bytes));
        }
        Ok(Self(bytes))
    }

    pub fn bytes(self) -> usize {
        self.0
    }

    pub fn admits(self, len: usize) -> bool {
        len < self.0
    }
}

impl Default for SizeCeiling {
    fn default() -> Self {
        Self(DEFAULT_SIZE_CEILING)
    }
}

#[derive(Debug, Clone)]
pub struct CompactOptions {
    pub undated: UndatedPolicy,
    /// Filter label echoed to the display.
    pub filter: String,
}

/// One task as the display template sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskEntry {
    pub name: String,
    /// 1 is most urgent.
    pub prio: u8,
    pub due: String,
    pub proj: String,
}

#[derive(Serialize)]
struct Body<'a> {
    merge_variables: MergeVariables<'a>,
}

#[derive(Serialize)]
struct MergeVariables<'a> {
    tasks: &'a [TaskEntry],
    filter: &'a str,
    refreshed: i64,
}

fn body_len(tasks: &[TaskEntry], filter: &str, refreshed: i64) -> usize {
    let body = Body {
        merge_variables: MergeVariables {
            tasks,
            filter,
            refreshed,
        },
    };
    serde_json::to_vec(&body).map_or(usize::MAX, |bytes| bytes.len())
}

/// Webhook body ready to post. Serializes to exactly the bytes that were
/// measured against the ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactedPayload {
    tasks: Vec<TaskEntry>,
    filter: String,
    refreshed: i64,
    dropped: usize,
}

impl CompactedPayload {
    pub fn tasks(&self) -> &[TaskEntry] {
        &self.tasks
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Generation time, unix seconds.
    pub fn refreshed(&self) -> i64 {
        self.refreshed
    }

    /// Input tasks that did not make it into the payload.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn body_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn body_len(&self) -> usize {
        body_len(&self.tasks, &self.filter, self.refreshed)
    }
}

impl Serialize for CompactedPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Body {
            merge_variables: MergeVariables {
                tasks: &self.tasks,
                filter: &self.filter,
                refreshed: self.refreshed,
            },
        }
        .serialize(serializer)
    }
}

/// Build the largest payload whose body stays strictly under `ceiling`.
///
/// Never fails: in the worst case the payload carries no tasks. Output is a
/// pure function of the inputs and `now`.
pub fn compact(
    tasks: &[TaskRecord],
    ceiling: SizeCeiling,
    options: &CompactOptions,
    now: DateTime<Local>,
) -> CompactedPayload {
    let local_now = now.naive_local();
    let refreshed = now.timestamp();

    let entries: Vec<TaskEntry> = order_tasks(tasks, options.undated)
        .into_iter()
        .map(|task| reduce(task, local_now))
        .collect();

    let mut filter = options.filter.clone();
    if !ceiling.admits(body_len(&[], &filter, refreshed)) {
        tracing::warn!(
            ceiling = ceiling.bytes(),
            "Filter label does not fit under the size ceiling, omitting it"
        );
        filter.clear();
    }

    let fits = |slice: &[TaskEntry]| ceiling.admits(body_len(slice, &filter, refreshed));
    let kept = fit_entries(&entries, &fits, ceiling);

    let payload = CompactedPayload {
        dropped: entries.len() - kept.len(),
        tasks: kept,
        filter,
        refreshed,
    };
    tracing::info!(
        total = entries.len(),
        kept = payload.tasks.len(),
        dropped = payload.dropped,
        bytes = payload.body_len(),
        ceiling = ceiling.bytes(),
        "Compacted task list"
    );
    payload
}

/// Longest fitting prefix of `entries`. When the head does not fit even
/// alone, its title is truncated; a head that cannot fit at any title length
/// is dropped and the search restarts at the next entry.
fn fit_entries(
    entries: &[TaskEntry],
    fits: &impl Fn(&[TaskEntry]) -> bool,
    ceiling: SizeCeiling,
) -> Vec<TaskEntry> {
    let mut rest = entries;
    while let Some(head) = rest.first() {
        let keep = longest_fitting_prefix(rest.len(), |n| fits(&rest[..n]));
        if keep > 0 {
            return rest[..keep].to_vec();
        }

        if let Some(entry) = shrink_to_fit(head, fits) {
            tracing::warn!(
                ceiling = ceiling.bytes(),
                "Task exceeds the size ceiling on its own, truncating its title"
            );
            return vec![entry];
        }

        tracing::warn!(
            ceiling = ceiling.bytes(),
            "Task cannot fit under the size ceiling at any title length, dropping it"
        );
        rest = &rest[1..];
    }
    Vec::new()
}

/// Stable order: due ascending, undated per policy, then priority
/// descending, then input order.
pub fn order_tasks(tasks: &[TaskRecord], undated: UndatedPolicy) -> Vec<&TaskRecord> {
    let mut keyed: Vec<(Option<NaiveDateTime>, &TaskRecord)> = tasks
        .iter()
        .map(|task| (task.due_date().and_then(due::parse_due), task))
        .collect();

    keyed.sort_by(|(a_due, a), (b_due, b)| {
        compare_due(*a_due, *b_due, undated).then_with(|| b.priority.cmp(&a.priority))
    });

    keyed.into_iter().map(|(_, task)| task).collect()
}

fn compare_due(
    a: Option<NaiveDateTime>,
    b: Option<NaiveDateTime>,
    undated: UndatedPolicy,
) -> Ordering {
    let undated_first = undated == UndatedPolicy::First;
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (None, None) => Ordering::Equal,
        (None, Some(_)) if undated_first => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) if undated_first => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    }
}

fn reduce(task: &TaskRecord, now: NaiveDateTime) -> TaskEntry {
    TaskEntry {
        name: task.content.clone(),
        prio: 5_u8.saturating_sub(task.priority),
        due: due::due_label(task.due_date(), now),
        proj: task
            .project_name
            .as_deref()
            .map_or_else(|| NO_PROJECT_LABEL.to_string(), |name| format!("# {name}")),
    }
}

/// Largest `n` in `0..=len` with `fits(n)`, given `fits` is monotone
/// (true up to some point, false after) and `fits(0)` holds.
fn longest_fitting_prefix(len: usize, fits: impl Fn(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0, len);
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

/// Longest title truncation of `entry` that fits alone, if any.
fn shrink_to_fit(entry: &TaskEntry, fits: impl Fn(&[TaskEntry]) -> bool) -> Option<TaskEntry> {
    let title_chars = entry.name.chars().count();
    let candidate = |max_chars: usize| TaskEntry {
        name: truncate_with_ellipsis(&entry.name, max_chars),
        ..entry.clone()
    };

    let max_chars = longest_fitting_prefix(title_chars, |n| {
        n == 0 || fits(std::slice::from_ref(&candidate(n)))
    });
    let entry = candidate(max_chars);
    fits(std::slice::from_ref(&entry)).then_some(entry)
}
