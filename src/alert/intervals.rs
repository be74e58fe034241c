/// Unstable-interval extraction for chart annotation.
///
/// Turns the per-window pass/fail flags of a [`StabilityReport`] into closed
/// time spans during which a field failed its criterion. Nothing is reported
/// for the settling period right after the pump starts: intervals begin no
/// earlier than `purge_start + settle`.
///
/// # Lookahead
/// A status change is attributed to the timestamp of the window *before*
/// the first window showing the new status. The charts shade these spans
/// directly, so the convention must not drift.
///
/// # Clock injection
/// The purge start is an argument, in the same reference clock as the
/// canonical table, so extraction is deterministic in tests.

use crate::model::{Annotations, PURGE_SETTLE_MS, StabilityReport, UnstableInterval};

/// Unstable intervals per tested field, with the standard one-hour settle.
pub fn unstable_intervals(report: &StabilityReport, purge_start: i64) -> Annotations {
    unstable_intervals_after(report, purge_start, PURGE_SETTLE_MS)
}

/// Unstable intervals per tested field, ignoring the first `settle_ms` after
/// `purge_start`.
///
/// Every tested field gets an entry; it is empty when the field never fails
/// after the offset or when no window closes after the offset.
pub fn unstable_intervals_after(
    report: &StabilityReport,
    purge_start: i64,
    settle_ms: i64,
) -> Annotations {
    let offset = purge_start.saturating_add(settle_ms);
    let times = &report.datetime;
    let start_idx = times.iter().position(|&t| t >= offset);

    report
        .results
        .iter()
        .map(|(field, flags)| {
            let intervals = match start_idx {
                Some(i0) if flags.len() == times.len() => field_intervals(times, flags, i0, offset),
                _ => Vec::new(),
            };
            (field.clone(), intervals)
        })
        .collect()
}

fn field_intervals(times: &[i64], flags: &[bool], i0: usize, offset: i64) -> Vec<UnstableInterval> {
    let last = times.len() - 1;
    let mut intervals = Vec::new();
    let mut prev_time = offset;
    let mut prev_pass = flags[i0];

    for i in i0..times.len() {
        let time = times[i];
        let pass = flags[(i + 1).min(last)]; // offset by 1 step
        if pass != prev_pass {
            if !prev_pass {
                intervals.push(UnstableInterval {
                    start: prev_time,
                    end: time,
                });
            }
            prev_time = time;
            prev_pass = pass;
        }
    }

    if !prev_pass {
        intervals.push(UnstableInterval {
            start: prev_time,
            end: times[last],
        });
    }

    intervals
}

// ---------------------------------------------------------------------------
// Readiness
// ---------------------------------------------------------------------------

/// When each tested field became stable for good.
///
/// `Some(t)`: the field has no unstable interval ending after `t` and passes
/// through the end of the log; `t` is the end of its last unstable interval,
/// or the settle offset if it never failed. `None`: the field is still
/// unstable at the end of the log, or no window closed after the offset.
pub fn stabilized_at(
    report: &StabilityReport,
    purge_start: i64,
    settle_ms: i64,
) -> Vec<(String, Option<i64>)> {
    let offset = purge_start.saturating_add(settle_ms);
    let last_time = report.datetime.last().copied();
    let reached_offset = last_time.is_some_and(|t| t >= offset);

    unstable_intervals_after(report, purge_start, settle_ms)
        .into_iter()
        .map(|(field, intervals)| {
            let stable_from = match intervals.last() {
                _ if !reached_offset => None,
                None => Some(offset),
                Some(last) if Some(last.end) == last_time && !ends_passing(report, &field) => None,
                Some(last) => Some(last.end),
            };
            (field, stable_from)
        })
        .collect()
}

fn ends_passing(report: &StabilityReport, field: &str) -> bool {
    report
        .results
        .get(field)
        .and_then(|flags| flags.last())
        .copied()
        .unwrap_or(false)
}

/// The earliest time at which every tested field is stable, or `None` if
/// any field has not stabilized by the end of the log.
pub fn ready_to_sample_at(report: &StabilityReport, purge_start: i64, settle_ms: i64) -> Option<i64> {
    let times = stabilized_at(report, purge_start, settle_ms);
    if times.is_empty() {
        return None;
    }
    times
        .into_iter()
        .map(|(_, t)| t)
        .collect::<Option<Vec<i64>>>()?
        .into_iter()
        .max()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
