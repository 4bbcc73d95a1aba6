// ABOUTME: Greedy placement of task sessions into free time windows
// ABOUTME: Consumes windows from the front, splitting tasks across windows as needed
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session placement.
//!
//! Places each task, in the order supplied by the caller, into the free
//! windows by consuming window time from the front. The shrunk window list
//! is carried from one task to the next, which is what guarantees that no
//! two sessions in one placement batch overlap. A task that does not fit
//! aborts the whole batch; the engine never returns a partial schedule.

use crate::errors::{EngineError, EngineResult};
use crate::intervals::Interval;
use crate::models::{ScheduledSession, Task};
use chrono::Duration;

/// Hard floor for a single session, minutes
const SESSION_FLOOR_MINUTES: i64 = 15;

/// Default single-session bounds, minutes
const DEFAULT_SESSION_MIN_MINUTES: i64 = 30;
const DEFAULT_SESSION_MAX_MINUTES: i64 = 90;

/// Effective per-session bounds for a task
fn session_bounds(task: &Task) -> (i64, i64) {
    let min = task
        .session_min_minutes
        .unwrap_or(DEFAULT_SESSION_MIN_MINUTES)
        .max(SESSION_FLOOR_MINUTES);
    let max = task
        .session_max_minutes
        .unwrap_or(DEFAULT_SESSION_MAX_MINUTES)
        .max(min);
    (min, max)
}

/// Place every task into the free windows, in order.
///
/// Windows are scanned in the order presented; each qualifying window
/// (size >= the task's session minimum) yields one session of
/// `min(session_max, remaining, window_size)` minutes at the window's
/// start, and the window shrinks by the placed duration. The final session
/// of a task may be shorter than the session minimum when it exhausts the
/// remaining duration.
///
/// # Errors
///
/// Returns `InsufficientCapacity` naming the first task that cannot be
/// fully placed. Tasks with a non-positive duration are rejected as
/// `InvalidInput`.
pub fn place_sessions(tasks: &[Task], free: &[Interval]) -> EngineResult<Vec<ScheduledSession>> {
    let mut windows: Vec<Interval> = free.iter().filter(|w| !w.is_empty()).copied().collect();
    let mut sessions = Vec::new();

    for task in tasks {
        if task.duration_minutes <= 0 {
            return Err(EngineError::InvalidInput(format!(
                "task '{}' has non-positive duration {}",
                task.title, task.duration_minutes
            )));
        }

        let (min, max) = session_bounds(task);
        let mut remaining = task.duration_minutes;

        for window in &mut windows {
            if remaining <= 0 {
                break;
            }
            let size = window.minutes();
            if size < min {
                continue;
            }
            let placed = max.min(remaining).min(size);
            let end = window.start + Duration::minutes(placed);
            sessions.push(ScheduledSession {
                task_title: task.title.clone(),
                start: window.start,
                end,
            });
            window.start = end;
            remaining -= placed;
        }

        if remaining > 0 {
            tracing::debug!(
                task = %task.title,
                remaining_minutes = remaining,
                "placement exhausted free windows"
            );
            return Err(EngineError::InsufficientCapacity {
                task: task.title.clone(),
                remaining_minutes: remaining,
            });
        }
    }

    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, hour, min, 0).unwrap()
    }

    fn iv(start: (u32, u32), end: (u32, u32)) -> Interval {
        Interval::new(at(start.0, start.1), at(end.0, end.1))
    }

    fn task(title: &str, duration: i64, min: Option<i64>, max: Option<i64>) -> Task {
        Task {
            id: None,
            title: title.to_owned(),
            notes: String::new(),
            duration_minutes: duration,
            due_at: None,
            earliest_start: None,
            dependencies: Vec::new(),
            session_min_minutes: min,
            session_max_minutes: max,
            allow_splitting: true,
            priority: 0,
        }
    }

    #[test]
    fn two_tasks_share_one_window_back_to_back() {
        // [09:00, 10:30) with two 45-minute tasks consumes the window exactly
        let free = vec![iv((9, 0), (10, 30))];
        let tasks = vec![
            task("A", 45, Some(30), Some(60)),
            task("B", 45, Some(30), Some(90)),
        ];
        let sessions = place_sessions(&tasks, &free).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!((sessions[0].start, sessions[0].end), (at(9, 0), at(9, 45)));
        assert_eq!((sessions[1].start, sessions[1].end), (at(9, 45), at(10, 30)));
    }

    #[test]
    fn third_task_in_full_batch_fails_and_names_itself() {
        let free = vec![iv((9, 0), (10, 30))];
        let tasks = vec![
            task("A", 45, Some(30), Some(60)),
            task("B", 45, Some(30), Some(90)),
            task("C", 30, None, None),
        ];
        let err = place_sessions(&tasks, &free).unwrap_err();
        match err {
            EngineError::InsufficientCapacity { task, remaining_minutes } => {
                assert_eq!(task, "C");
                assert_eq!(remaining_minutes, 30);
            }
            other => panic!("expected InsufficientCapacity, got {other:?}"),
        }
    }

    #[test]
    fn task_outgrowing_its_single_session_in_one_window_aborts() {
        // One window per task pass: a 60-minute task sees only the 45
        // minutes left after the first task and cannot finish.
        let free = vec![iv((9, 0), (10, 30))];
        let tasks = vec![
            task("A", 45, Some(30), Some(60)),
            task("B", 60, Some(30), Some(90)),
        ];
        let err = place_sessions(&tasks, &free).unwrap_err();
        match err {
            EngineError::InsufficientCapacity { task, remaining_minutes } => {
                assert_eq!(task, "B");
                assert_eq!(remaining_minutes, 15);
            }
            other => panic!("expected InsufficientCapacity, got {other:?}"),
        }
    }

    #[test]
    fn exact_fit_consumes_entire_window() {
        let free = vec![iv((9, 0), (10, 0))];
        let sessions = place_sessions(&[task("A", 60, Some(15), Some(90))], &free).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!((sessions[0].start, sessions[0].end), (at(9, 0), at(10, 0)));
    }

    #[test]
    fn one_minute_over_capacity_fails() {
        let free = vec![iv((9, 0), (10, 0))];
        let err = place_sessions(&[task("A", 61, Some(15), Some(90))], &free).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientCapacity { .. }));
    }

    #[test]
    fn long_task_splits_across_windows() {
        let free = vec![iv((9, 0), (10, 0)), iv((13, 0), (14, 0)), iv((15, 0), (16, 0))];
        let sessions = place_sessions(&[task("A", 150, Some(30), Some(60))], &free).unwrap();
        assert_eq!(sessions.len(), 3);
        // Final partial session may be shorter than the session minimum
        assert_eq!((sessions[2].start, sessions[2].end), (at(15, 0), at(15, 30)));
    }

    #[test]
    fn windows_below_session_minimum_are_skipped() {
        let free = vec![iv((9, 0), (9, 20)), iv((10, 0), (11, 0))];
        let sessions = place_sessions(&[task("A", 45, Some(30), Some(60))], &free).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].start, at(10, 0));
    }

    #[test]
    fn session_floor_overrides_tiny_minimum() {
        // Requested minimum of 5 is raised to the 15-minute floor
        let free = vec![iv((9, 0), (9, 10)), iv((10, 0), (11, 0))];
        let sessions = place_sessions(&[task("A", 20, Some(5), Some(60))], &free).unwrap();
        assert_eq!(sessions[0].start, at(10, 0));
    }

    #[test]
    fn max_is_raised_to_min_when_inverted() {
        // min 60, max 30: effective max becomes 60
        let free = vec![iv((9, 0), (11, 0))];
        let sessions = place_sessions(&[task("A", 60, Some(60), Some(30))], &free).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].end, at(10, 0));
    }

    #[test]
    fn sessions_across_tasks_never_overlap() {
        let free = vec![iv((9, 0), (12, 0)), iv((13, 0), (15, 0))];
        let tasks = vec![
            task("A", 120, None, None),
            task("B", 90, None, None),
            task("C", 60, None, None),
        ];
        let sessions = place_sessions(&tasks, &free).unwrap();
        for (i, a) in sessions.iter().enumerate() {
            for b in sessions.iter().skip(i + 1) {
                assert!(
                    a.end <= b.start || b.end <= a.start,
                    "{a:?} overlaps {b:?}"
                );
            }
        }
    }

    #[test]
    fn session_durations_respect_bounds_except_final_partial() {
        let free = vec![iv((9, 0), (11, 0)), iv((12, 0), (14, 0)), iv((15, 0), (17, 0))];
        let tasks = vec![task("A", 200, Some(30), Some(90))];
        let sessions = place_sessions(&tasks, &free).unwrap();
        let (last, rest) = sessions.split_last().unwrap();
        for s in rest {
            let mins = (s.end - s.start).num_minutes();
            assert!((30..=90).contains(&mins));
        }
        assert!((last.end - last.start).num_minutes() <= 90);
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        let free = vec![iv((9, 0), (17, 0))];
        assert!(matches!(
            place_sessions(&[task("A", 0, None, None)], &free),
            Err(EngineError::InvalidInput(_))
        ));
    }
}
