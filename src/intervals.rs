// ABOUTME: Pure interval algebra over half-open UTC time ranges
// ABOUTME: Subtraction, clipping, and merging used by the free-time computation
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interval algebra over half-open `[start, end)` UTC ranges.
//!
//! All operations discard degenerate intervals (`end <= start`) and are
//! deterministic. Subtraction is commutative over the order of the busy
//! set: each busy interval is applied iteratively against the accumulated
//! working list, so permuting the busy input cannot change the result.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` range in absolute time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// An interval with `end <= start` carries no time
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whole minutes contained in this interval
    #[must_use]
    pub fn minutes(&self) -> i64 {
        self.duration().num_minutes()
    }
}

/// Remove every busy interval from every free window.
///
/// Handles busy intervals that fully contain, are fully contained by, or
/// partially overlap a free window, and multiple busy intervals touching
/// the same window.
#[must_use]
pub fn subtract(free: &[Interval], busy: &[Interval]) -> Vec<Interval> {
    let mut result: Vec<Interval> = free.iter().filter(|f| !f.is_empty()).copied().collect();

    for b in busy.iter().filter(|b| !b.is_empty()) {
        let mut next = Vec::with_capacity(result.len() + 1);
        for f in &result {
            if b.end <= f.start || b.start >= f.end {
                // No overlap
                next.push(*f);
                continue;
            }
            let before = Interval::new(f.start, b.start);
            if !before.is_empty() {
                next.push(before);
            }
            let after = Interval::new(b.end, f.end);
            if !after.is_empty() {
                next.push(after);
            }
        }
        result = next;
    }

    result
}

/// Intersect an interval with bounds, returning `None` when nothing remains
#[must_use]
pub fn clip(interval: Interval, bounds: Interval) -> Option<Interval> {
    let clipped = Interval::new(
        interval.start.max(bounds.start),
        interval.end.min(bounds.end),
    );
    (!clipped.is_empty()).then_some(clipped)
}

/// Coalesce overlapping or adjacent intervals into a sorted minimal set
#[must_use]
pub fn merge(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = intervals.iter().filter(|i| !i.is_empty()).copied().collect();
    sorted.sort_by_key(|i| i.start);

    let mut result: Vec<Interval> = Vec::with_capacity(sorted.len());
    for iv in sorted {
        match result.last_mut() {
            Some(last) if iv.start <= last.end => {
                last.end = last.end.max(iv.end);
            }
            _ => result.push(iv),
        }
    }
    result
}
