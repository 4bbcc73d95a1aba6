// ABOUTME: Expands a recurring weekly availability template into concrete UTC intervals
// ABOUTME: Handles timezone offsets, horizon clipping, and template validation
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Working-hours generation.
//!
//! Expands a weekly template (`"HH:MM"` local start/end on a set of
//! weekdays) into concrete UTC intervals over a horizon. Local time relates
//! to UTC through a fixed offset in minutes supplied by the client, so the
//! engine never needs a timezone database: `utc = local - offset`.

use crate::errors::{EngineError, EngineResult};
use crate::intervals::{self, Interval};
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Recurring weekly availability template.
///
/// `days` uses 0 = Sunday .. 6 = Saturday, matching the convention of the
/// mobile clients that supply it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyTemplate {
    pub start_local: String,
    pub end_local: String,
    pub days: Vec<u8>,
}

impl Default for WeeklyTemplate {
    fn default() -> Self {
        Self {
            start_local: "09:00".to_owned(),
            end_local: "17:00".to_owned(),
            days: vec![1, 2, 3, 4, 5],
        }
    }
}

fn parse_hhmm(value: &str) -> EngineResult<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| EngineError::InvalidInput(format!("invalid HH:MM time '{value}'")))
}

/// Expand `template` into ascending, horizon-clipped UTC intervals.
///
/// `tz_offset_minutes` is the client's offset from UTC (positive east of
/// Greenwich). Days outside the template and zero-length clipped results
/// are dropped.
///
/// # Errors
///
/// Returns `InvalidInput` when the template times do not parse, when the
/// local end does not come after the local start, or when a day index is
/// outside 0..=6.
pub fn generate(
    horizon_start: DateTime<Utc>,
    horizon_end: DateTime<Utc>,
    tz_offset_minutes: i32,
    template: &WeeklyTemplate,
) -> EngineResult<Vec<Interval>> {
    let start_local = parse_hhmm(&template.start_local)?;
    let end_local = parse_hhmm(&template.end_local)?;
    if end_local <= start_local {
        return Err(EngineError::InvalidInput(format!(
            "working-hours end '{}' must come after start '{}'",
            template.end_local, template.start_local
        )));
    }
    if let Some(bad) = template.days.iter().find(|d| **d > 6) {
        return Err(EngineError::InvalidInput(format!(
            "day index {bad} outside 0..=6"
        )));
    }

    let offset = Duration::minutes(i64::from(tz_offset_minutes));
    let bounds = Interval::new(horizon_start, horizon_end);

    // Walk calendar days in local time so weekday checks match the
    // client's clock, then shift each window back to UTC.
    let mut day = (horizon_start + offset).date_naive();
    let last_day = (horizon_end + offset).date_naive();

    let mut result = Vec::new();
    while day <= last_day {
        let weekday = day.weekday().num_days_from_sunday() as u8;
        if template.days.contains(&weekday) {
            let local_start = day.and_time(start_local);
            let local_end = day.and_time(end_local);
            let window = Interval::new(
                DateTime::from_naive_utc_and_offset(local_start - offset, Utc),
                DateTime::from_naive_utc_and_offset(local_end - offset, Utc),
            );
            if let Some(clipped) = intervals::clip(window, bounds) {
                result.push(clipped);
            }
        }
        day = day.succ_opt().ok_or_else(|| {
            EngineError::InvalidInput("horizon end is out of calendar range".to_owned())
        })?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    fn utc(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, hour, min, 0).unwrap()
    }

    #[test]
    fn default_template_covers_weekdays_in_utc() {
        // 2025-06-02 is a Monday
        let out = generate(utc(2, 0, 0), utc(7, 0, 0), 0, &WeeklyTemplate::default()).unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], Interval::new(utc(2, 9, 0), utc(2, 17, 0)));
        assert_eq!(out[4], Interval::new(utc(6, 9, 0), utc(6, 17, 0)));
        // Saturday the 7th is excluded
        assert!(out.iter().all(|iv| iv.start.day() != 7));
    }

    #[test]
    fn positive_offset_shifts_windows_earlier_in_utc() {
        // UTC+120: local 09:00 is 07:00 UTC
        let template = WeeklyTemplate {
            days: vec![1],
            ..WeeklyTemplate::default()
        };
        let out = generate(utc(2, 0, 0), utc(3, 0, 0), 120, &template).unwrap();
        assert_eq!(out, vec![Interval::new(utc(2, 7, 0), utc(2, 15, 0))]);
    }

    #[test]
    fn windows_are_clipped_to_horizon() {
        let out = generate(utc(2, 10, 0), utc(2, 16, 0), 0, &WeeklyTemplate::default()).unwrap();
        assert_eq!(out, vec![Interval::new(utc(2, 10, 0), utc(2, 16, 0))]);
    }

    #[test]
    fn fully_clipped_days_are_dropped() {
        // Horizon ends before Monday working hours begin
        let out = generate(utc(2, 0, 0), utc(2, 8, 0), 0, &WeeklyTemplate::default()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn inverted_template_is_rejected() {
        let template = WeeklyTemplate {
            start_local: "17:00".to_owned(),
            end_local: "09:00".to_owned(),
            days: vec![1],
        };
        let err = generate(utc(2, 0, 0), utc(7, 0, 0), 0, &template).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn malformed_time_is_rejected() {
        let template = WeeklyTemplate {
            start_local: "9am".to_owned(),
            ..WeeklyTemplate::default()
        };
        assert!(generate(utc(2, 0, 0), utc(7, 0, 0), 0, &template).is_err());
    }

    #[test]
    fn output_is_ascending() {
        let out = generate(utc(1, 0, 0), utc(30, 0, 0), -300, &WeeklyTemplate::default()).unwrap();
        assert!(out.windows(2).all(|w| w[0].end <= w[1].start));
    }
}
