// ABOUTME: Free/busy aggregation across all of a user's calendars
// ABOUTME: Paginated calendar-list, batched free/busy query, and normalized event listing
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Free/Busy Aggregator
//!
//! Reads a user's calendars with a delegated access token: enumerates
//! calendar ids (paginating), fetches busy intervals with one batched
//! free/busy query, and lists expanded event instances for display.
//!
//! Any non-success provider response fails the whole request with
//! `ProviderUnavailable`. There is deliberately no empty-result fallback:
//! scheduling against an incomplete busy set would double-book real
//! events.

use crate::errors::{EngineError, EngineResult};
use crate::intervals::Interval;
use crate::models::Event;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Calendar id assumed when the account exposes no calendar list
const DEFAULT_CALENDAR_ID: &str = "primary";

/// Outbound HTTP timeout
const HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarListEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: std::collections::HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<FreeBusyEntry>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyEntry {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<EventItem>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
    #[serde(default)]
    location: Option<String>,
    #[serde(rename = "htmlLink")]
    html_link: Option<String>,
}

/// Either a timed instant or an all-day date
#[derive(Debug, Deserialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<DateTime<Utc>>,
    date: Option<chrono::NaiveDate>,
}

impl EventTime {
    /// All-day `date` entries normalize to midnight UTC
    fn resolve(&self) -> Option<(DateTime<Utc>, bool)> {
        if let Some(dt) = self.date_time {
            return Some((dt, false));
        }
        self.date.map(|d| {
            let midnight = d.and_hms_opt(0, 0, 0).unwrap_or_default();
            (DateTime::from_naive_utc_and_offset(midnight, Utc), true)
        })
    }
}

/// Read-only client over the provider's calendar API
pub struct CalendarClient {
    base_url: String,
    client: reqwest::Client,
}

impl CalendarClient {
    /// Create a client against the Google Calendar API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self> {
        Self::with_base_url("https://www.googleapis.com/calendar/v3")
    }

    /// Create a client against an explicit base URL (used by tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Enumerate the user's calendar ids, paginating until no continuation
    /// token remains. Falls back to the default calendar when the account
    /// exposes none; never returns an empty set.
    ///
    /// # Errors
    ///
    /// Returns `ProviderUnavailable` on any non-success response.
    pub async fn list_calendars(&self, access_token: &str) -> EngineResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(format!("{}/users/me/calendarList", self.base_url))
                .bearer_auth(access_token);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: CalendarListResponse = self.fetch("calendarList", request).await?;
            ids.extend(page.items.into_iter().map(|entry| entry.id));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        if ids.is_empty() {
            ids.push(DEFAULT_CALENDAR_ID.to_owned());
        }
        debug!(calendars = ids.len(), "enumerated calendars");
        Ok(ids)
    }

    /// Busy intervals across all calendars for `[start, end)`, flattened
    /// and unsorted. One batched query covers every calendar id.
    ///
    /// # Errors
    ///
    /// Returns `ProviderUnavailable` on any non-success response.
    pub async fn free_busy(
        &self,
        access_token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<Interval>> {
        let calendar_ids = self.list_calendars(access_token).await?;

        let body = json!({
            "timeMin": start.to_rfc3339(),
            "timeMax": end.to_rfc3339(),
            "items": calendar_ids.iter().map(|id| json!({"id": id})).collect::<Vec<_>>(),
        });

        let request = self
            .client
            .post(format!("{}/freeBusy", self.base_url))
            .bearer_auth(access_token)
            .json(&body);

        let response: FreeBusyResponse = self.fetch("freeBusy", request).await?;

        let busy: Vec<Interval> = response
            .calendars
            .into_values()
            .flat_map(|calendar| calendar.busy)
            .map(|entry| Interval::new(entry.start, entry.end))
            .collect();

        debug!(busy = busy.len(), "aggregated busy intervals");
        Ok(busy)
    }

    /// Detailed event instances per calendar over `[start, end)`, with
    /// recurring events expanded and all-day events normalized to
    /// midnight-to-midnight UTC ranges. Display data, not scheduling
    /// input.
    ///
    /// # Errors
    ///
    /// Returns `ProviderUnavailable` on any non-success response; a
    /// partially fetched result set is never returned.
    pub async fn events(
        &self,
        access_token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<Event>> {
        let calendar_ids = self.list_calendars(access_token).await?;
        let mut events = Vec::new();

        for calendar_id in &calendar_ids {
            let mut page_token: Option<String> = None;
            loop {
                let mut request = self
                    .client
                    .get(format!(
                        "{}/calendars/{}/events",
                        self.base_url,
                        urlencoding::encode(calendar_id)
                    ))
                    .bearer_auth(access_token)
                    .query(&[
                        ("timeMin", start.to_rfc3339()),
                        ("timeMax", end.to_rfc3339()),
                        ("singleEvents", "true".to_owned()),
                        ("orderBy", "startTime".to_owned()),
                    ]);
                if let Some(token) = &page_token {
                    request = request.query(&[("pageToken", token.as_str())]);
                }

                let page: EventsResponse = self.fetch("events", request).await?;
                for item in page.items {
                    if let Some(event) = normalize_event(calendar_id, item) {
                        events.push(event);
                    }
                }

                match page.next_page_token {
                    Some(token) => page_token = Some(token),
                    None => break,
                }
            }
        }

        Ok(events)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        what: &str,
        request: reqwest::RequestBuilder,
    ) -> EngineResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| EngineError::ProviderUnavailable(format!("{what}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::ProviderUnavailable(format!(
                "{what} returned {status}: {body}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| EngineError::ProviderUnavailable(format!("{what} parse: {e}")))
    }
}

/// Map a raw event item to the flat display record, skipping entries
/// without usable times (e.g. cancelled instances).
fn normalize_event(calendar_id: &str, item: EventItem) -> Option<Event> {
    let (start, all_day) = item.start.as_ref().and_then(EventTime::resolve)?;
    let end = match item.end.as_ref().and_then(EventTime::resolve) {
        Some((end, _)) => end,
        // All-day events without an explicit end span a single day
        None if all_day => start + Duration::days(1),
        None => return None,
    };

    Some(Event {
        id: item.id,
        calendar_id: calendar_id.to_owned(),
        title: item.summary.unwrap_or_default(),
        start,
        end,
        all_day,
        location: item.location,
        link: item.html_link,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_day_events_normalize_to_midnight_utc() {
        let item: EventItem = serde_json::from_value(json!({
            "id": "evt1",
            "summary": "Conference",
            "start": {"date": "2025-06-02"},
            "end": {"date": "2025-06-04"},
        }))
        .unwrap();
        let event = normalize_event("primary", item).unwrap();
        assert!(event.all_day);
        assert_eq!(event.start.to_rfc3339(), "2025-06-02T00:00:00+00:00");
        assert_eq!(event.end.to_rfc3339(), "2025-06-04T00:00:00+00:00");
    }

    #[test]
    fn timed_events_keep_their_instants() {
        let item: EventItem = serde_json::from_value(json!({
            "id": "evt2",
            "summary": "Standup",
            "start": {"dateTime": "2025-06-02T09:00:00Z"},
            "end": {"dateTime": "2025-06-02T09:15:00Z"},
            "htmlLink": "https://calendar.example/evt2",
        }))
        .unwrap();
        let event = normalize_event("work", item).unwrap();
        assert!(!event.all_day);
        assert_eq!(event.calendar_id, "work");
        assert_eq!((event.end - event.start).num_minutes(), 15);
        assert_eq!(event.link.as_deref(), Some("https://calendar.example/evt2"));
    }

    #[test]
    fn events_without_times_are_skipped() {
        let item: EventItem = serde_json::from_value(json!({"id": "evt3"})).unwrap();
        assert!(normalize_event("primary", item).is_none());
    }
}
