// ABOUTME: Calendar read routes - aggregated busy intervals and normalized events
// ABOUTME: Both fetch a valid delegated token before calling the provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Calendar read routes.

use super::ServerResources;
use crate::errors::{EngineError, EngineResult};
use crate::intervals::Interval;
use crate::models::Event;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use http::HeaderMap;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl RangeParams {
    fn validate(&self) -> EngineResult<()> {
        if self.end <= self.start {
            return Err(EngineError::InvalidInput(
                "end must come after start".to_owned(),
            ));
        }
        Ok(())
    }
}

pub fn routes() -> Router<Arc<ServerResources>> {
    Router::new()
        .route("/freebusy", get(freebusy_handler))
        .route("/events", get(events_handler))
}

/// Aggregated busy intervals across all of the caller's calendars
async fn freebusy_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Query(range): Query<RangeParams>,
) -> EngineResult<Json<Vec<Interval>>> {
    let user_id = resources.auth.authenticate(&headers)?;
    range.validate()?;

    let access_token = resources.gateway.valid_access_token(user_id).await?;
    let busy = resources
        .calendar
        .free_busy(&access_token, range.start, range.end)
        .await?;
    Ok(Json(busy))
}

/// Normalized event list for display
async fn events_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Query(range): Query<RangeParams>,
) -> EngineResult<Json<Vec<Event>>> {
    let user_id = resources.auth.authenticate(&headers)?;
    range.validate()?;

    let access_token = resources.gateway.valid_access_token(user_id).await?;
    let events = resources
        .calendar
        .events(&access_token, range.start, range.end)
        .await?;
    Ok(Json(events))
}
