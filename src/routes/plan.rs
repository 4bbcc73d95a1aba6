// ABOUTME: Scheduling route - computes and optionally persists a session plan
// ABOUTME: Accepts an explicit plan or drafts one from a free-text prompt
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The scheduling endpoint.

use super::ServerResources;
use crate::errors::{EngineError, EngineResult};
use crate::intervals::Interval;
use crate::models::PlanInput;
use crate::schedule::{ScheduleOutcome, ScheduleRequest};
use crate::working_hours::WeeklyTemplate;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use http::HeaderMap;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    /// Explicit goal and task list, in placement order
    pub plan: Option<PlanInput>,
    /// Free-text goal description drafted through the planning service
    /// when no explicit plan is given
    pub prompt: Option<String>,
    #[serde(default)]
    pub commit: bool,
    /// Busy windows outside the connected calendars
    #[serde(default)]
    pub extra_busy: Vec<Interval>,
    pub template: Option<WeeklyTemplate>,
    #[serde(default)]
    pub tz_offset_minutes: i32,
    pub horizon_days: Option<i64>,
}

pub fn routes() -> Router<Arc<ServerResources>> {
    Router::new().route("/plan", post(plan_handler))
}

/// Compute (and optionally persist) a schedule for the caller
async fn plan_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<PlanRequest>,
) -> EngineResult<Json<ScheduleOutcome>> {
    let user_id = resources.auth.authenticate(&headers)?;

    let plan = match (request.plan, request.prompt) {
        (Some(plan), _) => plan,
        (None, Some(prompt)) => {
            let planner = resources.planner.as_ref().ok_or_else(|| {
                EngineError::InvalidInput(
                    "no plan supplied and the planning service is not configured".to_owned(),
                )
            })?;
            planner.draft_plan(&prompt).await?
        }
        (None, None) => {
            return Err(EngineError::InvalidInput(
                "request needs either a plan or a prompt".to_owned(),
            ))
        }
    };

    let outcome = resources
        .scheduler
        .run(
            user_id,
            ScheduleRequest {
                plan,
                commit: request.commit,
                extra_busy: request.extra_busy,
                template: request.template.unwrap_or_default(),
                tz_offset_minutes: request.tz_offset_minutes,
                horizon_days: request.horizon_days,
            },
        )
        .await?;

    Ok(Json(outcome))
}
