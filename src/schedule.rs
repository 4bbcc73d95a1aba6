// ABOUTME: Scheduling orchestration - free time computation, placement, and optional commit
// ABOUTME: Ties the gateway, aggregator, working-hours generator, and committer together
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Scheduling Service
//!
//! One scheduling request runs synchronously end to end: fetch a valid
//! delegated token, expand working hours over the horizon, subtract busy
//! intervals (provider plus any caller-supplied external busy windows),
//! place every task in order, and either return the proposed sessions
//! (dry run) or persist the whole plan (commit run).
//!
//! Busy subtraction always happens before any session is placed, and each
//! task's placement sees the windows consumed by all prior tasks in the
//! same request; that ordering is what prevents double-booking within one
//! planning call. Concurrent requests for the same user are not
//! serialized and can double-book; callers needing that guarantee must
//! serialize externally.

use crate::calendar::CalendarClient;
use crate::database::plans::CommittedPlan;
use crate::database::Database;
use crate::errors::{EngineError, EngineResult};
use crate::intervals::{self, Interval};
use crate::models::{PlanInput, ScheduledSession};
use crate::oauth::OAuthGateway;
use crate::placer;
use crate::working_hours::{self, WeeklyTemplate};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Default forward-looking scheduling window
const DEFAULT_HORIZON_DAYS: i64 = 42;

/// A fully resolved scheduling request
#[derive(Debug)]
pub struct ScheduleRequest {
    pub plan: PlanInput,
    /// Persist on success instead of returning a dry-run proposal
    pub commit: bool,
    /// Caller-supplied busy windows outside the connected calendars
    pub extra_busy: Vec<Interval>,
    pub template: WeeklyTemplate,
    pub tz_offset_minutes: i32,
    pub horizon_days: Option<i64>,
}

/// Result of a scheduling run
#[derive(Debug, serde::Serialize)]
pub struct ScheduleOutcome {
    pub sessions: Vec<ScheduledSession>,
    pub horizon_start: DateTime<Utc>,
    pub horizon_end: DateTime<Utc>,
    /// Present only on commit runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committed: Option<CommittedPlan>,
}

/// Orchestrates one scheduling request end to end
pub struct SchedulingService {
    gateway: Arc<OAuthGateway>,
    calendar: Arc<CalendarClient>,
    database: Arc<Database>,
}

impl SchedulingService {
    #[must_use]
    pub fn new(
        gateway: Arc<OAuthGateway>,
        calendar: Arc<CalendarClient>,
        database: Arc<Database>,
    ) -> Self {
        Self {
            gateway,
            calendar,
            database,
        }
    }

    /// Run a scheduling request for `user_id`.
    ///
    /// # Errors
    ///
    /// Propagates `NotConnected`, `ProviderUnavailable`, `InvalidInput`,
    /// `InsufficientCapacity` (naming the offending task), and, on commit
    /// runs only, `CommitFailure` after a valid schedule was produced.
    pub async fn run(
        &self,
        user_id: Uuid,
        request: ScheduleRequest,
    ) -> EngineResult<ScheduleOutcome> {
        if request.plan.tasks.is_empty() {
            return Err(EngineError::InvalidInput("plan has no tasks".to_owned()));
        }

        let horizon_days = request.horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS);
        if !(1..=366).contains(&horizon_days) {
            return Err(EngineError::InvalidInput(format!(
                "horizon of {horizon_days} days outside 1..=366"
            )));
        }
        let horizon_start = Utc::now();
        let horizon_end = horizon_start + Duration::days(horizon_days);

        let access_token = self.gateway.valid_access_token(user_id).await?;

        let working = working_hours::generate(
            horizon_start,
            horizon_end,
            request.tz_offset_minutes,
            &request.template,
        )?;

        let mut busy = self
            .calendar
            .free_busy(&access_token, horizon_start, horizon_end)
            .await?;
        busy.extend(request.extra_busy.iter().copied());
        let busy = intervals::merge(&busy);

        let free = intervals::subtract(&working, &busy);
        debug!(
            windows = working.len(),
            busy = busy.len(),
            free = free.len(),
            "computed free intervals"
        );

        let sessions = placer::place_sessions(&request.plan.tasks, &free)?;

        let committed = if request.commit {
            let plan = self
                .database
                .commit_plan(user_id, &request.plan.goal, &request.plan.tasks, &sessions)
                .await?;
            Some(plan)
        } else {
            None
        };

        info!(
            %user_id,
            sessions = sessions.len(),
            committed = committed.is_some(),
            "scheduling run complete"
        );

        Ok(ScheduleOutcome {
            sessions,
            horizon_start,
            horizon_end,
            committed,
        })
    }
}
