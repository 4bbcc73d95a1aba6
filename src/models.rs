// ABOUTME: Core domain models for goals, tasks, sessions, and calendar accounts
// ABOUTME: Shared row and wire types used across the scheduling engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain models shared across the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored delegated-calendar credential, one row per (user, provider).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarAccount {
    pub user_id: Uuid,
    pub provider: String,
    /// Email of the delegated account, when the provider disclosed it
    pub email: Option<String>,
    pub access_token: String,
    /// Absent when the provider never issued one; such accounts cannot
    /// silently refresh and their API calls will fail once the access
    /// token expires.
    pub refresh_token: Option<String>,
    pub token_expiry: DateTime<Utc>,
    /// Space-separated granted scopes, as returned by the provider
    pub scopes: String,
    pub updated_at: DateTime<Utc>,
}

/// Goal lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Abandoned,
}

impl GoalStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

/// A goal groups tasks; it is the unit of commit together with its tasks
/// and their sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub target_date: Option<DateTime<Utc>>,
    #[serde(default = "default_goal_status")]
    pub status: GoalStatus,
}

const fn default_goal_status() -> GoalStatus {
    GoalStatus::Active
}

/// An estimated-duration unit of work owned by a goal.
///
/// `id` is ephemeral (assigned by the caller or the planning service) and is
/// not the persisted identifier; the committer maps sessions back to
/// persisted tasks by title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub notes: String,
    pub duration_minutes: i64,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub earliest_start: Option<DateTime<Utc>>,
    /// Advisory ordering metadata; placement honors the caller-supplied
    /// task order and does not topologically sort on this field.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub session_min_minutes: Option<i64>,
    #[serde(default)]
    pub session_max_minutes: Option<i64>,
    /// Accepted as metadata; the greedy placer always splits across windows.
    #[serde(default = "default_allow_splitting")]
    pub allow_splitting: bool,
    #[serde(default)]
    pub priority: i32,
}

const fn default_allow_splitting() -> bool {
    true
}

/// One contiguous scheduled block assigned to a single task. A task may own
/// several sessions when its total duration exceeds any single free window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledSession {
    /// Title of the owning task; resolved to the persisted task id at commit
    pub task_title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A goal plus its tasks in placement order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInput {
    pub goal: Goal,
    pub tasks: Vec<Task>,
}

/// A normalized calendar event, used for display rather than scheduling math
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub calendar_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}
