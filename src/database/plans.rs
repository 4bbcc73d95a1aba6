// ABOUTME: Plan committer - atomic persistence of a goal, its tasks, and their sessions
// ABOUTME: Single transaction so a failed insert never leaves an orphaned goal
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plan persistence.
//!
//! A goal, its tasks, and the placed sessions commit as one unit inside a
//! single transaction. Session rows reference the generated task ids;
//! since the placer only knows tasks by their ephemeral input ids, the
//! mapping is done by task title while the transaction is open. Any
//! failure rolls the whole plan back and surfaces as `CommitFailure`,
//! distinct from placement failure: the schedule was valid, just not
//! saved.

use super::Database;
use crate::errors::{EngineError, EngineResult};
use crate::models::{Goal, ScheduledSession, Task};
use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

/// Identifier of a committed plan
#[derive(Debug, Clone, serde::Serialize)]
pub struct CommittedPlan {
    pub goal_id: Uuid,
    pub task_ids: Vec<Uuid>,
    pub session_count: usize,
}

impl Database {
    pub(super) async fn migrate_plans(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS goals (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                target_date DATETIME,
                status TEXT NOT NULL DEFAULT 'active',
                created_at DATETIME NOT NULL
            )
            ",
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                goal_id TEXT NOT NULL REFERENCES goals(id),
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                due_at DATETIME,
                duration_minutes INTEGER NOT NULL,
                seq INTEGER NOT NULL
            )
            ",
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS task_sessions (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL REFERENCES tasks(id),
                user_id TEXT NOT NULL,
                start_at DATETIME NOT NULL,
                end_at DATETIME NOT NULL
            )
            ",
        )
        .execute(self.pool())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_goal ON tasks(goal_id)")
            .execute(self.pool())
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_task_sessions_task ON task_sessions(task_id)")
            .execute(self.pool())
            .await?;

        Ok(())
    }

    /// Persist a goal, its tasks (in placement order), and all sessions
    /// atomically.
    ///
    /// # Errors
    ///
    /// Returns `CommitFailure` if any insert fails (the transaction rolls
    /// back) or if a session references a task title that is not in the
    /// task list.
    pub async fn commit_plan(
        &self,
        user_id: Uuid,
        goal: &Goal,
        tasks: &[Task],
        sessions: &[ScheduledSession],
    ) -> EngineResult<CommittedPlan> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| EngineError::CommitFailure(e.to_string()))?;

        let goal_id = Uuid::new_v4();
        sqlx::query(
            r"
            INSERT INTO goals (id, user_id, title, description, target_date, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(goal_id.to_string())
        .bind(user_id.to_string())
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(goal.target_date)
        .bind(goal.status.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::CommitFailure(format!("goal insert: {e}")))?;

        let mut task_ids = Vec::with_capacity(tasks.len());
        let mut ids_by_title: HashMap<&str, Uuid> = HashMap::with_capacity(tasks.len());
        for (seq, task) in tasks.iter().enumerate() {
            let task_id = Uuid::new_v4();
            sqlx::query(
                r"
                INSERT INTO tasks (id, goal_id, user_id, title, notes, due_at, duration_minutes, seq)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(task_id.to_string())
            .bind(goal_id.to_string())
            .bind(user_id.to_string())
            .bind(&task.title)
            .bind(&task.notes)
            .bind(task.due_at)
            .bind(task.duration_minutes)
            .bind(seq as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| EngineError::CommitFailure(format!("task insert: {e}")))?;

            task_ids.push(task_id);
            ids_by_title.insert(task.title.as_str(), task_id);
        }

        for session in sessions {
            let task_id = ids_by_title.get(session.task_title.as_str()).ok_or_else(|| {
                EngineError::CommitFailure(format!(
                    "session references unknown task '{}'",
                    session.task_title
                ))
            })?;
            sqlx::query(
                r"
                INSERT INTO task_sessions (id, task_id, user_id, start_at, end_at)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(task_id.to_string())
            .bind(user_id.to_string())
            .bind(session.start)
            .bind(session.end)
            .execute(&mut *tx)
            .await
            .map_err(|e| EngineError::CommitFailure(format!("session insert: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| EngineError::CommitFailure(e.to_string()))?;

        tracing::info!(
            %goal_id,
            tasks = task_ids.len(),
            sessions = sessions.len(),
            "plan committed"
        );

        Ok(CommittedPlan {
            goal_id,
            task_ids,
            session_count: sessions.len(),
        })
    }
}
