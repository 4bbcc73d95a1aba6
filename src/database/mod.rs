// ABOUTME: Database layer organizing persistent storage for the scheduling engine
// ABOUTME: Owns the connection pool and code-driven schema migrations
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Database Layer
//!
//! SQLite-backed storage for calendar accounts (the token vault) and
//! committed plans. All durable state lives here; request handlers are
//! stateless.

pub mod calendar_accounts;
pub mod plans;

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

/// Shared database handle
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to `database_url` and run migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or any migration fails.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        info!("database initialized: {database_url}");
        Ok(db)
    }

    /// Raw pool access, for repository methods and test assertions
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables and indexes
    async fn migrate(&self) -> Result<()> {
        self.migrate_calendar_accounts().await?;
        self.migrate_plans().await?;
        Ok(())
    }
}
