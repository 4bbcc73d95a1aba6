// ABOUTME: Token vault - persisted per-user third-party OAuth credentials
// ABOUTME: Upsert keyed on (user, provider), preserving refresh tokens providers omit
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Calendar account storage (the token vault).
//!
//! One row per (user, provider). Rows are created on first consent and
//! overwritten idempotently on every refresh; the engine never deletes
//! them. Providers may omit `refresh_token` on refresh responses, so the
//! upsert keeps the prior value whenever the new one is absent.

use super::Database;
use crate::models::CalendarAccount;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

/// Field set for a token-vault upsert
pub struct CalendarAccountUpsert<'a> {
    pub user_id: Uuid,
    pub provider: &'a str,
    pub email: Option<&'a str>,
    pub access_token: &'a str,
    /// `None` leaves any previously stored refresh token in place
    pub refresh_token: Option<&'a str>,
    pub token_expiry: DateTime<Utc>,
    pub scopes: &'a str,
}

impl Database {
    pub(super) async fn migrate_calendar_accounts(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS calendar_accounts (
                user_id TEXT NOT NULL,
                provider TEXT NOT NULL,
                email TEXT,
                access_token TEXT NOT NULL,
                refresh_token TEXT,
                token_expiry DATETIME NOT NULL,
                scopes TEXT NOT NULL DEFAULT '',
                updated_at DATETIME NOT NULL,
                PRIMARY KEY (user_id, provider)
            )
            ",
        )
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Upsert a calendar account keyed by (user, provider).
    ///
    /// The whole token record updates atomically; an absent
    /// `refresh_token` preserves the stored one rather than nulling it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn upsert_calendar_account(&self, upsert: &CalendarAccountUpsert<'_>) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO calendar_accounts (
                user_id, provider, email, access_token, refresh_token,
                token_expiry, scopes, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, provider)
            DO UPDATE SET
                email = COALESCE(excluded.email, calendar_accounts.email),
                access_token = excluded.access_token,
                refresh_token = COALESCE(excluded.refresh_token, calendar_accounts.refresh_token),
                token_expiry = excluded.token_expiry,
                scopes = excluded.scopes,
                updated_at = excluded.updated_at
            ",
        )
        .bind(upsert.user_id.to_string())
        .bind(upsert.provider)
        .bind(upsert.email)
        .bind(upsert.access_token)
        .bind(upsert.refresh_token)
        .bind(upsert.token_expiry)
        .bind(upsert.scopes)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Load the stored account for (user, provider), if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed.
    pub async fn get_calendar_account(
        &self,
        user_id: Uuid,
        provider: &str,
    ) -> Result<Option<CalendarAccount>> {
        let row = sqlx::query(
            r"
            SELECT user_id, provider, email, access_token, refresh_token,
                   token_expiry, scopes, updated_at
            FROM calendar_accounts
            WHERE user_id = $1 AND provider = $2
            ",
        )
        .bind(user_id.to_string())
        .bind(provider)
        .fetch_optional(self.pool())
        .await?;

        row.map(|row| {
            let user_id: String = row.try_get("user_id")?;
            Ok(CalendarAccount {
                user_id: Uuid::parse_str(&user_id)?,
                provider: row.try_get("provider")?,
                email: row.try_get("email")?,
                access_token: row.try_get("access_token")?,
                refresh_token: row.try_get("refresh_token")?,
                token_expiry: row.try_get("token_expiry")?,
                scopes: row.try_get("scopes")?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .transpose()
    }
}
