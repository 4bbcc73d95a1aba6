// ABOUTME: Delegated OAuth gateway - consent URLs, code exchange, and token refresh
// ABOUTME: Keeps the token vault current and degrades tolerantly when refresh fails
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The delegated OAuth gateway.
//!
//! Flow: `start` builds the consent URL with `access_type=offline` and
//! `prompt=consent`; `handle_callback` validates the state, exchanges the
//! code, and upserts the vault row; `valid_access_token` serves tokens from
//! the vault, refreshing when expiry is near. A failed refresh returns the
//! existing token and lets the downstream provider call fail naturally
//! instead of aborting the request early.

use super::state::OAuthState;
use crate::database::calendar_accounts::CalendarAccountUpsert;
use crate::database::Database;
use crate::errors::{EngineError, EngineResult};
use crate::models::CalendarAccount;
use anyhow::Result;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Provider identifier stored in the vault
pub const PROVIDER_NAME: &str = "google";

/// Refresh when the stored token expires within this window
const EXPIRY_SKEW_SECS: i64 = 60;

/// Scopes requested at consent: calendar reads plus the delegated email
const REQUESTED_SCOPES: &str =
    "https://www.googleapis.com/auth/calendar.readonly https://www.googleapis.com/auth/userinfo.email";

/// Outbound HTTP timeout
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Provider endpoint and client configuration
#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl OAuthProviderConfig {
    /// Build from environment variables with Google endpoint defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `GOOGLE_CLIENT_ID` or `GOOGLE_CLIENT_SECRET`
    /// is not set.
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID")
            .map_err(|_| anyhow::anyhow!("GOOGLE_CLIENT_ID not set"))?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET")
            .map_err(|_| anyhow::anyhow!("GOOGLE_CLIENT_SECRET not set"))?;
        let redirect_uri = std::env::var("GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:8080/callback".to_owned());

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_owned(),
            token_url: "https://oauth2.googleapis.com/token".to_owned(),
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_owned(),
        })
    }
}

/// Token endpoint response for both the code and refresh grants.
///
/// `refresh_token` is commonly absent on refresh responses and may be
/// absent even on first consent; both cases are tolerated.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserinfoResponse {
    email: Option<String>,
}

/// Result of a completed callback
#[derive(Debug)]
pub struct CallbackOutcome {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub return_to: Option<String>,
}

/// Drives the user-consent OAuth2 flow against the calendar provider
pub struct OAuthGateway {
    config: OAuthProviderConfig,
    database: Arc<Database>,
    client: reqwest::Client,
}

impl OAuthGateway {
    /// Create a gateway over the shared token vault.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: OAuthProviderConfig, database: Arc<Database>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            config,
            database,
            client,
        })
    }

    /// Build the provider authorization URL for `user_id`.
    ///
    /// `access_type=offline` and `prompt=consent` ask the provider for a
    /// refresh token; a provider may still decline to issue one.
    #[must_use]
    pub fn authorization_url(&self, user_id: Uuid, return_to: Option<String>) -> String {
        let state = OAuthState::new(user_id, return_to);
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            self.config.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(REQUESTED_SCOPES),
            urlencoding::encode(&state.encode())
        )
    }

    /// Complete the consent flow: validate state, exchange the code, and
    /// upsert the calendar account.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` before any network call when the state does
    /// not decode, and `ProviderUnavailable` when the token exchange
    /// fails.
    pub async fn handle_callback(&self, code: &str, raw_state: &str) -> EngineResult<CallbackOutcome> {
        let state = OAuthState::decode(raw_state)?;

        let token = self
            .exchange(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        if token.refresh_token.is_none() {
            // Tolerated: the account simply cannot refresh silently later
            warn!(user_id = %state.uid, "provider issued no refresh token on consent");
        }

        let email = self.fetch_delegated_email(&token.access_token).await;

        self.database
            .upsert_calendar_account(&CalendarAccountUpsert {
                user_id: state.uid,
                provider: PROVIDER_NAME,
                email: email.as_deref(),
                access_token: &token.access_token,
                refresh_token: token.refresh_token.as_deref(),
                token_expiry: Utc::now() + Duration::seconds(token.expires_in),
                scopes: token.scope.as_deref().unwrap_or(REQUESTED_SCOPES),
            })
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;

        info!(user_id = %state.uid, "calendar connected");

        Ok(CallbackOutcome {
            user_id: state.uid,
            email,
            return_to: state.return_to,
        })
    }

    /// Return a delegated access token for `user_id`, refreshing it first
    /// when it expires within the skew window.
    ///
    /// A token that is not near expiry is returned without any network
    /// call. When refresh fails, the stored token is returned as-is and
    /// the downstream provider call is left to fail naturally.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` when the user has no stored account.
    pub async fn valid_access_token(&self, user_id: Uuid) -> EngineResult<String> {
        let account = self.load_account(user_id).await?;

        let refresh_after = account.token_expiry - Duration::seconds(EXPIRY_SKEW_SECS);
        if Utc::now() <= refresh_after {
            return Ok(account.access_token);
        }

        let Some(refresh_token) = account.refresh_token.as_deref() else {
            warn!(%user_id, "token expiring and no refresh token stored");
            return Ok(account.access_token);
        };

        match self.refresh(user_id, refresh_token, &account).await {
            Ok(access_token) => Ok(access_token),
            Err(err) => {
                warn!(%user_id, "token refresh failed, using stored token: {err}");
                Ok(account.access_token)
            }
        }
    }

    /// Connection status for `user_id`, used by the status endpoint
    ///
    /// # Errors
    ///
    /// Returns `Database` when the vault query fails.
    pub async fn connection(&self, user_id: Uuid) -> EngineResult<Option<CalendarAccount>> {
        self.database
            .get_calendar_account(user_id, PROVIDER_NAME)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }

    async fn load_account(&self, user_id: Uuid) -> EngineResult<CalendarAccount> {
        self.database
            .get_calendar_account(user_id, PROVIDER_NAME)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?
            .ok_or(EngineError::NotConnected)
    }

    async fn refresh(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        account: &CalendarAccount,
    ) -> EngineResult<String> {
        let token = self
            .exchange(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        // Full record updates atomically; a refresh response without a new
        // refresh token preserves the stored one.
        self.database
            .upsert_calendar_account(&CalendarAccountUpsert {
                user_id,
                provider: PROVIDER_NAME,
                email: account.email.as_deref(),
                access_token: &token.access_token,
                refresh_token: token.refresh_token.as_deref(),
                token_expiry: Utc::now() + Duration::seconds(token.expires_in),
                scopes: token.scope.as_deref().unwrap_or(&account.scopes),
            })
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;

        info!(%user_id, "delegated token refreshed");
        Ok(token.access_token)
    }

    async fn exchange(&self, params: &[(&str, &str)]) -> EngineResult<TokenResponse> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| EngineError::ProviderUnavailable(format!("token endpoint: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::ProviderUnavailable(format!("token endpoint: {e}")))?;

        if !status.is_success() {
            return Err(EngineError::ProviderUnavailable(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| EngineError::ProviderUnavailable(format!("token response parse: {e}")))
    }

    /// Best-effort lookup of the delegated account's email; never fatal
    async fn fetch_delegated_email(&self, access_token: &str) -> Option<String> {
        let response = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            warn!("userinfo lookup returned {}", response.status());
            return None;
        }
        response
            .json::<UserinfoResponse>()
            .await
            .ok()
            .and_then(|u| u.email)
    }
}
