// ABOUTME: Environment-based configuration for the scheduling engine
// ABOUTME: Collects OAuth, planning-service, database, and HTTP settings at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment-driven server configuration.

use crate::oauth::OAuthProviderConfig;
use crate::planning::PlanningConfig;
use anyhow::{Context, Result};
use std::env;

/// Default HTTP listen port
const DEFAULT_HTTP_PORT: u16 = 8080;

/// Complete server configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub database_url: String,
    /// HS256 secret for caller bearer tokens
    pub jwt_secret: String,
    pub oauth: OAuthProviderConfig,
    pub planning: PlanningConfig,
    /// Path to the service-principal JSON key file; planning is disabled
    /// when unset
    pub service_credential_path: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or malformed.
    pub fn from_env() -> Result<Self> {
        let http_port = match env::var("HTTP_PORT") {
            Ok(port) => port.parse().context("HTTP_PORT is not a valid port")?,
            Err(_) => DEFAULT_HTTP_PORT,
        };

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:cadence.db".to_owned());

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET not set")?;

        Ok(Self {
            http_port,
            database_url,
            jwt_secret,
            oauth: OAuthProviderConfig::from_env()?,
            planning: PlanningConfig::from_env(),
            service_credential_path: env::var("SERVICE_CREDENTIAL_PATH").ok(),
        })
    }

    /// One-line startup summary, with no secret material
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "port={} db={} planning_model={} planning_enabled={}",
            self.http_port,
            self.database_url,
            self.planning.model,
            self.service_credential_path.is_some()
        )
    }
}
