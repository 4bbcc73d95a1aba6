// ABOUTME: HTTP route organization and shared server state
// ABOUTME: Assembles the axum router over the engine's services
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # HTTP Routes
//!
//! Thin axum handlers over the engine services. Handlers authenticate the
//! caller, parse input, and delegate; business logic lives in the service
//! and domain modules.

pub mod calendar;
pub mod health;
pub mod oauth;
pub mod plan;

use crate::auth::AuthManager;
use crate::calendar::CalendarClient;
use crate::database::Database;
use crate::oauth::OAuthGateway;
use crate::planning::PlanningClient;
use crate::schedule::SchedulingService;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared resources available to every request handler
pub struct ServerResources {
    pub database: Arc<Database>,
    pub auth: AuthManager,
    pub gateway: Arc<OAuthGateway>,
    pub calendar: Arc<CalendarClient>,
    pub scheduler: SchedulingService,
    /// Absent when no service credential is configured
    pub planner: Option<PlanningClient>,
}

/// Build the full application router
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(oauth::routes())
        .merge(calendar::routes())
        .merge(plan::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(resources)
}
