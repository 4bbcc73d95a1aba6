// ABOUTME: Health check route for service monitoring
// ABOUTME: Liveness endpoint for load balancers and uptime checks
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::ServerResources;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

pub fn routes() -> Router<Arc<ServerResources>> {
    async fn health_handler() -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }

    Router::new().route("/health", get(health_handler))
}
