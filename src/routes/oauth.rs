// ABOUTME: OAuth route handlers - consent start, provider callback, connection status
// ABOUTME: The callback is the only endpoint authenticated by OAuth state instead of a bearer
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delegated OAuth routes.

use super::ServerResources;
use crate::errors::{EngineError, EngineResult};
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct StartParams {
    /// Bearer token alternative for redirect-initiated requests
    token: Option<String>,
    /// Where to send the user after the callback completes
    return_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    /// Set by the provider when the user denies consent
    error: Option<String>,
}

/// Connection status for the caller's calendar account
#[derive(Debug, Serialize)]
pub struct ConnectionStatus {
    pub provider: String,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<String>,
}

pub fn routes() -> Router<Arc<ServerResources>> {
    Router::new()
        .route("/oauth/start", get(start_handler))
        .route("/oauth/status", get(status_handler))
        .route("/callback", get(callback_handler))
}

/// Begin delegated authorization: redirect the caller to the provider's
/// consent page.
async fn start_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Query(params): Query<StartParams>,
) -> EngineResult<Redirect> {
    let user_id = resources
        .auth
        .authenticate_with_query(&headers, params.token.as_deref())?;

    let url = resources
        .gateway
        .authorization_url(user_id, params.return_to);
    Ok(Redirect::temporary(&url))
}

/// Provider redirect target: complete the token exchange and send the
/// user back to the caller-supplied return location when one was given.
async fn callback_handler(
    State(resources): State<Arc<ServerResources>>,
    Query(params): Query<CallbackParams>,
) -> EngineResult<Response> {
    if let Some(error) = params.error {
        tracing::warn!("provider returned consent error: {error}");
        return Err(EngineError::InvalidInput(format!(
            "authorization was not granted: {error}"
        )));
    }

    let code = params
        .code
        .ok_or_else(|| EngineError::InvalidInput("missing code parameter".to_owned()))?;
    let state = params.state.ok_or(EngineError::InvalidState)?;

    let outcome = resources.gateway.handle_callback(&code, &state).await?;

    Ok(match outcome.return_to {
        Some(return_to) => Redirect::temporary(&return_to).into_response(),
        None => Html(
            "<html><body><h2>Calendar connected</h2>\
             <p>You can close this window and return to the app.</p></body></html>",
        )
        .into_response(),
    })
}

/// Report whether the caller has a connected calendar account
async fn status_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
) -> EngineResult<Json<ConnectionStatus>> {
    let user_id = resources.auth.authenticate(&headers)?;
    let account = resources.gateway.connection(user_id).await?;

    Ok(Json(match account {
        Some(account) => ConnectionStatus {
            provider: account.provider,
            connected: true,
            email: account.email,
            expires_at: Some(account.token_expiry.to_rfc3339()),
            scopes: Some(account.scopes),
        },
        None => ConnectionStatus {
            provider: crate::oauth::gateway::PROVIDER_NAME.to_owned(),
            connected: false,
            email: None,
            expires_at: None,
            scopes: None,
        },
    }))
}
